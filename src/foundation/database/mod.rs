mod models;
mod operations;

pub use models::DownloadRecord;
pub use operations::*;
