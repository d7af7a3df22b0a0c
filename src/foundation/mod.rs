pub mod database;
pub mod error;
pub mod logging;
pub mod utils;

pub use error::{Error, Result};
