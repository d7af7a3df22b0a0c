mod layout;
mod process;
mod report;

pub use layout::{
    album_folder, expected_path, file_stem, prepare_directories, route, LibraryIndex,
    SINGLES_FOLDER,
};
pub use process::Pipeline;
pub use report::{ItemResult, Outcome, RunReport};
