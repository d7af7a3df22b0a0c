pub mod catalog;
pub mod configuration;
pub mod foundation;
pub mod playlist;
pub mod process;
pub mod source;
pub mod startup;
pub mod tagging;

pub use configuration::*;
pub use foundation::database::*;
pub use foundation::{Error, Result};
pub use process::{Pipeline, RunReport};
