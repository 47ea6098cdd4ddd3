pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use catalog::{Catalog, GenreHistory};
pub use config::AppConfig;
pub use error::{ExitCode, MetisError, Result};
pub use models::*;
