pub mod snapshot_file;

pub use snapshot_file::{load_snapshot, open_catalog, save_catalog, save_snapshot};
