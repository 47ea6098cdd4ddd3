pub mod entry;
pub mod snapshot;

pub use entry::*;
pub use snapshot::*;
