pub mod adapters;
pub mod config;
pub mod filesystem;
pub mod fs;
pub mod model;
pub mod operations;
pub mod util;

pub use config::{AdapterConfig, CopyAclStrategy};
pub use filesystem::{Filesystem, LegacyFilesystem};
pub use fs::ObjectFS;
pub use model::fs::{FSError, ListingEntry, Metadata, Visibility, WriteConfig};
