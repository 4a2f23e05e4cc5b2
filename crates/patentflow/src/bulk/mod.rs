//! Bulk assignee index: archive caching, streaming load and name lookup.

pub mod archive;
pub mod fuzzy;
pub mod index;
pub mod reader;

pub use archive::{ArchiveCache, ArchiveSource};
pub use index::{BulkIndex, IndexStatus, LoadStats};
