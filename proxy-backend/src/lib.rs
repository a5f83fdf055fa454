//! Storage traits for the caching registry proxy.
//!
//! [`BlobStore`] and [`Index`] are the two collaborators the cache core
//! (`proxy-cache`) composes into `GetOrFetch`. Concrete implementations live
//! in their own crates (`proxy-storage-fs`, `proxy-storage-object`,
//! `proxy-index-sql`) so that the core depends only on these traits.

mod blob;
mod error;
mod index;
mod models;

pub use blob::{BlobReader, BlobStore, BlobResult, StoreOutcome};
pub use error::{BlobError, IndexError};
pub use index::{Index, IndexResult};
pub use models::{ArtifactRow, ArtifactUpsert, IndexCounts, PackageRow, PackageUpsert, VersionRow, VersionUpsert};
