//! Archive persistence: identifier counter, metadata codec, and the flat
//! metadata store.
//!
//! Both flat files are shared mutable state on disk. All access goes through
//! [`IdAllocator`] and [`ArchiveStore`], which take advisory locks on
//! `<file>.lock` sidecars so concurrent ingestion runs cannot hand out
//! duplicate identifiers or interleave appended blocks.

mod allocator;
mod codec;
mod lock;
mod store;

pub use allocator::IdAllocator;
pub use codec::{blank_template, decode, encode, BracketCodec, MetadataCodec};
pub use lock::{lock_path, FileLock};
pub use store::ArchiveStore;
