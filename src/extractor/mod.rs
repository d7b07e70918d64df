pub mod file_store;
pub mod hasher;
pub mod source_extractor;

pub use file_store::{LocalFileStore, PathLockGuard};
pub use hasher::{ContentDigest, ContentHasher};
pub use source_extractor::{
    strip_scheme, ExtractionOutcome, FileOutcome, PartialExtraction, SourceExtractor,
};
