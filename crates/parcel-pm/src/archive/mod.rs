//! Package archive construction and extraction.
//!
//! Archives are zip files named after the package and version they hold
//! (see [`ArchiveHandle`]). The builder writes entries in manifest order and
//! the extractor replays them in container order.

mod builder;
mod extractor;
mod handle;

pub use builder::{ArchiveBuilder, BuildError};
pub use extractor::{ArchiveExtractor, ExtractError};
pub use handle::{ArchiveHandle, ARCHIVE_EXTENSION};
