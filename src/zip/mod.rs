//! ZIP archive reading.
//!
//! - [`structures`]: ZIP format records (EOCD, ZIP64 EOCD, member headers)
//! - [`parser`]: parsing of those records from a [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: listing members and opening them as readers
//!
//! The End of Central Directory record is read first, then the whole Central
//! Directory in one read. Listing an archive therefore only touches its tail,
//! which keeps remote archives cheap to browse.
//!
//! Supported: ZIP64, archive comments, STORED and DEFLATE members.
//! Not supported: encryption, multi-disk archives, other compression methods.

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
