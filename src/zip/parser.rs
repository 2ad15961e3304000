//! Low-level ZIP archive parser.
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, follow the locator to the ZIP64 EOCD
//! 3. Read the Central Directory to get metadata for all members
//! 4. For member data, read the member's Local File Header
//!
//! Listing only needs the tail of the file, which matters for HTTP sources.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Reads ZIP structures from any [`ReadAt`] source: a local file, a remote
/// file, or a member of another archive. Typically used through
/// [`ZipExtractor`](super::ZipExtractor).
pub struct ZipParser {
    reader: Arc<dyn ReadAt>,
    size: u64,
}

impl ZipParser {
    pub fn new(reader: Arc<dyn ReadAt>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Read exactly `len` bytes at `offset`.
    async fn read_exact_at(&self, offset: u64, len: usize, what: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.reader.read_at(offset, &mut buf).await?;
        if n != len {
            bail!("truncated {what}");
        }
        Ok(buf)
    }

    /// Find and parse the End of Central Directory record, returning it
    /// together with its offset in the file.
    ///
    /// Fails when no EOCD can be found, i.e. the source is not a ZIP archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;

        // Common case: no comment, the EOCD is the last 22 bytes
        if self.size >= eocd_size {
            let offset = self.size - eocd_size;
            let buf = self.read_exact_at(offset, EndOfCentralDirectory::SIZE, "end record").await?;
            if buf.starts_with(EndOfCentralDirectory::SIGNATURE) && buf[20..22] == [0, 0] {
                return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
            }
        }

        // Otherwise search backwards through the area a comment could cover
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let buf = self
            .read_exact_at(search_start, search_size as usize, "archive tail")
            .await?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if !buf[i..].starts_with(EndOfCentralDirectory::SIGNATURE) {
                continue;
            }
            // Only accept a candidate whose comment runs exactly to the end
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::from_bytes(&buf[i..])?;
                return Ok((eocd, search_start + i as u64));
            }
        }

        bail!("not a valid ZIP file: end of central directory not found")
    }

    /// Central directory location from the ZIP64 end record, found through
    /// the locator that sits right before the regular EOCD at `eocd_offset`.
    pub async fn read_zip64_location(&self, eocd_offset: u64) -> Result<CentralDirectoryLocation> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
            bail!("missing ZIP64 locator");
        };
        let locator = self
            .read_exact_at(locator_offset, Zip64EOCDLocator::SIZE, "ZIP64 locator")
            .await?;
        let eocd64_offset = Zip64EOCDLocator::eocd64_offset(&locator)?;

        let eocd64 = self
            .read_exact_at(eocd64_offset, Zip64EOCD::MIN_SIZE, "ZIP64 end record")
            .await?;
        Zip64EOCD::location(&eocd64)
    }

    /// List all members of the archive in central directory order.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;
        let cd = if eocd.is_zip64() {
            self.read_zip64_location(eocd_offset).await?
        } else {
            eocd.location()
        };

        if cd.offset.saturating_add(cd.size) > self.size {
            bail!("central directory lies outside the archive");
        }

        // One read for the whole directory: a single Range request over HTTP
        let data = self
            .read_exact_at(cd.offset, cd.size as usize, "central directory")
            .await?;

        // Each record takes at least 46 bytes; don't trust the declared count further
        let capacity = cd.entries.min(cd.size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(data.as_slice());
        for _ in 0..cd.entries {
            entries.push(ZipFileEntry::read_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Offset where the member's (possibly compressed) data begins.
    ///
    /// The Local File Header has its own variable-length name and extra
    /// field, which may differ from the central directory copy, so it has to
    /// be read.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh = self
            .read_exact_at(entry.lfh_offset, LFH_SIZE, "local file header")
            .await?;
        if !lfh.starts_with(LFH_SIGNATURE) {
            bail!("invalid local file header for {}", entry.file_name);
        }

        // Name and extra field lengths sit at offset 26
        let mut cursor = Cursor::new(&lfh[26..]);
        let name_len = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + name_len + extra_len)
    }

    /// The underlying reader, for reading member data after
    /// [`get_data_offset()`](Self::get_data_offset).
    pub fn reader(&self) -> &Arc<dyn ReadAt> {
        &self.reader
    }
}
