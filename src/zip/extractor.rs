use std::io::Read;
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use flate2::{Decompress, FlushDecompress, Status};

use crate::io::{MemoryReader, ReadAt, WindowReader};
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound for buffer preallocation driven by a declared member size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Largest member that is decompressed into memory.
const MAX_IN_MEMORY: u64 = 1024 * 1024 * 1024;

/// Compressed bytes read per step when decoding only a prefix.
const PREFIX_CHUNK: usize = 4096;

/// Read access to the members of a ZIP archive
pub struct ZipExtractor {
    parser: ZipParser,
}

impl ZipExtractor {
    pub fn new(reader: Arc<dyn ReadAt>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Offset of the member's data, checked so that `len` bytes from there
    /// stay inside the archive.
    async fn data_offset(&self, entry: &ZipFileEntry, len: u64) -> Result<u64> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        match data_offset.checked_add(len) {
            Some(end) if end <= self.parser.reader().size() => Ok(data_offset),
            _ => bail!("data of {} runs past the end of the archive", entry.file_name),
        }
    }

    /// Open a member as a random-access reader.
    ///
    /// STORED members are served straight from the archive through a
    /// [`WindowReader`]; DEFLATE members are decompressed into memory.
    pub async fn open_entry(&self, entry: &ZipFileEntry) -> Result<Arc<dyn ReadAt>> {
        if entry.is_directory {
            bail!("{} is a directory", entry.file_name);
        }

        match entry.compression_method {
            CompressionMethod::Stored => {
                let data_offset = self.data_offset(entry, entry.uncompressed_size).await?;
                Ok(Arc::new(WindowReader::new(
                    self.parser.reader().clone(),
                    data_offset,
                    entry.uncompressed_size,
                )))
            }
            _ => Ok(Arc::new(MemoryReader::new(
                self.extract_to_memory(entry).await?,
            ))),
        }
    }

    /// Up to `len` leading bytes of a member. A DEFLATE member is only
    /// decoded as far as needed.
    pub async fn read_prefix(&self, entry: &ZipFileEntry, len: usize) -> Result<Vec<u8>> {
        if entry.is_directory {
            bail!("{} is a directory", entry.file_name);
        }
        let len = usize::try_from(entry.uncompressed_size).map_or(len, |size| size.min(len));

        match entry.compression_method {
            CompressionMethod::Stored => {
                let data_offset = self.data_offset(entry, entry.uncompressed_size).await?;
                let mut buf = vec![0u8; len];
                let n = self.parser.reader().read_at(data_offset, &mut buf).await?;
                buf.truncate(n);
                Ok(buf)
            }
            CompressionMethod::Deflate => {
                let data_offset = self.data_offset(entry, entry.compressed_size).await?;
                self.inflate_prefix(entry, data_offset, len).await
            }
            CompressionMethod::Unknown(method) => unsupported(method),
        }
    }

    async fn inflate_prefix(
        &self,
        entry: &ZipFileEntry,
        data_offset: u64,
        len: usize,
    ) -> Result<Vec<u8>> {
        let reader = self.parser.reader();
        let mut inflater = Decompress::new(false);
        // decompress_vec never grows the buffer, so capacity bounds the output
        let mut out = Vec::with_capacity(len);
        let mut chunk = vec![0u8; PREFIX_CHUNK];
        let mut pos = 0u64;

        'read: while out.len() < len && pos < entry.compressed_size {
            let want = (entry.compressed_size - pos).min(PREFIX_CHUNK as u64) as usize;
            let n = reader.read_at(data_offset + pos, &mut chunk[..want]).await?;
            if n == 0 {
                bail!("truncated data for {}", entry.file_name);
            }
            pos += n as u64;

            let mut input = &chunk[..n];
            while !input.is_empty() && out.len() < len {
                let (total_in, total_out) = (inflater.total_in(), inflater.total_out());
                let status = inflater
                    .decompress_vec(input, &mut out, FlushDecompress::None)
                    .with_context(|| format!("cannot inflate {}", entry.file_name))?;
                input = &input[(inflater.total_in() - total_in) as usize..];

                if matches!(status, Status::StreamEnd) {
                    break 'read;
                }
                if inflater.total_in() == total_in && inflater.total_out() == total_out {
                    bail!("cannot inflate {}: no progress", entry.file_name);
                }
            }
        }

        out.truncate(len);
        Ok(out)
    }

    /// Extract file data to memory
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.uncompressed_size > MAX_IN_MEMORY || entry.compressed_size > MAX_IN_MEMORY {
            bail!(
                "{} is too large to open in memory ({} bytes)",
                entry.file_name,
                entry.uncompressed_size
            );
        }

        // Read the raw member data
        let data_offset = self.data_offset(entry, entry.compressed_size).await?;
        let mut raw = vec![0u8; usize::try_from(entry.compressed_size)?];
        let n = self.parser.reader().read_at(data_offset, &mut raw).await?;
        if n != raw.len() {
            bail!("truncated data for {}", entry.file_name);
        }

        match entry.compression_method {
            CompressionMethod::Stored => Ok(raw),
            CompressionMethod::Deflate => {
                let mut data =
                    Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOC) as usize);
                // Never produce more than the declared size
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size)
                    .read_to_end(&mut data)
                    .with_context(|| format!("cannot inflate {}", entry.file_name))?;
                Ok(data)
            }
            CompressionMethod::Unknown(method) => unsupported(method),
        }
    }
}

fn unsupported<T>(method: u16) -> Result<T> {
    bail!(
        "Unsupported compression method: {} (only STORED and DEFLATE are supported)",
        method
    )
}
