//! Record file format: the on-disk log read by [`RecordFileReader`]
//!
//! A 64-byte header is followed by length-prefixed blocks of up to
//! [`RECORDS_PER_BLOCK`] records. Each block holds `[u32 len][bincode record]`
//! entries, zstd-compressed when the file's encoding is [`Encoding::Zstd`].
//! The reader decodes one block at a time, so memory use does not grow with
//! the size of the log.

use crate::config::DecoderConfig;
use crate::core::record::{Record, RecordFilter};
use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};
use crate::storage::source::{BoxedSource, RecordSource, SourceOpener};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Record file format version
pub const FORMAT_VERSION: u8 = 1;

/// Header size (64 bytes)
pub const HEADER_SIZE: usize = 64;

/// Magic number: "LSREC"
pub const MAGIC: &[u8; 5] = b"LSREC";

/// Records buffered before a block is written
pub const RECORDS_PER_BLOCK: usize = 1000;

/// Compression level for ZSTD (1-22, higher = better compression but slower)
pub const ZSTD_COMPRESSION_LEVEL: i32 = 3;

/// Largest block the reader accepts (guards against corrupt length prefixes)
pub const MAX_BLOCK_SIZE: usize = 256 * 1024 * 1024;

/// Block encoding of a record file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Plain,
    Zstd,
}

impl Encoding {
    fn to_byte(self) -> u8 {
        match self {
            Encoding::Plain => 0,
            Encoding::Zstd => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Encoding::Plain),
            1 => Ok(Encoding::Zstd),
            other => Err(Error::Storage(format!("Unknown block encoding: {}", other))),
        }
    }
}

/// Record file header
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFileHeader {
    pub encoding: Encoding,
    pub record_count: u32,
    pub first_time: Timestamp,
    pub last_time: Timestamp,
    pub checksum: u32,
}

impl RecordFileHeader {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            record_count: 0,
            first_time: Timestamp::ZERO,
            last_time: Timestamp::ZERO,
            checksum: 0,
        }
    }

    /// Serialize header to bytes
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);

        buf.put_slice(MAGIC);
        buf.put_u8(FORMAT_VERSION);
        buf.put_u8(self.encoding.to_byte());
        // Reserved
        buf.put_u8(0);
        buf.put_u32(self.record_count);
        buf.put_f64(self.first_time.as_secs_f64());
        buf.put_f64(self.last_time.as_secs_f64());
        buf.put_u32(self.checksum);

        // Padding to 64 bytes: 5+1+1+1+4+8+8+4 = 32
        buf.put_bytes(0, 32);

        debug_assert_eq!(buf.len(), HEADER_SIZE);
        buf.freeze()
    }

    /// Deserialize header from bytes
    pub fn deserialize(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::Storage("Invalid header size".to_string()));
        }

        let magic = &buf[0..5];
        if magic != MAGIC {
            return Err(Error::Storage(format!("Invalid magic number: {:?}", magic)));
        }
        buf.advance(5);

        let version = buf.get_u8();
        if version != FORMAT_VERSION {
            return Err(Error::Storage(format!("Unsupported version: {}", version)));
        }

        let encoding = Encoding::from_byte(buf.get_u8())?;
        buf.advance(1);

        let record_count = buf.get_u32();
        let first_time = Timestamp::from_secs_f64(buf.get_f64());
        let last_time = Timestamp::from_secs_f64(buf.get_f64());
        let checksum = buf.get_u32();

        Ok(Self {
            encoding,
            record_count,
            first_time,
            last_time,
            checksum,
        })
    }
}

/// Record file writer
pub struct RecordFileWriter {
    file: BufWriter<File>,
    header: RecordFileHeader,
    block: Vec<u8>,
    block_records: usize,
    checksum_hasher: Crc32Hasher,
}

impl RecordFileWriter {
    /// Create a new record file, truncating any existing one
    pub fn create<P: AsRef<Path>>(path: P, encoding: Encoding) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut file = BufWriter::new(file);

        let header = RecordFileHeader::new(encoding);
        file.write_all(&header.serialize())?;

        Ok(Self {
            file,
            header,
            block: Vec::new(),
            block_records: 0,
            checksum_hasher: Crc32Hasher::new(),
        })
    }

    /// Append a record
    pub fn append(&mut self, record: &Record) -> Result<()> {
        let bytes = bincode::serialize(record)?;
        self.block.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.block.extend_from_slice(&bytes);
        self.block_records += 1;

        let ts = record.timestamp();
        if self.header.record_count == 0 {
            self.header.first_time = ts;
        }
        self.header.last_time = ts;
        self.header.record_count += 1;

        if self.block_records >= RECORDS_PER_BLOCK {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.block_records == 0 {
            return Ok(());
        }

        let encoded = match self.header.encoding {
            Encoding::Plain => std::mem::take(&mut self.block),
            Encoding::Zstd => {
                let compressed = zstd::encode_all(&self.block[..], ZSTD_COMPRESSION_LEVEL)
                    .map_err(|e| Error::Storage(format!("ZSTD compression failed: {}", e)))?;
                self.block.clear();
                compressed
            }
        };

        self.checksum_hasher.update(&encoded);
        self.file.write_all(&(encoded.len() as u32).to_le_bytes())?;
        self.file.write_all(&encoded)?;

        self.block_records = 0;
        Ok(())
    }

    /// Finalize the file: flush the last block and rewrite the header
    pub fn finalize(mut self) -> Result<RecordFileHeader> {
        self.flush_block()?;
        self.header.checksum = self.checksum_hasher.finalize();

        let mut file = self
            .file
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.header.serialize())?;
        file.sync_all()?;

        Ok(self.header)
    }

    /// Get current header
    pub fn header(&self) -> &RecordFileHeader {
        &self.header
    }
}

/// Streaming record file reader
///
/// After the end of the file or any error, the reader reports end of stream
/// on every further call.
pub struct RecordFileReader {
    file: BufReader<File>,
    header: RecordFileHeader,
    path: PathBuf,
    name: String,
    config: DecoderConfig,
    filter: RecordFilter,
    pending: VecDeque<Record>,
    checksum_hasher: Crc32Hasher,
    decoded: u32,
    finished: bool,
}

impl RecordFileReader {
    /// Open a record file and validate its header
    pub fn open<P: AsRef<Path>>(path: P, config: DecoderConfig, filter: RecordFilter) -> Result<Self> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path)?);

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)?;
        let header = RecordFileHeader::deserialize(&header_buf)?;

        if let Some(expected) = config.encoding {
            if expected != header.encoding {
                return Err(Error::Storage(format!(
                    "{} uses {:?} blocks, decoder is configured for {:?}",
                    path.display(),
                    header.encoding,
                    expected
                )));
            }
        }

        debug!(path = %path.display(), records = header.record_count, "opened record file");

        Ok(Self {
            file,
            header,
            path: path.to_path_buf(),
            name: path.display().to_string(),
            config,
            filter,
            pending: VecDeque::new(),
            checksum_hasher: Crc32Hasher::new(),
            decoded: 0,
            finished: false,
        })
    }

    /// Get file header
    pub fn header(&self) -> &RecordFileHeader {
        &self.header
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the next block; `false` at end of file
    fn read_block(&mut self) -> Result<bool> {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < len_buf.len() {
            match self.file.read(&mut len_buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        match filled {
            0 => return Ok(false),
            4 => {}
            _ => return Err(Error::Storage("Truncated block length".to_string())),
        }

        let block_len = u32::from_le_bytes(len_buf) as usize;
        if block_len > MAX_BLOCK_SIZE {
            return Err(Error::Storage(format!("Block too large: {} bytes", block_len)));
        }

        let mut block = vec![0u8; block_len];
        self.file.read_exact(&mut block).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Storage("Truncated block".to_string())
            } else {
                Error::Io(e)
            }
        })?;
        self.checksum_hasher.update(&block);

        let decoded = match self.header.encoding {
            Encoding::Plain => block,
            Encoding::Zstd => zstd::decode_all(&block[..])
                .map_err(|e| Error::Storage(format!("ZSTD decompression failed: {}", e)))?,
        };

        let mut buf = &decoded[..];
        while buf.has_remaining() {
            if buf.remaining() < 4 {
                return Err(Error::Storage("Truncated record length".to_string()));
            }
            let record_len = buf.get_u32_le() as usize;
            if buf.remaining() < record_len {
                return Err(Error::Storage("Truncated record data".to_string()));
            }
            let record: Record = bincode::deserialize(&buf[..record_len])?;
            buf.advance(record_len);
            self.decoded += 1;
            self.pending.push_back(record);
        }

        Ok(true)
    }

    fn verify(&mut self) -> Result<()> {
        if !self.config.verify_checksum {
            return Ok(());
        }
        let checksum = std::mem::take(&mut self.checksum_hasher).finalize();
        if checksum != self.header.checksum {
            return Err(Error::Storage(format!(
                "Checksum mismatch in {}: expected {}, got {}",
                self.path.display(),
                self.header.checksum,
                checksum
            )));
        }
        if self.decoded != self.header.record_count {
            return Err(Error::Storage(format!(
                "Record count mismatch in {}: header says {}, found {}",
                self.path.display(),
                self.header.record_count,
                self.decoded
            )));
        }
        Ok(())
    }
}

impl RecordSource for RecordFileReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                if self.filter.accepts(&record) {
                    return Ok(Some(record));
                }
                continue;
            }
            if self.finished {
                return Ok(None);
            }
            match self.read_block() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    self.verify()?;
                    return Ok(None);
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "abandoning damaged record file");
                    self.finished = true;
                    self.pending.clear();
                    return Err(e);
                }
            }
        }
    }
}

/// Opens [`RecordFileReader`]s with a fixed decoder configuration and filter
#[derive(Debug, Clone, Default)]
pub struct RecordFileOpener {
    config: DecoderConfig,
    filter: RecordFilter,
}

impl RecordFileOpener {
    pub fn new(config: DecoderConfig, filter: RecordFilter) -> Self {
        Self { config, filter }
    }
}

impl SourceOpener for RecordFileOpener {
    fn open(&self, path: &Path) -> Result<BoxedSource> {
        let reader = RecordFileReader::open(path, self.config, self.filter.clone())?;
        Ok(Box::new(reader))
    }
}

/// Write `records` to a new record file, returning the finalized header
pub fn write_records<'a, P, I>(path: P, encoding: Encoding, records: I) -> Result<RecordFileHeader>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Record>,
{
    let mut writer = RecordFileWriter::create(path, encoding)?;
    for record in records {
        writer.append(record)?;
    }
    writer.finalize()
}
