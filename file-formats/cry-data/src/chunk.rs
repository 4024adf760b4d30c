use crate::error::{DataError, Result};
use crate::io_ext::{ReadExt, WriteExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Magic signature for chunked container files ("CrCh")
pub const CHUNK_FILE_MAGIC: [u8; 4] = *b"CrCh";

/// Container version understood by this reader
pub const CHUNK_FILE_VERSION: u32 = 0x0746;

/// Size of the fixed file header in bytes
const HEADER_SIZE: u64 = 16;

/// One entry of the chunk table.
///
/// The table lives at `table_offset` (usually the end of the file); every
/// payload is addressed by absolute `offset` and `size`, so chunks can be
/// read in any order and unknown types can be skipped without parsing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDesc {
    /// Chunk type identifier (e.g. controller, timing)
    pub chunk_type: u16,
    /// Per-type format version
    pub version: u16,
    /// Chunk id, format-specific (controller chunks store a sequence number)
    pub id: u32,
    /// Payload size in bytes
    pub size: u32,
    /// Absolute payload offset from the start of the file
    pub offset: u32,
}

impl ChunkDesc {
    /// Parse a table entry from a reader
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let chunk_type = reader.read_u16_le()?;
        let version = reader.read_u16_le()?;
        let id = reader.read_u32_le()?;
        let size = reader.read_u32_le()?;
        let offset = reader.read_u32_le()?;

        Ok(Self {
            chunk_type,
            version,
            id,
            size,
            offset,
        })
    }

    /// Write a table entry to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16_le(self.chunk_type)?;
        writer.write_u16_le(self.version)?;
        writer.write_u32_le(self.id)?;
        writer.write_u32_le(self.size)?;
        writer.write_u32_le(self.offset)?;
        Ok(())
    }
}

/// Parsed view of a chunked container: the chunk table, without payloads.
///
/// Payloads are pulled on demand with [`ChunkFile::read_chunk`] so a caller
/// can dispatch on type/version first and never touch chunks it does not
/// understand.
#[derive(Debug, Clone, Default)]
pub struct ChunkFile {
    chunks: Vec<ChunkDesc>,
}

impl ChunkFile {
    /// Parse the header and chunk table from a reader
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        if magic != CHUNK_FILE_MAGIC {
            return Err(DataError::InvalidMagic {
                expected: String::from_utf8_lossy(&CHUNK_FILE_MAGIC).to_string(),
                actual: String::from_utf8_lossy(&magic).to_string(),
            });
        }

        let version = reader.read_u32_le()?;
        if version != CHUNK_FILE_VERSION {
            return Err(DataError::UnsupportedVersion(version));
        }

        let chunk_count = reader.read_u32_le()?;
        let table_offset = reader.read_u32_le()?;

        reader.seek(SeekFrom::Start(table_offset as u64))?;
        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            chunks.push(ChunkDesc::parse(reader)?);
        }

        // Payloads must not overlap the header
        for desc in &chunks {
            if (desc.offset as u64) < HEADER_SIZE {
                return Err(DataError::ChunkError(format!(
                    "chunk 0x{:04x} payload offset {} overlaps file header",
                    desc.chunk_type, desc.offset
                )));
            }
        }

        Ok(Self { chunks })
    }

    /// All chunk descriptors, in table order
    pub fn chunks(&self) -> &[ChunkDesc] {
        &self.chunks
    }

    /// Descriptors of a given chunk type, in table order
    pub fn chunks_of_type(&self, chunk_type: u16) -> impl Iterator<Item = &ChunkDesc> {
        self.chunks
            .iter()
            .filter(move |c| c.chunk_type == chunk_type)
    }

    /// Read one chunk's payload into a buffer
    pub fn read_chunk<R: Read + Seek>(&self, reader: &mut R, desc: &ChunkDesc) -> Result<Vec<u8>> {
        reader.seek(SeekFrom::Start(desc.offset as u64))?;
        let mut data = vec![0u8; desc.size as usize];
        reader.read_exact(&mut data)?;
        Ok(data)
    }
}

/// Writer for chunked container files.
///
/// Payloads are appended as they come; `finish` writes the table last and
/// patches the header's count and table offset.
#[derive(Debug)]
pub struct ChunkWriter<W: Write + Seek> {
    inner: W,
    chunks: Vec<ChunkDesc>,
}

impl<W: Write + Seek> ChunkWriter<W> {
    /// Start a new container, writing a placeholder header
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(&CHUNK_FILE_MAGIC)?;
        inner.write_u32_le(CHUNK_FILE_VERSION)?;
        inner.write_u32_le(0)?; // chunk count, patched in finish
        inner.write_u32_le(0)?; // table offset, patched in finish
        Ok(Self {
            inner,
            chunks: Vec::new(),
        })
    }

    /// Append one chunk payload
    pub fn write_chunk(
        &mut self,
        chunk_type: u16,
        version: u16,
        id: u32,
        payload: &[u8],
    ) -> Result<()> {
        let offset = self.inner.stream_position()?;
        self.inner.write_all(payload)?;
        self.chunks.push(ChunkDesc {
            chunk_type,
            version,
            id,
            size: payload.len() as u32,
            offset: offset as u32,
        });
        Ok(())
    }

    /// Write the chunk table, patch the header, and return the writer
    pub fn finish(mut self) -> Result<W> {
        let table_offset = self.inner.stream_position()?;
        for desc in &self.chunks {
            desc.write(&mut self.inner)?;
        }

        self.inner.seek(SeekFrom::Start(8))?;
        self.inner.write_u32_le(self.chunks.len() as u32)?;
        self.inner.write_u32_le(table_offset as u32)?;
        self.inner.seek(SeekFrom::End(0))?;
        Ok(self.inner)
    }
}
