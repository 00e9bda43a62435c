//! Gallery archive encoding: a sequential ustar container, gzip-compressed
//! once over the whole stream.
//!
//! Every entry is written header first, so its size has to be known before
//! any of its content is read. [`encode`] verifies that each source yields
//! exactly the declared number of bytes and aborts otherwise.

use std::io::{self, Read, Write};

use flate2::{read::GzDecoder, Compression, GzBuilder};

pub mod header;

use header::{BLOCK_LEN, MAX_ENTRY_SIZE, NAME_LEN};

const COPY_BUF_LEN: usize = 64 * 1024;
const ZERO_BLOCK: [u8; BLOCK_LEN] = [0u8; BLOCK_LEN];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid entry name {0:?}")]
    InvalidName(String),
    #[error("entry {name} is too large for the archive ({size} bytes)")]
    TooLarge { name: String, size: u64 },
    #[error("reading entry {name} failed: {source}")]
    Source {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("entry {name} does not match its declared size of {declared} bytes")]
    SizeMismatch { name: String, declared: u64 },
    #[error("writing archive failed: {0}")]
    Sink(#[source] io::Error),
    #[error("reading archive failed: {0}")]
    Read(#[source] io::Error),
    #[error("archive is truncated")]
    Truncated,
    #[error("corrupt archive: {0}")]
    Corrupt(String),
}

/// One file to be placed in the archive.
pub trait ArchiveEntry {
    fn name(&self) -> &str;

    /// Exact number of content bytes [`ArchiveEntry::open`] will yield.
    fn size(&self) -> u64;

    /// Modification time in unix seconds.
    fn mtime(&self) -> u64 {
        0
    }

    /// Opens the content. Called once, right before the entry is written.
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

/// An entry backed by an in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub mtime: u64,
}

impl MemoryEntry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into(), mtime: 0 }
    }
}

impl ArchiveEntry for MemoryEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn mtime(&self) -> u64 {
        self.mtime
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.data.as_slice()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub content_bytes: u64,
}

/// Writes `entries` in order as a gzip-compressed tar stream into `sink`.
///
/// Returns the sink after the gzip trailer has been written. On error the
/// output is incomplete and must not be treated as an archive.
pub fn encode<I, E, W>(entries: I, sink: W, level: Compression) -> Result<(W, ArchiveSummary), ArchiveError>
where
    I: IntoIterator<Item = E>,
    E: ArchiveEntry,
    W: Write,
{
    let mut gz = GzBuilder::new().mtime(0).write(sink, level);
    let mut summary = ArchiveSummary::default();
    let mut header = [0u8; BLOCK_LEN];
    let mut buf = vec![0u8; COPY_BUF_LEN];

    for entry in entries {
        write_entry(&mut gz, &entry, &mut header, &mut buf)?;
        summary.entries += 1;
        summary.content_bytes += entry.size();
    }

    // End-of-archive marker: two zero blocks
    gz.write_all(&ZERO_BLOCK).map_err(ArchiveError::Sink)?;
    gz.write_all(&ZERO_BLOCK).map_err(ArchiveError::Sink)?;
    let sink = gz.finish().map_err(ArchiveError::Sink)?;
    Ok((sink, summary))
}

fn write_entry<W: Write, E: ArchiveEntry>(
    out: &mut W,
    entry: &E,
    header: &mut [u8; BLOCK_LEN],
    buf: &mut [u8],
) -> Result<(), ArchiveError> {
    let name = entry.name();
    if name.is_empty() || name.contains('\0') {
        return Err(ArchiveError::InvalidName(name.to_string()));
    }
    let size = entry.size();
    if size > MAX_ENTRY_SIZE {
        return Err(ArchiveError::TooLarge { name: name.to_string(), size });
    }

    let name_bytes = name.as_bytes();
    if name_bytes.len() > NAME_LEN {
        let long_len = name_bytes.len() as u64 + 1;
        header::write_longname_header(header, long_len);
        out.write_all(header.as_slice()).map_err(ArchiveError::Sink)?;
        out.write_all(name_bytes).map_err(ArchiveError::Sink)?;
        out.write_all(&[0]).map_err(ArchiveError::Sink)?;
        out.write_all(&ZERO_BLOCK[..header::padding(long_len)]).map_err(ArchiveError::Sink)?;
    }

    header::write_file_header(header, header_name(name).as_bytes(), size, entry.mtime());
    out.write_all(header.as_slice()).map_err(ArchiveError::Sink)?;

    let mut src = entry.open().map_err(|source| ArchiveError::Source { name: name.to_string(), source })?;
    copy_exact(&mut src, out, size, buf, name)?;
    out.write_all(&ZERO_BLOCK[..header::padding(size)]).map_err(ArchiveError::Sink)?;
    Ok(())
}

/// Longest prefix of `name` that fits the ustar name field without splitting
/// a character. Readers take the full name from the preceding `L` record.
fn header_name(name: &str) -> &str {
    let mut end = name.len().min(NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Copies exactly `size` bytes and checks that the source ends there.
fn copy_exact<R: Read + ?Sized, W: Write>(
    src: &mut R,
    dst: &mut W,
    size: u64,
    buf: &mut [u8],
    name: &str,
) -> Result<(), ArchiveError> {
    let source_err = |source: io::Error| ArchiveError::Source { name: name.to_string(), source };
    let mismatch = || ArchiveError::SizeMismatch { name: name.to_string(), declared: size };

    let mut remaining = size;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => return Err(mismatch()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(source_err(e)),
        };
        dst.write_all(&buf[..n]).map_err(ArchiveError::Sink)?;
        remaining -= n as u64;
    }

    let mut probe = [0u8; 1];
    loop {
        match src.read(&mut probe) {
            Ok(0) => return Ok(()),
            Ok(_) => return Err(mismatch()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(source_err(e)),
        }
    }
}

/// An entry read back by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub name: String,
    pub mtime: u64,
    pub data: Vec<u8>,
}

/// Reads a complete archive produced by [`encode`].
///
/// A stream that ends before the end-of-archive marker, or whose gzip
/// trailer is missing or wrong, is an error.
pub fn decode<R: Read>(reader: R) -> Result<Vec<DecodedEntry>, ArchiveError> {
    let mut gz = GzDecoder::new(reader);
    let mut entries = Vec::new();
    let mut block = [0u8; BLOCK_LEN];
    let mut long_name: Option<Vec<u8>> = None;

    loop {
        read_block(&mut gz, &mut block)?;
        if header::is_zero_block(&block) {
            read_block(&mut gz, &mut block)?;
            if !header::is_zero_block(&block) {
                return Err(ArchiveError::Corrupt("incomplete end-of-archive marker".into()));
            }
            break;
        }

        let h = header::parse_header(&block).map_err(ArchiveError::Corrupt)?;
        let data = read_content(&mut gz, h.size)?;
        match h.typeflag {
            header::TYPE_GNU_LONGNAME => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                long_name = Some(data[..end].to_vec());
            }
            header::TYPE_REGULAR | 0 => {
                let raw = long_name.take().unwrap_or(h.name);
                let name = String::from_utf8(raw).map_err(|_| ArchiveError::Corrupt("entry name is not utf-8".into()))?;
                entries.push(DecodedEntry { name, mtime: h.mtime, data });
            }
            // Other entry types are skipped
            _ => long_name = None,
        }
    }

    // Drain so the decoder verifies the gzip trailer
    io::copy(&mut gz, &mut io::sink()).map_err(map_read_err)?;
    Ok(entries)
}

fn read_block<R: Read>(r: &mut R, block: &mut [u8; BLOCK_LEN]) -> Result<(), ArchiveError> {
    r.read_exact(block).map_err(map_read_err)
}

fn read_content<R: Read>(r: &mut R, size: u64) -> Result<Vec<u8>, ArchiveError> {
    let mut data = Vec::new();
    let read = r.by_ref().take(size).read_to_end(&mut data).map_err(map_read_err)?;
    if (read as u64) < size {
        return Err(ArchiveError::Truncated);
    }
    let mut pad = [0u8; BLOCK_LEN];
    r.read_exact(&mut pad[..header::padding(size)]).map_err(map_read_err)?;
    Ok(data)
}

fn map_read_err(e: io::Error) -> ArchiveError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ArchiveError::Truncated
    } else {
        ArchiveError::Read(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_vec(entries: Vec<MemoryEntry>) -> Vec<u8> {
        let (out, _) = encode(entries, Vec::new(), Compression::default()).unwrap();
        out
    }

    struct FailingEntry;

    impl ArchiveEntry for FailingEntry {
        fn name(&self) -> &str {
            "broken.jpg"
        }
        fn size(&self) -> u64 {
            10
        }
        fn open(&self) -> io::Result<Box<dyn Read + '_>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        }
    }

    struct ShortEntry;

    impl ArchiveEntry for ShortEntry {
        fn name(&self) -> &str {
            "short.jpg"
        }
        fn size(&self) -> u64 {
            10
        }
        fn open(&self) -> io::Result<Box<dyn Read + '_>> {
            Ok(Box::new(&b"abc"[..]))
        }
    }

    #[test]
    fn empty_archive_is_valid() {
        let out = encode_to_vec(vec![]);
        assert!(decode(out.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn entries_keep_order_and_content() {
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let entries = vec![
            MemoryEntry::new("a.jpg", b"first".to_vec()),
            MemoryEntry::new("b.png", big.clone()),
            MemoryEntry::new("c.gif", Vec::new()),
            MemoryEntry::new("a.jpg", b"duplicate name".to_vec()),
        ];
        let out = encode_to_vec(entries.clone());
        let decoded = decode(out.as_slice()).unwrap();

        assert_eq!(decoded.len(), 4);
        for (orig, got) in entries.iter().zip(&decoded) {
            assert_eq!(orig.name, got.name);
            assert_eq!(orig.data, got.data);
        }
    }

    #[test]
    fn long_names_survive() {
        let name = format!("{}.jpg", "x".repeat(150));
        let out = encode_to_vec(vec![MemoryEntry::new(name.clone(), b"data".to_vec())]);
        let decoded = decode(out.as_slice()).unwrap();
        assert_eq!(decoded[0].name, name);
        assert_eq!(decoded[0].data, b"data");
    }

    #[test]
    fn long_name_fallback_keeps_whole_characters() {
        // 'é' straddles the 100-byte field boundary
        let name = format!("{}é.jpg", "x".repeat(99));
        let out = encode_to_vec(vec![MemoryEntry::new(name.clone(), b"data".to_vec())]);

        let mut tar = Vec::new();
        GzDecoder::new(out.as_slice()).read_to_end(&mut tar).unwrap();
        // L header, one block of name data, then the file header
        let field = &tar[2 * BLOCK_LEN..2 * BLOCK_LEN + NAME_LEN];
        let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        assert_eq!(std::str::from_utf8(&field[..end]).unwrap(), "x".repeat(99));

        assert_eq!(decode(out.as_slice()).unwrap()[0].name, name);
    }

    #[test]
    fn header_name_cuts_on_char_boundary() {
        assert_eq!(header_name("short.jpg"), "short.jpg");
        let name = "ü".repeat(60);
        let cut = header_name(&name);
        assert_eq!(cut.len(), 100);
        assert!(name.starts_with(cut));
        let name = format!("a{}", "ü".repeat(60));
        assert_eq!(header_name(&name).len(), 99);
    }

    #[test]
    fn mtime_is_recorded() {
        let mut e = MemoryEntry::new("t.jpg", b"x".to_vec());
        e.mtime = 1_650_000_000;
        let out = encode_to_vec(vec![e]);
        assert_eq!(decode(out.as_slice()).unwrap()[0].mtime, 1_650_000_000);
    }

    #[test]
    fn source_failure_aborts() {
        let err = encode(vec![FailingEntry], Vec::new(), Compression::fast()).unwrap_err();
        match err {
            ArchiveError::Source { name, source } => {
                assert_eq!(name, "broken.jpg");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_source_is_size_mismatch() {
        let err = encode(vec![ShortEntry], Vec::new(), Compression::fast()).unwrap_err();
        assert!(matches!(err, ArchiveError::SizeMismatch { declared: 10, .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = encode(vec![MemoryEntry::new("", b"x".to_vec())], Vec::new(), Compression::fast()).unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidName(_)));
    }

    #[test]
    fn truncated_stream_is_not_an_archive() {
        let out = encode_to_vec(vec![MemoryEntry::new("a.jpg", vec![7u8; 4096])]);
        let cut = &out[..out.len() - 12];
        assert!(decode(cut).is_err());
    }

    #[test]
    fn summary_counts_entries_and_bytes() {
        let (_, summary) = encode(
            vec![MemoryEntry::new("a", vec![1u8; 10]), MemoryEntry::new("b", vec![2u8; 5])],
            Vec::new(),
            Compression::fast(),
        )
        .unwrap();
        assert_eq!(summary, ArchiveSummary { entries: 2, content_bytes: 15 });
    }
}
