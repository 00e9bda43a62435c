//! ustar header blocks.
//!
//! Only what the exporter emits is supported: regular files (`0`) and GNU
//! long-name records (`L`) for names longer than the 100-byte name field.

pub const BLOCK_LEN: usize = 512;
pub const NAME_LEN: usize = 100;

pub const TYPE_REGULAR: u8 = b'0';
pub const TYPE_GNU_LONGNAME: u8 = b'L';

const LONGNAME_MARKER: &[u8] = b"././@LongLink";
const MODE_FILE: u64 = 0o644;

const SIZE_FIELD: std::ops::Range<usize> = 124..136;
const MTIME_FIELD: std::ops::Range<usize> = 136..148;
const CHKSUM_FIELD: std::ops::Range<usize> = 148..156;
const PREFIX_FIELD: std::ops::Range<usize> = 345..500;

/// Largest size representable in the 11 octal digits of the size field.
pub const MAX_ENTRY_SIZE: u64 = (1 << 33) - 1;

/// Number of zero bytes needed to pad `len` up to a block boundary.
pub fn padding(len: u64) -> usize {
    let rem = (len % BLOCK_LEN as u64) as usize;
    if rem == 0 {
        0
    } else {
        BLOCK_LEN - rem
    }
}

/// Fills `buf` with a header for a regular file.
///
/// `name` is truncated to the name field; callers emit a long-name record
/// first when it does not fit. `size` must be at most [`MAX_ENTRY_SIZE`].
pub fn write_file_header(buf: &mut [u8; BLOCK_LEN], name: &[u8], size: u64, mtime: u64) {
    write_header(buf, name, size, mtime, TYPE_REGULAR);
}

/// Fills `buf` with the GNU header announcing a long name of `name_len` bytes
/// (including the trailing NUL).
pub fn write_longname_header(buf: &mut [u8; BLOCK_LEN], name_len: u64) {
    write_header(buf, LONGNAME_MARKER, name_len, 0, TYPE_GNU_LONGNAME);
}

fn write_header(buf: &mut [u8; BLOCK_LEN], name: &[u8], size: u64, mtime: u64, typeflag: u8) {
    buf.fill(0);
    let name_len = name.len().min(NAME_LEN);
    buf[..name_len].copy_from_slice(&name[..name_len]);
    write_octal(&mut buf[100..108], MODE_FILE);
    write_octal(&mut buf[108..116], 0);
    write_octal(&mut buf[116..124], 0);
    write_octal(&mut buf[SIZE_FIELD], size);
    write_octal(&mut buf[MTIME_FIELD], mtime.min(MAX_ENTRY_SIZE));
    buf[156] = typeflag;
    buf[257..263].copy_from_slice(b"ustar\0");
    buf[263..265].copy_from_slice(b"00");

    buf[CHKSUM_FIELD].fill(b' ');
    let sum = checksum(buf);
    let chk = format!("{:06o}\0 ", sum);
    buf[CHKSUM_FIELD].copy_from_slice(chk.as_bytes());
}

/// Zero-padded octal digits followed by a NUL; the value must fit.
fn write_octal(field: &mut [u8], value: u64) {
    let digits = field.len() - 1;
    let mut v = value;
    for i in (0..digits).rev() {
        field[i] = b'0' + (v & 7) as u8;
        v >>= 3;
    }
    field[digits] = 0;
}

fn checksum(buf: &[u8; BLOCK_LEN]) -> u32 {
    buf.iter().map(|&b| u32::from(b)).sum()
}

fn parse_octal(field: &[u8]) -> Option<u64> {
    let trimmed: Vec<u8> =
        field.iter().copied().skip_while(|b| *b == b' ').take_while(|b| *b != 0 && *b != b' ').collect();
    if trimmed.is_empty() {
        return Some(0);
    }
    let mut v: u64 = 0;
    for b in trimmed {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        v = v.checked_mul(8)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(v)
}

fn cstr(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// A parsed header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: Vec<u8>,
    pub size: u64,
    pub mtime: u64,
    pub typeflag: u8,
}

pub fn is_zero_block(buf: &[u8; BLOCK_LEN]) -> bool {
    buf.iter().all(|&b| b == 0)
}

/// Parses and checksum-verifies a header block.
pub fn parse_header(buf: &[u8; BLOCK_LEN]) -> Result<Header, String> {
    let stored = parse_octal(&buf[CHKSUM_FIELD]).ok_or("invalid checksum field")?;
    let mut copy = *buf;
    copy[CHKSUM_FIELD].fill(b' ');
    if u64::from(checksum(&copy)) != stored {
        return Err("header checksum mismatch".to_string());
    }

    let size = parse_octal(&buf[SIZE_FIELD]).ok_or("invalid size field")?;
    let mtime = parse_octal(&buf[MTIME_FIELD]).ok_or("invalid mtime field")?;

    let mut name = cstr(&buf[..NAME_LEN]).to_vec();
    if &buf[257..262] == b"ustar" {
        let prefix = cstr(&buf[PREFIX_FIELD]);
        if !prefix.is_empty() {
            let mut full = prefix.to_vec();
            full.push(b'/');
            full.extend_from_slice(&name);
            name = full;
        }
    }

    Ok(Header { name, size, mtime, typeflag: buf[156] })
}
