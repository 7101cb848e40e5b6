//! Short (8.3) and long file name directory entries (§3 "directory entry").
//!
//! Both entry kinds are 32 bytes and are told apart by the attribute byte at
//! offset 11: `0x0F` marks a long-name entry, anything else a short entry.
//! Everything here operates on raw 32-byte records in place, since the
//! directory engine never holds more than one sector's worth of entries at a
//! time (no per-entry heap allocation).

use crate::error::{Error, Result};
use crate::{read_u16, read_u32, write_u16, write_u32, ATTR_LONG_NAME, LAST_LONG_ENTRY};

/// Characters the short-name encoder rejects, per the FAT spec's illegal set.
const ILLEGAL_SHORT_CHARS: &[u8] = b"\"*+,/:;<=>?[\\]|";

/// A short (8.3) directory entry, 32 raw bytes.
#[derive(Clone, Copy)]
pub struct ShortDirEntry {
    pub raw: [u8; 32],
}

impl ShortDirEntry {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&bytes[..32]);
        ShortDirEntry { raw }
    }

    pub fn empty() -> Self {
        ShortDirEntry { raw: [0u8; 32] }
    }

    pub fn write_into(&self, out: &mut [u8]) {
        out[..32].copy_from_slice(&self.raw);
    }

    pub fn name_raw(&self) -> &[u8; 11] {
        self.raw[0..11].try_into().unwrap()
    }

    pub fn attr(&self) -> u8 {
        self.raw[11]
    }

    pub fn set_attr(&mut self, attr: u8) {
        self.raw[11] = attr;
    }

    pub fn is_free(&self) -> bool {
        self.raw[0] == crate::DIR_ENTRY_FREE
    }

    pub fn is_end(&self) -> bool {
        self.raw[0] == crate::DIR_ENTRY_END
    }

    pub fn is_long_name(&self) -> bool {
        self.attr() & ATTR_LONG_NAME == ATTR_LONG_NAME
    }

    pub fn is_directory(&self) -> bool {
        self.attr() & crate::ATTR_DIRECTORY != 0
    }

    pub fn is_volume_id(&self) -> bool {
        self.attr() & crate::ATTR_VOLUME_ID != 0
    }

    pub fn is_dot_entry(&self) -> bool {
        self.name_raw()[0] == b'.'
    }

    pub fn first_cluster(&self) -> u32 {
        let hi = read_u16(&self.raw, 20) as u32;
        let lo = read_u16(&self.raw, 26) as u32;
        (hi << 16) | lo
    }

    pub fn set_first_cluster(&mut self, cluster: u32) {
        write_u16(&mut self.raw, 20, (cluster >> 16) as u16);
        write_u16(&mut self.raw, 26, (cluster & 0xFFFF) as u16);
    }

    pub fn file_size(&self) -> u32 {
        read_u32(&self.raw, 28)
    }

    pub fn set_file_size(&mut self, size: u32) {
        write_u32(&mut self.raw, 28, size);
    }

    pub fn write_date(&self) -> u16 {
        read_u16(&self.raw, 24)
    }

    pub fn write_time(&self) -> u16 {
        read_u16(&self.raw, 22)
    }

    pub fn set_write_datetime(&mut self, dt: &crate::DateTime) {
        write_u16(&mut self.raw, 22, pack_time(dt));
        write_u16(&mut self.raw, 24, pack_date(dt));
    }

    pub fn set_create_datetime(&mut self, dt: &crate::DateTime) {
        self.raw[13] = 0;
        write_u16(&mut self.raw, 14, pack_time(dt));
        write_u16(&mut self.raw, 16, pack_date(dt));
    }

    pub fn set_access_date(&mut self, dt: &crate::DateTime) {
        write_u16(&mut self.raw, 18, pack_date(dt));
    }
}

fn pack_time(dt: &crate::DateTime) -> u16 {
    ((dt.hour as u16) << 11) | ((dt.minute as u16) << 5) | (dt.second as u16 / 2)
}

fn pack_date(dt: &crate::DateTime) -> u16 {
    let year = dt.year.saturating_sub(1980).min(127);
    (year << 9) | ((dt.month as u16) << 5) | dt.day as u16
}

/// Splits `name` into an (up to 8-char base, up to 3-char extension) pair,
/// uppercases it, validates illegal characters, and right-pads with spaces
/// to produce the on-disk 11-byte short name. Rejects anything that needs
/// lossy conversion (callers fall back to `..._~1` generation elsewhere if
/// they choose, but the core itself never invents a name).
pub fn encode_short_name(name: &str) -> Result<[u8; 11]> {
    if name.is_empty() || name == "." || name == ".." {
        return encode_dot_name(name);
    }
    let (base, ext) = match name.rsplit_once('.') {
        Some((b, e)) if !b.is_empty() => (b, e),
        _ => (name, ""),
    };
    if base.len() > 8 || ext.len() > 3 {
        return Err(Error::InvalidName);
    }
    let mut raw = [b' '; 11];
    encode_component(base, &mut raw[0..8])?;
    encode_component(ext, &mut raw[8..11])?;
    Ok(raw)
}

fn encode_dot_name(name: &str) -> Result<[u8; 11]> {
    let mut raw = [b' '; 11];
    for (i, b) in name.bytes().enumerate() {
        raw[i] = b;
    }
    Ok(raw)
}

fn encode_component(src: &str, dst: &mut [u8]) -> Result<()> {
    for (i, c) in src.chars().enumerate() {
        if !c.is_ascii() || ILLEGAL_SHORT_CHARS.contains(&(c as u8)) || c == ' ' {
            return Err(Error::InvalidName);
        }
        dst[i] = c.to_ascii_uppercase() as u8;
    }
    Ok(())
}

/// Renders an on-disk 11-byte short name back to `base.ext` (no extension
/// means no dot), trimming the fixed-width padding and lowercasing `A`-`Z`
/// for display, matching the original FAT layer's decode behavior.
pub fn decode_short_name(raw: &[u8; 11], out: &mut heapless::String<12>) {
    out.clear();
    let mut name = *raw;
    if name[0] == crate::DIR_ENTRY_KANJI_ALIAS {
        name[0] = 0xE5;
    }
    let base_len = name[0..8].iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    for &b in &name[0..base_len] {
        let _ = out.push(b.to_ascii_lowercase() as char);
    }
    let ext_len = name[8..11].iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    if ext_len > 0 {
        let _ = out.push('.');
        for &b in &name[8..8 + ext_len] {
            let _ = out.push(b.to_ascii_lowercase() as char);
        }
    }
}

/// Checksum of the 11-byte short name, stored in every LFN entry that
/// belongs to it so a reader can detect an orphaned long-name chain.
pub fn lfn_checksum(short_name: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &b in short_name {
        sum = (sum >> 1).wrapping_add(sum << 7).wrapping_add(b);
    }
    sum
}

/// A long-name directory entry: 13 UTF-16 code units spread across three
/// fields, an ordinal (with the "last" bit set on the first entry written,
/// which is the highest-numbered since LFN entries precede their short
/// entry in storage order but are written/read highest-ordinal-first).
pub struct LongDirEntry {
    pub raw: [u8; 32],
}

impl LongDirEntry {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&bytes[..32]);
        LongDirEntry { raw }
    }

    pub fn write_into(&self, out: &mut [u8]) {
        out[..32].copy_from_slice(&self.raw);
    }

    pub fn ord(&self) -> u8 {
        self.raw[0]
    }

    /// Sequence number within the chain, 1-based, ignoring the "last" bit.
    pub fn sequence(&self) -> u8 {
        self.raw[0] & !LAST_LONG_ENTRY
    }

    pub fn is_last(&self) -> bool {
        self.raw[0] & LAST_LONG_ENTRY != 0
    }

    pub fn checksum(&self) -> u8 {
        self.raw[13]
    }

    /// Fills `out[(seq-1)*13 .. seq*13]` with this entry's UTF-16 code units.
    pub fn chars_into(&self, out: &mut [u16]) {
        let mut units = [0u16; 13];
        for i in 0..5 {
            units[i] = read_u16(&self.raw, 1 + i * 2);
        }
        for i in 0..6 {
            units[5 + i] = read_u16(&self.raw, 14 + i * 2);
        }
        for i in 0..2 {
            units[11 + i] = read_u16(&self.raw, 28 + i * 2);
        }
        out.copy_from_slice(&units);
    }

    /// Builds the `seq`-th (1-based) LFN entry carrying `chars` (already
    /// null/0xFFFF padded to exactly 13 units by the caller).
    pub fn build(seq: u8, last: bool, checksum: u8, chars: &[u16; 13]) -> Self {
        let mut raw = [0u8; 32];
        raw[0] = seq | if last { LAST_LONG_ENTRY } else { 0 };
        raw[11] = ATTR_LONG_NAME;
        raw[13] = checksum;
        for i in 0..5 {
            write_u16(&mut raw, 1 + i * 2, chars[i]);
        }
        for i in 0..6 {
            write_u16(&mut raw, 14 + i * 2, chars[5 + i]);
        }
        for i in 0..2 {
            write_u16(&mut raw, 28 + i * 2, chars[11 + i]);
        }
        LongDirEntry { raw }
    }
}

/// Fills a 13-unit LFN character block from a UTF-16 name slice starting at
/// `start`, padding with a single 0x0000 terminator then 0xFFFF to the end
/// (per spec), and returns how many source units were consumed.
pub fn fill_lfn_block(name_utf16: &[u16], start: usize, block: &mut [u16; 13]) -> usize {
    let mut consumed = 0;
    for (i, slot) in block.iter_mut().enumerate() {
        if start + i < name_utf16.len() {
            *slot = name_utf16[start + i];
            consumed += 1;
        } else if start + i == name_utf16.len() {
            *slot = 0x0000;
        } else {
            *slot = 0xFFFF;
        }
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_simple_short_name() {
        let raw = encode_short_name("README.TXT").unwrap();
        assert_eq!(&raw, b"README  TXT");
    }

    #[test]
    fn encodes_no_extension() {
        let raw = encode_short_name("MAKEFILE").unwrap();
        assert_eq!(&raw, b"MAKEFILE   ");
    }

    #[test]
    fn rejects_illegal_character() {
        assert!(encode_short_name("BAD*NAME").is_err());
    }

    #[test]
    fn rejects_overlong_base() {
        assert!(encode_short_name("TOOLONGNAME.TXT").is_err());
    }

    #[test]
    fn decodes_round_trip() {
        let raw = encode_short_name("HELLO.C").unwrap();
        let mut out = heapless::String::new();
        decode_short_name(&raw, &mut out);
        assert_eq!(out.as_str(), "hello.c");
    }

    #[test]
    fn checksum_is_stable_for_same_name() {
        let raw = encode_short_name("FOO.TXT").unwrap();
        assert_eq!(lfn_checksum(&raw), lfn_checksum(&raw));
    }

    #[test]
    fn lfn_block_pads_after_terminator() {
        let name: [u16; 3] = [b'a' as u16, b'b' as u16, b'c' as u16];
        let mut block = [0u16; 13];
        let consumed = fill_lfn_block(&name, 0, &mut block);
        assert_eq!(consumed, 3);
        assert_eq!(&block[0..3], &name);
        assert_eq!(block[3], 0x0000);
        assert_eq!(block[4], 0xFFFF);
    }
}
