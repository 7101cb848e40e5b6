//! Directory engine (C5) and path resolver (C6), §4.4/§4.5.
//!
//! A directory is either the fixed-size FAT12/16 root region or a cluster
//! chain (every FAT32 directory, including its root). Both are walked
//! sector-by-sector through a caller-supplied 512-byte buffer; nothing here
//! keeps more than one sector resident.

use crate::bpb::Layout;
use crate::entry::{self, LongDirEntry, ShortDirEntry};
use crate::error::{Error, Result};
use crate::fat::FatTable;
use crate::hal::{DateTime, Hal};
use crate::sd::SdCard;
use crate::{ATTR_DIRECTORY, MAX_FILENAME, SECTOR_SIZE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirRegion {
    FixedRoot,
    Chain(u32),
}

pub enum Flow {
    Continue,
    Stop,
}

/// A located directory entry: its short entry plus enough to delete or
/// rewrite it (the sector/offset of the short entry, and how many preceding
/// long-name entries belong to it).
pub struct FoundEntry {
    pub short: ShortDirEntry,
    pub sector: u32,
    pub entry_index: usize,
    pub long_entry_count: usize,
}

impl FoundEntry {
    pub fn is_directory(&self) -> bool {
        self.short.is_directory()
    }
}

/// Walks every 32-byte slot of `region` in storage order, calling `f` with
/// the slot's absolute sector and index within that sector.
fn visit_entries<H, F>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    mut f: F,
) -> Result<()>
where
    H: Hal,
    F: FnMut(u32, usize, &[u8]) -> Result<Flow>,
{
    let mut cluster = match region {
        DirRegion::Chain(c) => c,
        DirRegion::FixedRoot => 0,
    };
    let mut sector_in_region: u32 = 0;
    loop {
        let abs_sector = match region {
            DirRegion::FixedRoot => {
                if sector_in_region >= layout.root_dir_sectors {
                    break;
                }
                layout.root_dir_start_sector + sector_in_region
            }
            DirRegion::Chain(_) => {
                if fat.is_eoc(cluster) {
                    break;
                }
                let in_cluster = sector_in_region % layout.sectors_per_cluster as u32;
                layout.cluster_to_sector(cluster) + in_cluster
            }
        };
        card.read_sector(abs_sector, buf)?;
        for entry_idx in 0..(SECTOR_SIZE / 32) {
            let off = entry_idx * 32;
            match f(abs_sector, entry_idx, &buf[off..off + 32])? {
                Flow::Continue => {}
                Flow::Stop => return Ok(()),
            }
        }
        sector_in_region += 1;
        if let DirRegion::Chain(_) = region {
            if sector_in_region % layout.sectors_per_cluster as u32 == 0 {
                cluster = fat.read_entry(card, cluster)?;
            }
        }
    }
    Ok(())
}

/// Accumulates long-name entries (written highest-sequence-first) until the
/// short entry that terminates the run arrives.
struct LfnAssembler {
    units: [u16; MAX_FILENAME + 1],
    expected_seq: u8,
    checksum: u8,
    active: bool,
}

impl LfnAssembler {
    fn new() -> Self {
        LfnAssembler {
            units: [0; MAX_FILENAME + 1],
            expected_seq: 0,
            checksum: 0,
            active: false,
        }
    }

    fn reset(&mut self) {
        self.active = false;
    }

    fn accept(&mut self, long: &LongDirEntry) {
        let seq = long.sequence();
        if long.is_last() {
            self.active = true;
            self.expected_seq = seq;
            self.checksum = long.checksum();
        } else if !self.active || seq != self.expected_seq - 1 || long.checksum() != self.checksum {
            self.active = false;
            return;
        } else {
            self.expected_seq = seq;
        }
        if seq == 0 || (seq as usize) * 13 > MAX_FILENAME {
            self.active = false;
            return;
        }
        let mut block = [0u16; 13];
        long.chars_into(&mut block);
        let start = (seq as usize - 1) * 13;
        self.units[start..start + 13].copy_from_slice(&block);
    }

    fn matches_checksum(&self, short: &ShortDirEntry) -> bool {
        self.active && self.expected_seq == 1 && entry::lfn_checksum(short.name_raw()) == self.checksum
    }

    fn to_string(&self, out: &mut heapless::String<MAX_FILENAME>) {
        out.clear();
        for &unit in self.units.iter() {
            if unit == 0x0000 || unit == 0xFFFF {
                break;
            }
            let mut tmp = [0u16; 1];
            tmp[0] = unit;
            for c in char::decode_utf16(tmp.iter().copied()).flatten() {
                let _ = out.push(c);
            }
        }
    }
}

fn names_eq_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().zip(b.chars()).all(|(x, y)| x.eq_ignore_ascii_case(&y))
}

/// Looks up `name` in `region`, preferring a long-name match and falling
/// back to the 8.3 short name.
pub fn find<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    name: &str,
) -> Result<Option<FoundEntry>> {
    let mut assembler = LfnAssembler::new();
    let mut long_run: usize = 0;
    let mut result: Option<FoundEntry> = None;
    let mut long_name: heapless::String<MAX_FILENAME> = heapless::String::new();

    visit_entries(card, fat, layout, region, buf, |sector, idx, raw| {
        if raw[0] == crate::DIR_ENTRY_END {
            return Ok(Flow::Stop);
        }
        if raw[0] == crate::DIR_ENTRY_FREE {
            assembler.reset();
            long_run = 0;
            return Ok(Flow::Continue);
        }
        let short = ShortDirEntry::from_bytes(raw);
        if short.is_long_name() {
            assembler.accept(&LongDirEntry::from_bytes(raw));
            long_run += 1;
            return Ok(Flow::Continue);
        }
        if short.is_volume_id() {
            assembler.reset();
            long_run = 0;
            return Ok(Flow::Continue);
        }
        let matched = if assembler.matches_checksum(&short) {
            assembler.to_string(&mut long_name);
            names_eq_ignore_case(long_name.as_str(), name)
        } else {
            false
        } || {
            let mut short_name: heapless::String<12> = heapless::String::new();
            entry::decode_short_name(short.name_raw(), &mut short_name);
            names_eq_ignore_case(short_name.as_str(), name)
        };
        let run = long_run;
        assembler.reset();
        long_run = 0;
        if matched {
            result = Some(FoundEntry {
                short,
                sector,
                entry_index: idx,
                long_entry_count: run,
            });
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    })?;
    Ok(result)
}

/// Lists directory entries by invoking `f(name, short_entry)` for each live
/// entry; used by readdir.
pub fn list<H: Hal, F>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    mut f: F,
) -> Result<()>
where
    F: FnMut(&str, &ShortDirEntry) -> Result<()>,
{
    let mut assembler = LfnAssembler::new();
    let mut long_name: heapless::String<MAX_FILENAME> = heapless::String::new();
    let mut err: Result<()> = Ok(());
    visit_entries(card, fat, layout, region, buf, |_sector, _idx, raw| {
        if raw[0] == crate::DIR_ENTRY_END {
            return Ok(Flow::Stop);
        }
        if raw[0] == crate::DIR_ENTRY_FREE {
            assembler.reset();
            return Ok(Flow::Continue);
        }
        let short = ShortDirEntry::from_bytes(raw);
        if short.is_long_name() {
            assembler.accept(&LongDirEntry::from_bytes(raw));
            return Ok(Flow::Continue);
        }
        if short.is_volume_id() || short.is_dot_entry() {
            assembler.reset();
            return Ok(Flow::Continue);
        }
        let mut name: heapless::String<MAX_FILENAME> = heapless::String::new();
        if assembler.matches_checksum(&short) {
            assembler.to_string(&mut long_name);
            let _ = name.push_str(long_name.as_str());
        } else {
            let mut short_name: heapless::String<12> = heapless::String::new();
            entry::decode_short_name(short.name_raw(), &mut short_name);
            let _ = name.push_str(short_name.as_str());
        }
        assembler.reset();
        if let Err(e) = f(name.as_str(), &short) {
            err = Err(e);
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    })?;
    err
}

/// Extends `region` by one cluster (zero-filled), for `create` when no
/// existing sector has a free run of slots. Errors on the fixed root, which
/// cannot grow (§4.4 "Root directory full").
fn extend_chain<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
) -> Result<u32> {
    let first_cluster = match region {
        DirRegion::FixedRoot => return Err(Error::RootFull),
        DirRegion::Chain(c) => c,
    };
    let mut cluster = first_cluster;
    loop {
        let next = fat.read_entry(card, cluster)?;
        if fat.is_eoc(next) {
            break;
        }
        cluster = next;
    }
    let new_cluster = fat.alloc_chain_append(card, cluster)?;
    let zero = [0u8; SECTOR_SIZE];
    for i in 0..layout.sectors_per_cluster as u32 {
        card.write_sector(layout.cluster_to_sector(new_cluster) + i, &zero)?;
    }
    Ok(new_cluster)
}

/// Creates a new directory entry named `name` with the given attributes,
/// first cluster and size, allocating LFN entries only when the name isn't
/// already a valid 8.3 name.
#[allow(clippy::too_many_arguments)]
pub fn create<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    name: &str,
    attr: u8,
    first_cluster: u32,
    size: u32,
    now: DateTime,
) -> Result<FoundEntry> {
    if find(card, fat, layout, region, buf, name)?.is_some() {
        return Err(Error::AlreadyExists);
    }
    let short_raw = short_name_for(card, fat, layout, region, buf, name)?;
    let is_exact_8_3 = {
        let mut decoded: heapless::String<12> = heapless::String::new();
        entry::decode_short_name(&short_raw, &mut decoded);
        // `decode_short_name` always lowercases, so this is exact only when
        // `name` already is the canonical all-lowercase 8.3 rendering; any
        // other casing needs an LFN entry to remember how it was spelled.
        decoded.as_str() == name
    };

    let mut utf16: heapless::Vec<u16, MAX_FILENAME> = heapless::Vec::new();
    for unit in name.encode_utf16() {
        utf16.push(unit).map_err(|_| Error::PathTooLong)?;
    }
    let needs_lfn = cfg!(feature = "lfn") && !is_exact_8_3;
    let lfn_count = if needs_lfn {
        (utf16.len() + 12) / 13
    } else {
        0
    };
    let total_slots = lfn_count + 1;

    let mut short = ShortDirEntry::empty();
    short.raw[0..11].copy_from_slice(&short_raw);
    short.set_attr(attr);
    short.set_first_cluster(first_cluster);
    short.set_file_size(size);
    short.set_create_datetime(&now);
    short.set_write_datetime(&now);
    short.set_access_date(&now);

    let checksum = entry::lfn_checksum(&short_raw);
    let mut lfn_entries: heapless::Vec<LongDirEntry, 20> = heapless::Vec::new();
    for seq in 1..=lfn_count {
        let mut block = [0u16; 13];
        entry::fill_lfn_block(&utf16, (seq - 1) * 13, &mut block);
        let last = seq == lfn_count;
        let _ = lfn_entries.push(LongDirEntry::build(seq as u8, last, checksum, &block));
    }

    let (start_sector, start_idx) = match find_free_run(card, fat, layout, region, buf, total_slots) {
        Some(slot) => slot,
        None => {
            let new_cluster = extend_chain(card, fat, layout, region)?;
            (layout.cluster_to_sector(new_cluster), 0)
        }
    };

    write_run(card, buf, start_sector, start_idx, &lfn_entries, &short)?;

    Ok(FoundEntry {
        short,
        sector: start_sector,
        entry_index: start_idx + lfn_count,
        long_entry_count: lfn_count,
    })
}

/// Finds `count` consecutive free-or-past-end slots, which may span a sector
/// boundary (not a cluster boundary, to keep the write simple).
fn find_free_run<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    count: usize,
) -> Option<(u32, usize)> {
    let mut run_start: Option<(u32, usize)> = None;
    let mut run_len = 0usize;
    let mut found = None;
    let _ = visit_entries(card, fat, layout, region, buf, |sector, idx, raw| {
        let free = raw[0] == crate::DIR_ENTRY_FREE || raw[0] == crate::DIR_ENTRY_END;
        if free {
            if run_start.is_none() {
                run_start = Some((sector, idx));
            }
            run_len += 1;
            if run_len >= count {
                found = run_start;
                return Ok(Flow::Stop);
            }
        } else {
            run_start = None;
            run_len = 0;
        }
        if raw[0] == crate::DIR_ENTRY_END && run_len < count {
            // Past end-of-directory with no more entries to scan; stop.
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    });
    found
}

fn write_run<H: Hal>(
    card: &mut SdCard<H>,
    buf: &mut [u8; SECTOR_SIZE],
    start_sector: u32,
    start_idx: usize,
    lfn_entries: &[LongDirEntry],
    short: &ShortDirEntry,
) -> Result<()> {
    // LFN entries are stored highest-sequence-first.
    let mut slot = start_idx;
    let mut sector = start_sector;
    card.read_sector(sector, buf)?;
    for long in lfn_entries.iter().rev() {
        if slot >= SECTOR_SIZE / 32 {
            card.write_sector(sector, buf)?;
            sector += 1;
            slot = 0;
            card.read_sector(sector, buf)?;
        }
        long.write_into(&mut buf[slot * 32..slot * 32 + 32]);
        slot += 1;
    }
    if slot >= SECTOR_SIZE / 32 {
        card.write_sector(sector, buf)?;
        sector += 1;
        slot = 0;
        card.read_sector(sector, buf)?;
    }
    short.write_into(&mut buf[slot * 32..slot * 32 + 32]);
    card.write_sector(sector, buf)
}

/// Picks an unused 8.3 name, trying the literal upper-cased name first and
/// falling back to `NAMEn~k.EXT`-style numeric tails on collision.
fn short_name_for<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    name: &str,
) -> Result<[u8; 11]> {
    if let Ok(raw) = entry::encode_short_name(name) {
        if !short_name_taken(card, fat, layout, region, buf, &raw)? {
            return Ok(raw);
        }
    }
    let (base, ext) = match name.rsplit_once('.') {
        Some((b, e)) => (b, e),
        None => (name, ""),
    };
    let base_ascii: heapless::String<8> = base.chars().filter(|c| c.is_ascii_alphanumeric()).take(8).collect();
    for suffix in 1u32..100 {
        let mut candidate: heapless::String<12> = heapless::String::new();
        let keep = (base_ascii.len()).min(6);
        let _ = candidate.push_str(&base_ascii.as_str()[..keep]);
        let _ = candidate.push('~');
        let mut num: heapless::String<4> = heapless::String::new();
        let _ = core::fmt::write(&mut num, format_args!("{}", suffix));
        let _ = candidate.push_str(num.as_str());
        if !ext.is_empty() {
            let _ = candidate.push('.');
            let _ = candidate.push_str(&ext.to_ascii_uppercase());
        }
        if let Ok(raw) = entry::encode_short_name(candidate.as_str()) {
            if !short_name_taken(card, fat, layout, region, buf, &raw)? {
                return Ok(raw);
            }
        }
    }
    Err(Error::NotSupported)
}

fn short_name_taken<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    raw: &[u8; 11],
) -> Result<bool> {
    let mut taken = false;
    visit_entries(card, fat, layout, region, buf, |_s, _i, entry_bytes| {
        if entry_bytes[0] == crate::DIR_ENTRY_END {
            return Ok(Flow::Stop);
        }
        if entry_bytes[0] != crate::DIR_ENTRY_FREE && &entry_bytes[0..11] == raw {
            taken = true;
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    })?;
    Ok(taken)
}

/// Marks a found entry (and its preceding long-name run) free in place.
pub fn delete<H: Hal>(
    card: &mut SdCard<H>,
    layout: &Layout,
    buf: &mut [u8; SECTOR_SIZE],
    found: &FoundEntry,
) -> Result<()> {
    card.read_sector(found.sector, buf)?;
    buf[found.entry_index * 32] = crate::DIR_ENTRY_FREE;
    card.write_sector(found.sector, buf)?;
    // LFN entries immediately precede the short entry; in the simple case
    // they're in the same sector (true whenever a name doesn't straddle a
    // sector boundary, which `write_run` never creates on its own sector).
    if found.long_entry_count > 0 && found.entry_index >= found.long_entry_count {
        card.read_sector(found.sector, buf)?;
        for i in 0..found.long_entry_count {
            buf[(found.entry_index - 1 - i) * 32] = crate::DIR_ENTRY_FREE;
        }
        card.write_sector(found.sector, buf)?;
    }
    Ok(())
}

/// `true` if `region` contains nothing but `.`/`..` and free/end markers.
pub fn is_empty<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    region: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
) -> Result<bool> {
    let mut empty = true;
    visit_entries(card, fat, layout, region, buf, |_s, _i, raw| {
        if raw[0] == crate::DIR_ENTRY_END {
            return Ok(Flow::Stop);
        }
        if raw[0] == crate::DIR_ENTRY_FREE {
            return Ok(Flow::Continue);
        }
        let short = ShortDirEntry::from_bytes(raw);
        if short.is_long_name() || short.is_dot_entry() {
            return Ok(Flow::Continue);
        }
        empty = false;
        Ok(Flow::Stop)
    })?;
    Ok(empty)
}

/// Resolves `path` from `start` to a directory region, one component at a
/// time. `..` always returns to the volume root rather than the true parent
/// (preserved from the original implementation, which never tracked parent
/// clusters — see design notes).
pub fn resolve_dir<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    start: DirRegion,
    root: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    path: &str,
) -> Result<DirRegion> {
    let mut current = if path.starts_with('/') { root } else { start };
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if component == "." {
            continue;
        }
        if component == ".." {
            current = root;
            continue;
        }
        let found = find(card, fat, layout, current, buf, component)?.ok_or(Error::NotFound)?;
        if !found.is_directory() {
            return Err(Error::NotADirectory);
        }
        current = DirRegion::Chain(found.short.first_cluster());
    }
    Ok(current)
}

/// Resolves all but the last path component to a directory, returning that
/// region plus the final component name for the caller to look up or create.
pub fn resolve_parent<'a, H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    start: DirRegion,
    root: DirRegion,
    buf: &mut [u8; SECTOR_SIZE],
    path: &'a str,
) -> Result<(DirRegion, &'a str)> {
    let (parent, name) = match path.rsplit_once('/') {
        Some((p, n)) => (p, n),
        None => return Ok((start, path)),
    };
    if name.is_empty() {
        return Err(Error::InvalidName);
    }
    let parent = if parent.is_empty() { root } else { parent };
    let region = resolve_dir(card, fat, layout, start, root, buf, parent)?;
    Ok((region, name))
}

pub const ATTR_DIR_DEFAULT: u8 = ATTR_DIRECTORY;

/// A stateful directory cursor for `opendir`/`readdir`/`closedir`-style use.
/// Owns its own sector buffer, independent of the volume's FAT buffer and of
/// any open file's buffer.
pub struct DirHandle {
    region: DirRegion,
    cluster: u32,
    sector_in_region: u32,
    entry_idx: usize,
    buffer: [u8; SECTOR_SIZE],
    buffer_sector: Option<u32>,
    assembler: LfnAssembler,
}

impl DirHandle {
    pub fn open(region: DirRegion) -> Self {
        let cluster = match region {
            DirRegion::Chain(c) => c,
            DirRegion::FixedRoot => 0,
        };
        DirHandle {
            region,
            cluster,
            sector_in_region: 0,
            entry_idx: 0,
            buffer: [0u8; SECTOR_SIZE],
            buffer_sector: None,
            assembler: LfnAssembler::new(),
        }
    }

    pub fn rewind(&mut self) {
        self.cluster = match self.region {
            DirRegion::Chain(c) => c,
            DirRegion::FixedRoot => 0,
        };
        self.sector_in_region = 0;
        self.entry_idx = 0;
        self.buffer_sector = None;
        self.assembler.reset();
    }

    fn current_abs_sector(&self, fat: &FatTable, layout: &Layout) -> Option<u32> {
        match self.region {
            DirRegion::FixedRoot => {
                if self.sector_in_region < layout.root_dir_sectors {
                    Some(layout.root_dir_start_sector + self.sector_in_region)
                } else {
                    None
                }
            }
            DirRegion::Chain(_) => {
                if fat.is_eoc(self.cluster) {
                    None
                } else {
                    let in_cluster = self.sector_in_region % layout.sectors_per_cluster as u32;
                    Some(layout.cluster_to_sector(self.cluster) + in_cluster)
                }
            }
        }
    }

    /// Returns the next live entry's assembled name and short entry, or
    /// `None` once the directory is exhausted.
    pub fn next<H: Hal>(
        &mut self,
        card: &mut SdCard<H>,
        fat: &mut FatTable,
        layout: &Layout,
    ) -> Result<Option<(heapless::String<MAX_FILENAME>, ShortDirEntry)>> {
        loop {
            let abs_sector = match self.current_abs_sector(fat, layout) {
                Some(s) => s,
                None => return Ok(None),
            };
            if self.buffer_sector != Some(abs_sector) {
                card.read_sector(abs_sector, &mut self.buffer)?;
                self.buffer_sector = Some(abs_sector);
            }
            if self.entry_idx >= SECTOR_SIZE / 32 {
                self.entry_idx = 0;
                self.sector_in_region += 1;
                if let DirRegion::Chain(_) = self.region {
                    if self.sector_in_region % layout.sectors_per_cluster as u32 == 0 {
                        self.cluster = fat.read_entry(card, self.cluster)?;
                    }
                }
                self.buffer_sector = None;
                continue;
            }
            let off = self.entry_idx * 32;
            let mut raw = [0u8; 32];
            raw.copy_from_slice(&self.buffer[off..off + 32]);
            self.entry_idx += 1;
            if raw[0] == crate::DIR_ENTRY_END {
                return Ok(None);
            }
            if raw[0] == crate::DIR_ENTRY_FREE {
                self.assembler.reset();
                continue;
            }
            let short = ShortDirEntry::from_bytes(&raw);
            if short.is_long_name() {
                self.assembler.accept(&LongDirEntry::from_bytes(&raw));
                continue;
            }
            if short.is_volume_id() || short.is_dot_entry() {
                self.assembler.reset();
                continue;
            }
            let mut name: heapless::String<MAX_FILENAME> = heapless::String::new();
            if self.assembler.matches_checksum(&short) {
                let mut long_name: heapless::String<MAX_FILENAME> = heapless::String::new();
                self.assembler.to_string(&mut long_name);
                let _ = name.push_str(long_name.as_str());
            } else {
                let mut short_name: heapless::String<12> = heapless::String::new();
                entry::decode_short_name(short.name_raw(), &mut short_name);
                let _ = name.push_str(short_name.as_str());
            }
            self.assembler.reset();
            return Ok(Some((name, short)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_eq_ignore_case_matches() {
        assert!(names_eq_ignore_case("readme.txt", "README.TXT"));
        assert!(!names_eq_ignore_case("readme.txt", "other.txt"));
    }
}
