//! File engine (C7), §4.4.
//!
//! A file handle owns exactly one 512-byte sector buffer, independent of the
//! volume's own FAT-sector buffer and of any other open file's buffer
//! (§5's "no shared mutable state between handles").

use crate::bpb::Layout;
use crate::entry::ShortDirEntry;
use crate::error::{Error, Result};
use crate::fat::FatTable;
use crate::hal::{DateTime, Hal};
use crate::sd::SdCard;
use crate::SECTOR_SIZE;

bitflags::bitflags! {
    /// Mirrors `libresd_open_mode_t`'s OR-able open flags.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        const READ = 0b0_0001;
        const WRITE = 0b0_0010;
        const CREATE = 0b0_0100;
        const APPEND = 0b0_1000;
        const TRUNCATE = 0b1_0000;
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SeekFrom {
    Start(u32),
    Current(i32),
    End(i32),
}

/// An open file. `dir_sector`/`dir_entry_index` locate the 8.3 entry that
/// must be rewritten on flush (size, first cluster, write time).
pub struct FileHandle {
    pub first_cluster: u32,
    current_cluster: u32,
    cluster_index: u32,
    pub position: u32,
    pub size: u32,
    pub mode: OpenMode,
    dirty: bool,
    buffer: [u8; SECTOR_SIZE],
    buffer_sector: Option<u32>,
    dir_sector: u32,
    dir_entry_index: usize,
}

impl FileHandle {
    pub fn from_entry(short: &ShortDirEntry, dir_sector: u32, dir_entry_index: usize, mode: OpenMode) -> Self {
        FileHandle {
            first_cluster: short.first_cluster(),
            current_cluster: short.first_cluster(),
            cluster_index: 0,
            position: 0,
            size: short.file_size(),
            mode,
            dirty: false,
            buffer: [0u8; SECTOR_SIZE],
            buffer_sector: None,
            dir_sector,
            dir_entry_index,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.size
    }

    pub fn is_writable(&self) -> bool {
        self.mode.contains(OpenMode::WRITE)
    }

    /// Resets a handle to an empty file with no clusters. The caller is
    /// responsible for freeing `first_cluster`'s chain first.
    pub fn clear_to_empty(&mut self) {
        self.first_cluster = 0;
        self.current_cluster = 0;
        self.cluster_index = 0;
        self.position = 0;
        self.size = 0;
        self.buffer_sector = None;
        self.dirty = false;
    }
}

fn flush_buffer<H: Hal>(card: &mut SdCard<H>, file: &mut FileHandle) -> Result<()> {
    if !file.dirty {
        return Ok(());
    }
    let sector = file.buffer_sector.ok_or(Error::Internal)?;
    card.write_sector(sector, &file.buffer)?;
    file.dirty = false;
    Ok(())
}

fn ensure_buffer<H: Hal>(card: &mut SdCard<H>, file: &mut FileHandle, abs_sector: u32) -> Result<()> {
    if file.buffer_sector == Some(abs_sector) {
        return Ok(());
    }
    flush_buffer(card, file)?;
    card.read_sector(abs_sector, &mut file.buffer)?;
    file.buffer_sector = Some(abs_sector);
    Ok(())
}

/// Advances (or, for writable files, extends) the cluster chain to the
/// cluster holding `target_index` (0-based, relative to `first_cluster`).
fn locate_cluster<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    file: &mut FileHandle,
    target_index: u32,
) -> Result<u32> {
    if file.first_cluster == 0 {
        if !file.is_writable() {
            return Err(Error::Eof);
        }
        let new = fat.alloc_cluster(card)?;
        file.first_cluster = new;
        file.current_cluster = new;
        file.cluster_index = 0;
    }
    if target_index < file.cluster_index {
        file.current_cluster = file.first_cluster;
        file.cluster_index = 0;
    }
    while file.cluster_index < target_index {
        let next = fat.read_entry(card, file.current_cluster)?;
        if fat.is_eoc(next) {
            if file.is_writable() {
                file.current_cluster = fat.alloc_chain_append(card, file.current_cluster)?;
            } else {
                return Err(Error::Eof);
            }
        } else {
            file.current_cluster = next;
        }
        file.cluster_index += 1;
    }
    Ok(file.current_cluster)
}

pub fn read<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    file: &mut FileHandle,
    out: &mut [u8],
) -> Result<usize> {
    let cluster_bytes = layout.sectors_per_cluster as u32 * SECTOR_SIZE as u32;
    let mut total = 0;
    while total < out.len() && file.position < file.size {
        let cluster_index = file.position / cluster_bytes;
        let offset_in_cluster = file.position % cluster_bytes;
        let sector_in_cluster = offset_in_cluster / SECTOR_SIZE as u32;
        let offset_in_sector = (offset_in_cluster % SECTOR_SIZE as u32) as usize;
        let cluster = locate_cluster(card, fat, file, cluster_index)?;
        let abs_sector = layout.cluster_to_sector(cluster) + sector_in_cluster;
        ensure_buffer(card, file, abs_sector)?;
        let remaining_in_sector = SECTOR_SIZE - offset_in_sector;
        let remaining_in_file = (file.size - file.position) as usize;
        let n = (out.len() - total).min(remaining_in_sector).min(remaining_in_file);
        out[total..total + n].copy_from_slice(&file.buffer[offset_in_sector..offset_in_sector + n]);
        total += n;
        file.position += n as u32;
    }
    Ok(total)
}

pub fn write<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    file: &mut FileHandle,
    data: &[u8],
) -> Result<usize> {
    if !file.is_writable() {
        return Err(Error::ReadOnly);
    }
    let cluster_bytes = layout.sectors_per_cluster as u32 * SECTOR_SIZE as u32;
    let mut total = 0;
    while total < data.len() {
        let cluster_index = file.position / cluster_bytes;
        let offset_in_cluster = file.position % cluster_bytes;
        let sector_in_cluster = offset_in_cluster / SECTOR_SIZE as u32;
        let offset_in_sector = (offset_in_cluster % SECTOR_SIZE as u32) as usize;
        let cluster = locate_cluster(card, fat, file, cluster_index)?;
        let abs_sector = layout.cluster_to_sector(cluster) + sector_in_cluster;
        ensure_buffer(card, file, abs_sector)?;
        let remaining_in_sector = SECTOR_SIZE - offset_in_sector;
        let n = (data.len() - total).min(remaining_in_sector);
        file.buffer[offset_in_sector..offset_in_sector + n].copy_from_slice(&data[total..total + n]);
        file.dirty = true;
        total += n;
        file.position += n as u32;
        if file.position > file.size {
            file.size = file.position;
        }
    }
    Ok(total)
}

pub fn seek<H: Hal>(
    _card: &mut SdCard<H>,
    _fat: &mut FatTable,
    _layout: &Layout,
    file: &mut FileHandle,
    from: SeekFrom,
) -> Result<u32> {
    let target = match from {
        SeekFrom::Start(p) => p as i64,
        SeekFrom::Current(d) => file.position as i64 + d as i64,
        SeekFrom::End(d) => file.size as i64 + d as i64,
    };
    if target < 0 || target > file.size as i64 {
        return Err(Error::SeekError);
    }
    file.position = target as u32;
    Ok(file.position)
}

/// Truncates the file at the current position (§4.4 "truncate at current
/// position"): bytes beyond `file.position` are discarded and their
/// clusters freed. A position of 0 frees the whole chain.
pub fn truncate<H: Hal>(
    card: &mut SdCard<H>,
    fat: &mut FatTable,
    layout: &Layout,
    file: &mut FileHandle,
) -> Result<()> {
    if !file.is_writable() {
        return Err(Error::ReadOnly);
    }
    if file.first_cluster == 0 {
        file.size = file.position;
        return Ok(());
    }
    if file.position == 0 {
        fat.free_chain(card, file.first_cluster)?;
        file.clear_to_empty();
        return Ok(());
    }
    let cluster_bytes = layout.sectors_per_cluster as u32 * SECTOR_SIZE as u32;
    let last_index = (file.position - 1) / cluster_bytes;
    let last_cluster = locate_cluster(card, fat, file, last_index)?;
    let next = fat.read_entry(card, last_cluster)?;
    if !fat.is_eoc(next) {
        fat.free_chain(card, next)?;
        fat.write_entry(card, last_cluster, 0x0FFF_FFFF)?;
    }
    file.size = file.position;
    Ok(())
}

/// Writes back the dirty data buffer and the directory entry's size/cluster/
/// write-time fields.
pub fn flush<H: Hal>(
    card: &mut SdCard<H>,
    file: &mut FileHandle,
    now: DateTime,
) -> Result<()> {
    flush_buffer(card, file)?;
    if !file.is_writable() {
        return Ok(());
    }
    let mut dir_buf = [0u8; SECTOR_SIZE];
    card.read_sector(file.dir_sector, &mut dir_buf)?;
    let off = file.dir_entry_index * 32;
    let mut short = ShortDirEntry::from_bytes(&dir_buf[off..off + 32]);
    short.set_file_size(file.size);
    short.set_first_cluster(file.first_cluster);
    short.set_write_datetime(&now);
    short.write_into(&mut dir_buf[off..off + 32]);
    card.write_sector(file.dir_sector, &dir_buf)?;
    file.buffer_sector = None;
    Ok(())
}

pub fn close<H: Hal>(card: &mut SdCard<H>, file: &mut FileHandle, now: DateTime) -> Result<()> {
    flush(card, file, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_combines_read_write() {
        let mode = OpenMode::READ | OpenMode::WRITE;
        assert!(mode.contains(OpenMode::READ));
        assert!(mode.contains(OpenMode::WRITE));
        assert!(!mode.contains(OpenMode::APPEND));
    }
}
