//! Volume manager (C8): mount/unmount, path-qualified file and directory
//! operations, free-space and label queries. The single entry point
//! applications use; everything else in this crate is reachable through it.

use crate::bpb::{self, Bpb, Layout};
use crate::config::Config;
use crate::dir::{self, DirHandle, DirRegion};
use crate::entry::ShortDirEntry;
use crate::error::{Error, Result};
use crate::fat::FatTable;
use crate::file::{self, FileHandle, OpenMode, SeekFrom};
use crate::hal::Hal;
use crate::sd::{CardInfo, SdCard};
use crate::{ATTR_DIRECTORY, FatType, MAX_FILENAME, MAX_OPEN_FILES, MAX_PATH, SECTOR_SIZE};

/// Handle returned by `open`, indexing into the volume's fixed-size open-file
/// table (§5 "at most `MAX_OPEN_FILES` files open at once").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId(usize);

/// Metadata about a named entry, mirroring `libresd_fileinfo_t`.
#[derive(Debug, Clone, Copy)]
pub struct FileInfo {
    pub size: u32,
    pub attr: u8,
    pub is_directory: bool,
}

/// Volume/card info, mirroring `libresd_info_t`.
#[derive(Debug, Clone, Copy)]
pub struct VolumeInfo {
    pub fat_type: FatType,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub total_clusters: u32,
    pub volume_serial: u32,
}

pub struct Volume<H: Hal> {
    card: SdCard<H>,
    layout: Layout,
    fat: FatTable,
    volume_label: [u8; 11],
    volume_serial: u32,
    root: DirRegion,
    cwd: DirRegion,
    cwd_path: heapless::String<MAX_PATH>,
    files: [Option<FileHandle>; MAX_OPEN_FILES],
    scratch: [u8; SECTOR_SIZE],
}

impl<H: Hal> Volume<H> {
    /// Initializes the card and mounts the first FAT-typed partition it
    /// finds (or the boot sector itself, for a superfloppy volume with no
    /// partition table).
    pub fn mount(hal: H, config: Config) -> Result<Self> {
        let mut card = SdCard::init(hal, config)?;
        let mut sector0 = [0u8; SECTOR_SIZE];
        card.read_sector(0, &mut sector0)?;

        let (partition_start, boot_sector) = if crate::read_u16(&sector0, 11) == 512
            && crate::read_u16(&sector0, 510) == 0xAA55
            && sector0[13] != 0
        {
            (0, sector0)
        } else {
            let start = bpb::find_partition(&sector0)?;
            let mut boot = [0u8; SECTOR_SIZE];
            card.read_sector(start, &mut boot)?;
            (start, boot)
        };

        let parsed = Bpb::parse(&boot_sector)?;
        let layout = Layout::from_bpb(&parsed, partition_start)?;
        let root = if layout.fat_type == FatType::Fat32 {
            DirRegion::Chain(layout.root_cluster)
        } else {
            DirRegion::FixedRoot
        };
        let fat = FatTable::new(layout);

        #[cfg(feature = "log")]
        log::debug!(
            "mounted {:?} volume: {} data clusters, {} bytes/sector",
            layout.fat_type,
            layout.total_clusters,
            layout.bytes_per_sector
        );

        let mut cwd_path = heapless::String::new();
        let _ = cwd_path.push('/');

        Ok(Volume {
            card,
            layout,
            fat,
            volume_label: parsed.volume_label,
            volume_serial: parsed.volume_serial,
            root,
            cwd: root,
            cwd_path,
            files: Default::default(),
            scratch: [0u8; SECTOR_SIZE],
        })
    }

    /// Writes back the FAT buffer. Open files are flushed independently via
    /// [`Volume::close`] or [`Volume::flush`].
    pub fn sync(&mut self) -> Result<()> {
        self.fat.flush(&mut self.card)
    }

    pub fn unmount(mut self) -> Result<()> {
        self.sync()
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            fat_type: self.layout.fat_type,
            bytes_per_sector: self.layout.bytes_per_sector,
            sectors_per_cluster: self.layout.sectors_per_cluster,
            total_clusters: self.layout.total_clusters,
            volume_serial: self.volume_serial,
        }
    }

    pub fn card_info(&self) -> CardInfo {
        self.card.info()
    }

    /// Number of free clusters, computed by a full FAT scan the first time
    /// it's asked for and cached after that (FSInfo is never consulted or
    /// written, matching the original's in-memory-only free count).
    pub fn free_clusters(&mut self) -> Result<u32> {
        if let Some(free) = self.fat.free_clusters() {
            return Ok(free);
        }
        let mut free = 0u32;
        for cluster in crate::FIRST_DATA_CLUSTER..(self.layout.total_clusters + crate::FIRST_DATA_CLUSTER) {
            if self.fat.read_entry(&mut self.card, cluster)? == crate::FREE_CLUSTER {
                free += 1;
            }
        }
        self.fat.set_free_clusters(Some(free));
        Ok(free)
    }

    pub fn label(&self) -> heapless::String<12> {
        let mut out = heapless::String::new();
        let trimmed_len = self.volume_label.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
        for &b in &self.volume_label[..trimmed_len] {
            let _ = out.push(b as char);
        }
        out
    }

    pub fn cwd(&self) -> &str {
        self.cwd_path.as_str()
    }

    fn now(&mut self) -> crate::DateTime {
        self.card.hal_mut().datetime()
    }

    fn resolve_parent<'a>(&mut self, path: &'a str) -> Result<(DirRegion, &'a str)> {
        dir::resolve_parent(
            &mut self.card,
            &mut self.fat,
            &self.layout,
            self.cwd,
            self.root,
            &mut self.scratch,
            path,
        )
    }

    fn find_in(&mut self, region: DirRegion, name: &str) -> Result<Option<dir::FoundEntry>> {
        dir::find(&mut self.card, &mut self.fat, &self.layout, region, &mut self.scratch, name)
    }

    /// Changes the working directory. `..` intentionally resolves to the
    /// volume root rather than the true parent, matching the original FAT
    /// layer's documented shortcut (it never tracked parent clusters).
    pub fn chdir(&mut self, path: &str) -> Result<()> {
        let region = dir::resolve_dir(
            &mut self.card,
            &mut self.fat,
            &self.layout,
            self.cwd,
            self.root,
            &mut self.scratch,
            path,
        )?;
        self.cwd = region;
        if path.starts_with('/') {
            self.cwd_path.clear();
        } else if !self.cwd_path.ends_with('/') {
            let _ = self.cwd_path.push('/');
        }
        for component in path.split('/').filter(|c| !c.is_empty()) {
            if component == "." {
                continue;
            }
            if component == ".." {
                self.cwd_path.clear();
                let _ = self.cwd_path.push('/');
                continue;
            }
            if !self.cwd_path.ends_with('/') {
                let _ = self.cwd_path.push('/');
            }
            let _ = self.cwd_path.push_str(component);
        }
        if self.cwd_path.is_empty() {
            let _ = self.cwd_path.push('/');
        }
        Ok(())
    }

    pub fn stat(&mut self, path: &str) -> Result<FileInfo> {
        let (region, name) = self.resolve_parent(path)?;
        let found = self.find_in(region, name)?.ok_or(Error::NotFound)?;
        Ok(FileInfo {
            size: found.short.file_size(),
            attr: found.short.attr(),
            is_directory: found.is_directory(),
        })
    }

    pub fn exists(&mut self, path: &str) -> Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn alloc_file_slot(&mut self) -> Result<usize> {
        self.files.iter().position(|f| f.is_none()).ok_or(Error::TooManyOpen)
    }

    /// Opens `path` under `mode`, creating it first if `CREATE` is set and
    /// it doesn't already exist.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileId> {
        if !cfg!(feature = "write") && mode.intersects(OpenMode::WRITE | OpenMode::CREATE) {
            return Err(Error::NotSupported);
        }
        let slot = self.alloc_file_slot()?;
        let (region, name) = self.resolve_parent(path)?;
        let found = match self.find_in(region, name)? {
            Some(f) => {
                if f.is_directory() {
                    return Err(Error::NotAFile);
                }
                f
            }
            None => {
                if !mode.contains(OpenMode::CREATE) {
                    return Err(Error::NotFound);
                }
                let now = self.now();
                dir::create(
                    &mut self.card,
                    &mut self.fat,
                    &self.layout,
                    region,
                    &mut self.scratch,
                    name,
                    0,
                    0,
                    0,
                    now,
                )?
            }
        };
        let mut handle = FileHandle::from_entry(&found.short, found.sector, found.entry_index, mode);
        if mode.contains(OpenMode::TRUNCATE) && mode.contains(OpenMode::WRITE) {
            // Truncate-on-open always means "discard everything", which
            // `file::truncate` can't express once `size` has already been
            // zeroed (it truncates at the *current position*, not at
            // whatever `size` says) — free the chain directly instead.
            if handle.first_cluster != 0 {
                self.fat.free_chain(&mut self.card, handle.first_cluster)?;
            }
            handle.clear_to_empty();
        }
        if mode.contains(OpenMode::APPEND) {
            handle.position = handle.size();
        }
        self.files[slot] = Some(handle);
        Ok(FileId(slot))
    }

    fn slot(&mut self, id: FileId) -> Result<&mut FileHandle> {
        self.files[id.0].as_mut().ok_or(Error::InvalidHandle)
    }

    pub fn read(&mut self, id: FileId, out: &mut [u8]) -> Result<usize> {
        let handle = self.slot(id)?;
        file::read(&mut self.card, &mut self.fat, &self.layout, handle, out)
    }

    pub fn write(&mut self, id: FileId, data: &[u8]) -> Result<usize> {
        if !cfg!(feature = "write") {
            return Err(Error::NotSupported);
        }
        let handle = self.slot(id)?;
        file::write(&mut self.card, &mut self.fat, &self.layout, handle, data)
    }

    pub fn seek(&mut self, id: FileId, from: SeekFrom) -> Result<u32> {
        let handle = self.slot(id)?;
        file::seek(&mut self.card, &mut self.fat, &self.layout, handle, from)
    }

    pub fn tell(&mut self, id: FileId) -> Result<u32> {
        Ok(self.slot(id)?.position())
    }

    pub fn eof(&mut self, id: FileId) -> Result<bool> {
        Ok(self.slot(id)?.is_eof())
    }

    pub fn file_size(&mut self, id: FileId) -> Result<u32> {
        Ok(self.slot(id)?.size())
    }

    pub fn flush(&mut self, id: FileId) -> Result<()> {
        let now = self.now();
        let handle = self.slot(id)?;
        file::flush(&mut self.card, handle, now)
    }

    pub fn truncate(&mut self, id: FileId) -> Result<()> {
        let handle = self.slot(id)?;
        file::truncate(&mut self.card, &mut self.fat, &self.layout, handle)
    }

    pub fn close(&mut self, id: FileId) -> Result<()> {
        let now = self.now();
        if let Some(mut handle) = self.files[id.0].take() {
            file::close(&mut self.card, &mut handle, now)
        } else {
            Err(Error::InvalidHandle)
        }
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        if !cfg!(feature = "write") {
            return Err(Error::NotSupported);
        }
        let (region, name) = self.resolve_parent(path)?;
        let found = self.find_in(region, name)?.ok_or(Error::NotFound)?;
        if found.is_directory() {
            return Err(Error::NotAFile);
        }
        let first_cluster = found.short.first_cluster();
        if first_cluster != 0 {
            self.fat.free_chain(&mut self.card, first_cluster)?;
        }
        // The original never clears LFN slots on unlink either; only the
        // short entry is marked free, leaving orphaned long-name entries
        // for the next `create` to overwrite or skip over as free space.
        dir::delete(&mut self.card, &self.layout, &mut self.scratch, &found)
    }

    pub fn rename(&mut self, old_path: &str, new_name: &str) -> Result<()> {
        if !cfg!(feature = "write") {
            return Err(Error::NotSupported);
        }
        let (region, name) = self.resolve_parent(old_path)?;
        let found = self.find_in(region, name)?.ok_or(Error::NotFound)?;
        if self.find_in(region, new_name)?.is_some() {
            return Err(Error::AlreadyExists);
        }
        // Matches the original: only the 8.3 name is rewritten in place,
        // long-name entries are left untouched (and so become stale).
        let short_raw = crate::entry::encode_short_name(new_name)?;
        self.card.read_sector(found.sector, &mut self.scratch)?;
        let off = found.entry_index * 32;
        self.scratch[off..off + 11].copy_from_slice(&short_raw);
        self.card.write_sector(found.sector, &self.scratch)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        if !cfg!(feature = "dirs") {
            return Err(Error::NotSupported);
        }
        let (region, name) = self.resolve_parent(path)?;
        if self.find_in(region, name)?.is_some() {
            return Err(Error::AlreadyExists);
        }
        let new_cluster = self.fat.alloc_cluster(&mut self.card)?;
        let zero = [0u8; SECTOR_SIZE];
        for i in 0..self.layout.sectors_per_cluster as u32 {
            self.card.write_sector(self.layout.cluster_to_sector(new_cluster) + i, &zero)?;
        }
        let now = self.now();
        dir::create(
            &mut self.card,
            &mut self.fat,
            &self.layout,
            region,
            &mut self.scratch,
            name,
            ATTR_DIRECTORY,
            new_cluster,
            0,
            now,
        )?;

        // `.` points at the new directory; `..` is written with a zero
        // cluster (meaning "root") because this layer never resolves or
        // stores the true parent cluster — preserved from the original.
        let mut dot = ShortDirEntry::empty();
        dot.raw[0..11].copy_from_slice(b".          ");
        dot.set_attr(ATTR_DIRECTORY);
        dot.set_first_cluster(new_cluster);
        dot.set_create_datetime(&now);
        dot.set_write_datetime(&now);

        let mut dotdot = ShortDirEntry::empty();
        dotdot.raw[0..11].copy_from_slice(b"..         ");
        dotdot.set_attr(ATTR_DIRECTORY);
        dotdot.set_first_cluster(0);
        dotdot.set_create_datetime(&now);
        dotdot.set_write_datetime(&now);

        let first_sector = self.layout.cluster_to_sector(new_cluster);
        self.card.read_sector(first_sector, &mut self.scratch)?;
        dot.write_into(&mut self.scratch[0..32]);
        dotdot.write_into(&mut self.scratch[32..64]);
        self.card.write_sector(first_sector, &self.scratch)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if !cfg!(feature = "dirs") {
            return Err(Error::NotSupported);
        }
        let (region, name) = self.resolve_parent(path)?;
        let found = self.find_in(region, name)?.ok_or(Error::NotFound)?;
        if !found.is_directory() {
            return Err(Error::NotADirectory);
        }
        let child = DirRegion::Chain(found.short.first_cluster());
        if !dir::is_empty(&mut self.card, &mut self.fat, &self.layout, child, &mut self.scratch)? {
            return Err(Error::DirectoryNotEmpty);
        }
        self.fat.free_chain(&mut self.card, found.short.first_cluster())?;
        dir::delete(&mut self.card, &self.layout, &mut self.scratch, &found)
    }

    /// Opens a directory cursor for `readdir`. `"."` refers to the current
    /// working directory.
    pub fn opendir(&mut self, path: &str) -> Result<DirHandle> {
        let region = if path == "." || path.is_empty() {
            self.cwd
        } else {
            dir::resolve_dir(
                &mut self.card,
                &mut self.fat,
                &self.layout,
                self.cwd,
                self.root,
                &mut self.scratch,
                path,
            )?
        };
        Ok(DirHandle::open(region))
    }

    pub fn readdir(
        &mut self,
        dir: &mut DirHandle,
    ) -> Result<Option<(heapless::String<MAX_FILENAME>, FileInfo)>> {
        match dir.next(&mut self.card, &mut self.fat, &self.layout)? {
            Some((name, short)) => Ok(Some((
                name,
                FileInfo {
                    size: short.file_size(),
                    attr: short.attr(),
                    is_directory: short.is_directory(),
                },
            ))),
            None => Ok(None),
        }
    }
}

