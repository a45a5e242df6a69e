/// CP/M 2.2 filesystem over a CPCEMU image

/// Allocation block bitmap
pub mod alloc;
/// Directory entries and 8.3 names
pub mod dirent;
/// Disk Parameter Block profiles and derived geometry
pub mod dpb;

pub use alloc::AllocBitmap;
pub use dirent::{denormalise, DirEntry, NO_FILE};
pub use dpb::{DiskParameterBlock, Layout, DIR_ENTRY_SIZE, RECORD_SIZE};

use crate::amsdos::{self, AmsdosHeader};
use crate::cpcemu::records::{SECTORS_PER_TRACK, SECTOR_SIZE};
use crate::cpcemu::{CpcImage, DiskVariant};
use crate::error::{DskError, Result};
use log::debug;
use std::path::Path;

/// Byte marking end-of-file in CP/M text files
const TEXT_EOF: u8 = 0x1A;

/// A file as shown by the `dir` listing
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Canonical `NAME.EXT`
    pub name: String,
    /// Size in kilobytes, rounded up from the record count
    pub size_kb: usize,
    /// Read-only attribute
    pub read_only: bool,
    /// System attribute
    pub system: bool,
}

/// One extent of a file together with its on-disk sector chain
#[derive(Debug, Clone)]
pub struct ExtentInfo {
    /// The directory entry
    pub entry: DirEntry,
    /// `(track, sector_id)` for every sector the extent's blocks occupy
    pub sectors: Vec<(u8, u8)>,
}

/// Everything `info` reports about one file
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Extents in chain order
    pub extents: Vec<ExtentInfo>,
    /// `(track, min_sector_id, max_sector_id)` runs for ROM-side loaders
    pub track_runs: Vec<(u8, u8, u8)>,
    /// Decoded AMSDOS header, when the first record checksums
    pub header: Option<AmsdosHeader>,
}

/// A run of file records sharing one sector, as produced for hex dumps
#[derive(Debug, Clone)]
pub struct SectorChunk {
    /// Track holding the sector
    pub track: usize,
    /// Logical sector index within the track
    pub sector: usize,
    /// Display offset: block index times block size plus the sector offset
    pub offset: usize,
    /// Record data, a multiple of 128 bytes
    pub data: Vec<u8>,
}

/// One 128-byte record with its position, used internally to walk a file
struct FileRecord {
    track: usize,
    sector: usize,
    offset: usize,
    data: [u8; RECORD_SIZE],
}

/// The CP/M filesystem context: image handle, resolved DPB, derived sizes.
///
/// Constructed by `open`/`create` and passed to every operation; there is no
/// process-wide state.
#[derive(Debug)]
pub struct CpmFs {
    image: CpcImage,
    variant: DiskVariant,
    dpb: DiskParameterBlock,
    layout: Layout,
}

impl CpmFs {
    /// Open an existing image and resolve its CP/M geometry
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(CpcImage::open(path)?)
    }

    /// Create a freshly formatted image and mount it
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::init(CpcImage::format(path)?)
    }

    /// Resolve variant and DPB, derive sizes, rebuild the skew table
    fn init(mut image: CpcImage) -> Result<Self> {
        let variant = image.variant()?;
        let dpb = DiskParameterBlock::for_variant(variant);
        let layout = Layout::from_dpb(&dpb)?;
        image.rebuild_skew()?;

        debug!("mounted {} disk, {} directory entries", variant, dpb.dir_entries());

        Ok(Self {
            image,
            variant,
            dpb,
            layout,
        })
    }

    /// The detected disk variant
    pub fn variant(&self) -> DiskVariant {
        self.variant
    }

    /// The derived geometry
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The underlying CPCEMU image
    pub fn image_mut(&mut self) -> &mut CpcImage {
        &mut self.image
    }

    /// Flush pending writes to the backing store
    pub fn flush(&mut self) -> Result<()> {
        self.image.flush()
    }

    // ---- directory access ----------------------------------------------

    /// Read every directory entry in table order
    fn read_directory(&mut self) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::with_capacity(self.dpb.dir_entries());

        for sector in 0..self.layout.dir_sectors {
            let buf = self.image.read_logical_sector(self.layout.base_track, sector)?;
            for slot in 0..self.layout.entries_per_sector {
                entries.push(DirEntry::parse(&buf[slot * DIR_ENTRY_SIZE..]));
            }
        }

        Ok(entries)
    }

    /// Write one directory entry back to its slot
    fn write_entry(&mut self, index: usize, entry: &DirEntry) -> Result<()> {
        let sector = index * DIR_ENTRY_SIZE / SECTOR_SIZE;
        let offset = index * DIR_ENTRY_SIZE % SECTOR_SIZE;

        let mut buf = self.image.read_logical_sector(self.layout.base_track, sector)?;
        buf[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        self.image
            .write_logical_sector(self.layout.base_track, sector, &buf)
    }

    /// Find the entry for `name` with the given extent number
    fn find_entry(&mut self, name: &str, extent: u8) -> Result<Option<DirEntry>> {
        Ok(self
            .read_directory()?
            .into_iter()
            .find(|e| !e.is_unused() && e.ex == extent && e.matches(name)))
    }

    /// Index of the first free directory slot
    fn find_free_slot(&mut self) -> Result<Option<usize>> {
        Ok(self.read_directory()?.iter().position(DirEntry::is_unused))
    }

    /// The full extent chain for a file, extent 0 first
    fn extent_chain(&mut self, name: &str) -> Result<Vec<DirEntry>> {
        let first = self
            .find_entry(name, 0)?
            .ok_or_else(|| DskError::NotFound(name.to_string()))?;

        let mut chain = vec![first];
        for extent in 1u8.. {
            match self.find_entry(name, extent)? {
                Some(entry) => chain.push(entry),
                None => break,
            }
        }

        Ok(chain)
    }

    // ---- block math -----------------------------------------------------

    /// Starting `(track, sector)` of an allocation block
    fn block_to_track_sector(&self, block: usize) -> (usize, usize) {
        let sector_offset = block * self.layout.block_size / SECTOR_SIZE;
        (
            self.layout.base_track + sector_offset / SECTORS_PER_TRACK,
            sector_offset % SECTORS_PER_TRACK,
        )
    }

    /// `(track, sector)` advanced by a sector count, wrapping across tracks
    fn advance(&self, track: usize, sector: usize, offset: usize) -> (usize, usize) {
        (
            track + (sector + offset) / SECTORS_PER_TRACK,
            (sector + offset) % SECTORS_PER_TRACK,
        )
    }

    // ---- allocation -----------------------------------------------------

    /// Build the allocation bitmap from the live directory.
    ///
    /// Directory blocks are marked reserved; every non-zero block reference
    /// of every live entry is marked used.
    fn seed_bitmap(&mut self) -> Result<AllocBitmap> {
        let mut bitmap = AllocBitmap::new(self.layout.total_blocks);

        for block in 0..self.layout.first_data_block {
            bitmap.mark(block);
        }

        for entry in self.read_directory()? {
            if entry.is_unused() {
                continue;
            }
            for &block in entry.al.iter().filter(|&&b| b != 0) {
                bitmap.mark(block as usize);
            }
        }

        Ok(bitmap)
    }

    /// Free space in kilobytes, from a fresh directory scan
    pub fn free_kb(&mut self) -> Result<usize> {
        let bitmap = self.seed_bitmap()?;
        Ok(bitmap.free_count(self.layout.first_data_block) * self.layout.block_size / 1024)
    }

    // ---- operations -----------------------------------------------------

    /// List the files on the disk in directory order
    pub fn list(&mut self) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();

        for entry in self.read_directory()? {
            if entry.is_unused() || entry.al[0] == 0 || entry.ex != 0 {
                continue;
            }

            let name = entry.normalised_name();
            let mut total_records = entry.rc as usize;
            for extent in 1u8.. {
                match self.find_entry(&name, extent)? {
                    Some(next) => total_records += next.rc as usize,
                    None => break,
                }
            }

            files.push(FileEntry {
                name,
                size_kb: (total_records * RECORD_SIZE).div_ceil(1024),
                read_only: entry.is_read_only(),
                system: entry.is_system(),
            });
        }

        Ok(files)
    }

    /// Collect the metadata `info` reports for a file
    pub fn file_info(&mut self, name: &str) -> Result<FileInfo> {
        let chain = self.extent_chain(name)?;
        let base_id = self.variant.base_sector_id();
        let mut extents = Vec::with_capacity(chain.len());

        for entry in chain {
            let blocks: Vec<u8> = entry.al.iter().copied().take_while(|&b| b != 0).collect();
            let mut sectors = Vec::new();

            for (k, &block) in blocks.iter().enumerate() {
                let (track, sector) = self.block_to_track_sector(block as usize);
                sectors.push((track as u8, base_id + sector as u8));

                let spans_two = if k + 1 < blocks.len() {
                    true
                } else {
                    // Records landing in the chain's last block
                    let full_blocks = blocks.len().saturating_sub(1);
                    let records_in_last = (entry.rc as usize)
                        .saturating_sub(full_blocks * self.layout.records_per_block);
                    records_in_last > self.layout.records_per_sector
                };

                if spans_two {
                    let (track, sector) = self.advance(track, sector, 1);
                    sectors.push((track as u8, base_id + sector as u8));
                }
            }

            extents.push(ExtentInfo { entry, sectors });
        }

        let track_runs = coalesce_track_runs(extents.iter().flat_map(|x| x.sectors.iter().copied()));

        // Decode the AMSDOS header from the file's first record
        let header = match extents.first().and_then(|x| x.sectors.first()) {
            Some(&(track, sector_id)) => {
                let buf = self
                    .image
                    .read_logical_sector(track as usize, (sector_id - base_id) as usize)?;
                AmsdosHeader::parse(&buf[..RECORD_SIZE])
            }
            None => None,
        };

        Ok(FileInfo {
            extents,
            track_runs,
            header,
        })
    }

    /// Read just the AMSDOS header of a file, if it carries one
    pub fn file_header(&mut self, name: &str) -> Result<Option<AmsdosHeader>> {
        Ok(self.file_info(name)?.header)
    }

    /// Walk one extent and collect its records in file order
    fn extent_records(&mut self, entry: &DirEntry) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();

        'blocks: for &block in &entry.al {
            if block == 0 {
                break;
            }

            let (track, sector) = self.block_to_track_sector(block as usize);

            for s in 0..self.layout.sectors_per_block {
                let (cur_track, cur_sector) = self.advance(track, sector, s);
                let buf = self.image.read_logical_sector(cur_track, cur_sector)?;

                for r in 0..self.layout.records_per_sector {
                    if records.len() >= entry.rc as usize {
                        break 'blocks;
                    }

                    let mut data = [0u8; RECORD_SIZE];
                    data.copy_from_slice(&buf[r * RECORD_SIZE..(r + 1) * RECORD_SIZE]);

                    records.push(FileRecord {
                        track: cur_track,
                        sector: cur_sector,
                        offset: block as usize * self.layout.block_size
                            + s * SECTOR_SIZE
                            + r * RECORD_SIZE,
                        data,
                    });
                }
            }
        }

        Ok(records)
    }

    /// Extract a file's contents.
    ///
    /// A valid AMSDOS header in the first record of extent 0 is stripped and
    /// its 24-bit length trims the record padding off the tail, so headered
    /// files come back byte-exact. In text mode a `0x1A` byte ends the file.
    pub fn read_file(&mut self, name: &str, text: bool) -> Result<Vec<u8>> {
        let chain = self.extent_chain(name)?;
        let mut out = Vec::new();
        let mut stripped: Option<AmsdosHeader> = None;

        for entry in &chain {
            let records = self.extent_records(entry)?;

            for (i, record) in records.iter().enumerate() {
                if entry.ex == 0 && i == 0 && amsdos::has_valid_header(&record.data) {
                    stripped = AmsdosHeader::parse(&record.data);
                    continue;
                }

                if text {
                    if let Some(eof) = record.data.iter().position(|&b| b == TEXT_EOF) {
                        out.extend_from_slice(&record.data[..eof]);
                        return Ok(out);
                    }
                }

                out.extend_from_slice(&record.data);
            }
        }

        if let Some(header) = stripped {
            let length = header.file_length as usize;
            if length > 0 && length < out.len() {
                out.truncate(length);
            }
        }

        Ok(out)
    }

    /// Collect a file's records grouped by sector, for hex dumping.
    ///
    /// Unlike `read_file` this keeps the AMSDOS header in place.
    pub fn dump_file(&mut self, name: &str) -> Result<Vec<SectorChunk>> {
        let chain = self.extent_chain(name)?;
        let mut chunks: Vec<SectorChunk> = Vec::new();

        for entry in &chain {
            for record in self.extent_records(entry)? {
                match chunks.last_mut() {
                    Some(chunk)
                        if chunk.track == record.track
                            && chunk.sector == record.sector
                            && chunk.offset + chunk.data.len() == record.offset =>
                    {
                        chunk.data.extend_from_slice(&record.data);
                    }
                    _ => chunks.push(SectorChunk {
                        track: record.track,
                        sector: record.sector,
                        offset: record.offset,
                        data: record.data.to_vec(),
                    }),
                }
            }
        }

        Ok(chunks)
    }

    /// Insert a host file, overwriting any existing file of the same name.
    ///
    /// With `with_header` an AMSDOS header built from `entry_addr` and
    /// `exec_addr` occupies the file's first record. Sector writes for an
    /// extent always land before its directory entry.
    pub fn insert(
        &mut self,
        name: &str,
        data: &[u8],
        entry_addr: u16,
        exec_addr: u16,
        with_header: bool,
    ) -> Result<()> {
        let (name_field, ext_field) = denormalise(name)?;

        let header = if with_header {
            Some(AmsdosHeader::build(
                name_field,
                ext_field,
                data.len() as u32,
                entry_addr,
                exec_addr,
            ))
        } else {
            None
        };

        let mut bitmap = self.seed_bitmap()?;
        self.delete(name)?;

        let mut cursor = 0usize;
        let mut header_pending = header;
        let mut extent = 0u8;

        loop {
            let slot = self.find_free_slot()?.ok_or(DskError::DirectoryFull)?;

            let mut entry = DirEntry::empty();
            entry.file_name = name_field;
            entry.ext = ext_field;
            entry.ex = extent;

            for al_index in 0..entry.al.len() {
                let block = bitmap.allocate(self.layout.first_data_block)?;
                entry.al[al_index] = block as u8;

                let (track, sector) = self.block_to_track_sector(block);

                for s in 0..self.layout.sectors_per_block {
                    let mut buf = [NO_FILE; SECTOR_SIZE];
                    let (cur_track, cur_sector) = self.advance(track, sector, s);

                    for r in 0..self.layout.records_per_sector {
                        let slice = &mut buf[r * RECORD_SIZE..(r + 1) * RECORD_SIZE];

                        if let Some(h) = header_pending.take() {
                            slice.copy_from_slice(&h.to_bytes());
                            entry.rc += 1;
                            continue;
                        }

                        // Short final records keep the 0xE5 sector filler
                        let take = (data.len() - cursor).min(RECORD_SIZE);
                        slice[..take].copy_from_slice(&data[cursor..cursor + take]);
                        cursor += take;
                        entry.rc += 1;

                        if cursor >= data.len() {
                            self.image.write_logical_sector(cur_track, cur_sector, &buf)?;
                            self.write_entry(slot, &entry)?;
                            debug!("inserted {} ({} bytes, {} extents)", name, data.len(), extent + 1);
                            return Ok(());
                        }
                    }

                    self.image.write_logical_sector(cur_track, cur_sector, &buf)?;
                }
            }

            self.write_entry(slot, &entry)?;
            extent = extent.wrapping_add(1);
        }
    }

    /// Delete every directory entry matching `name`.
    ///
    /// Data blocks are not cleared; the next insert's bitmap rebuild
    /// reclaims them. Returns whether anything was deleted.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let mut deleted = false;

        for sector in 0..self.layout.dir_sectors {
            let mut buf = self.image.read_logical_sector(self.layout.base_track, sector)?;
            let mut dirty = false;

            for slot in 0..self.layout.entries_per_sector {
                let offset = slot * DIR_ENTRY_SIZE;
                let mut entry = DirEntry::parse(&buf[offset..]);

                if entry.is_unused() || !entry.matches(name) {
                    continue;
                }

                entry.user_number = NO_FILE;
                buf[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
                dirty = true;
                deleted = true;
            }

            if dirty {
                self.image
                    .write_logical_sector(self.layout.base_track, sector, &buf)?;
            }
        }

        if deleted {
            debug!("deleted {}", name);
        }

        Ok(deleted)
    }
}

/// Coalesce `(track, sector_id)` pairs into `(track, min, max)` runs,
/// tracks in first-seen order
fn coalesce_track_runs<I: Iterator<Item = (u8, u8)>>(pairs: I) -> Vec<(u8, u8, u8)> {
    let mut runs: Vec<(u8, u8, u8)> = Vec::new();

    for (track, sector_id) in pairs {
        match runs.iter_mut().find(|run| run.0 == track) {
            Some(run) => {
                run.1 = run.1.min(sector_id);
                run.2 = run.2.max(sector_id);
            }
            None => runs.push((track, sector_id, sector_id)),
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fresh_fs(dir: &TempDir) -> CpmFs {
        CpmFs::create(dir.path().join("test.dsk")).unwrap()
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 13) as u8).collect()
    }

    #[test]
    fn test_fresh_disk_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        assert!(fs.list().unwrap().is_empty());
        assert_eq!(fs.variant(), DiskVariant::Data);
    }

    #[test]
    fn test_insert_and_list() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        fs.insert("hello.bin", &payload(4000), 0, 0, false).unwrap();

        let files = fs.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "HELLO.BIN");
        // 4000 bytes = 32 records of 128 = 4096 bytes = 4K rounded up
        assert_eq!(files[0].size_kb, 4);
    }

    #[test]
    fn test_insert_extract_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);
        let data = payload(17000);

        fs.insert("test.bin", &data, 0, 0, false).unwrap();
        let out = fs.read_file("TEST.BIN", false).unwrap();

        assert_eq!(out.len() % RECORD_SIZE, 0);
        assert_eq!(&out[..data.len()], &data[..]);
        assert!(out[data.len()..].iter().all(|&b| b == NO_FILE));
    }

    #[test]
    fn test_insert_with_header_strips_on_extract() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);
        let data = payload(1000);

        fs.insert("test.bin", &data, 0x8000, 0x8000, true).unwrap();

        let header = fs.file_header("TEST.BIN").unwrap().unwrap();
        assert_eq!(header.data_location, 0x8000);
        assert_eq!(header.file_length, 1000);

        // Header stripped and length-trimmed: byte-exact round trip
        let out = fs.read_file("TEST.BIN", false).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_text_mode_stops_at_sub() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        let mut data = b"HELLO WORLD".to_vec();
        data.push(TEXT_EOF);
        data.extend_from_slice(&[0x41; 300]);

        fs.insert("note.txt", &data, 0, 0, false).unwrap();
        let out = fs.read_file("NOTE.TXT", true).unwrap();
        assert_eq!(out, b"HELLO WORLD");
    }

    #[test]
    fn test_extent_chain_rc_values() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        // 17000 bytes = 133 records: one full extent (0x80) plus 5 records
        fs.insert("big.bin", &payload(17000), 0, 0, false).unwrap();

        let chain = fs.extent_chain("BIG.BIN").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].ex, 0);
        assert_eq!(chain[0].rc, 0x80);
        assert_eq!(chain[1].ex, 1);
        assert_eq!(chain[1].rc, 5);
    }

    #[test]
    fn test_allocation_disjoint_across_files() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        for i in 0..5 {
            fs.insert(&format!("file{}.bin", i), &payload(3000), 0, 0, false)
                .unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        for entry in fs.read_directory().unwrap() {
            if entry.is_unused() {
                continue;
            }
            for &block in entry.al.iter().filter(|&&b| b != 0) {
                assert!(seen.insert(block), "block {} referenced twice", block);
            }
        }
    }

    #[test]
    fn test_delete_and_reuse() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        fs.insert("a.bin", &payload(2000), 0, 0, false).unwrap();
        let first_blocks: Vec<u8> = fs.extent_chain("A.BIN").unwrap()[0]
            .al
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect();

        assert!(fs.delete("A.BIN").unwrap());
        assert!(!fs.delete("A.BIN").unwrap());
        assert!(fs.list().unwrap().is_empty());

        fs.insert("b.bin", &payload(2000), 0, 0, false).unwrap();
        let second_blocks: Vec<u8> = fs.extent_chain("B.BIN").unwrap()[0]
            .al
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect();

        assert_eq!(first_blocks, second_blocks);
    }

    #[test]
    fn test_overwrite_same_name() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        fs.insert("x.bin", &payload(5000), 0, 0, false).unwrap();
        fs.insert("x.bin", &payload(300), 0, 0, false).unwrap();

        let files = fs.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size_kb, 1);

        let out = fs.read_file("X.BIN", false).unwrap();
        assert_eq!(&out[..300], &payload(300)[..]);
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        assert!(matches!(
            fs.read_file("NOPE.BIN", false),
            Err(DskError::NotFound(_))
        ));
    }

    #[test]
    fn test_disk_full() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);
        let data = payload(16 * 1024);

        let mut inserted = 0;
        let result = loop {
            match fs.insert(&format!("f{}.bin", inserted), &data, 0, 0, false) {
                Ok(()) => inserted += 1,
                Err(e) => break e,
            }
        };

        assert!(matches!(result, DskError::DiskFull));
        // 178 data blocks, 16 blocks per file
        assert_eq!(inserted, 11);
        assert_eq!(fs.list().unwrap().len(), inserted);
    }

    #[test]
    fn test_file_info_sectors() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        // 300 bytes = 3 records, one block, fits a single sector
        fs.insert("tiny.bin", &payload(300), 0, 0, false).unwrap();

        let info = fs.file_info("TINY.BIN").unwrap();
        assert_eq!(info.extents.len(), 1);
        assert_eq!(info.extents[0].sectors.len(), 1);
        assert_eq!(info.track_runs.len(), 1);
        assert!(info.header.is_none());

        // 700 bytes = 6 records, one block spanning both its sectors
        fs.insert("two.bin", &payload(700), 0, 0, false).unwrap();
        let info = fs.file_info("TWO.BIN").unwrap();
        assert_eq!(info.extents[0].sectors.len(), 2);
    }

    #[test]
    fn test_track_run_coalescing() {
        let runs = coalesce_track_runs(
            [(0u8, 0xC3u8), (0, 0xC4), (1, 0xC1), (0, 0xC5), (1, 0xC2)]
                .iter()
                .copied(),
        );
        assert_eq!(runs, vec![(0, 0xC3, 0xC5), (1, 0xC1, 0xC2)]);
    }

    #[test]
    fn test_insert_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        fs.insert("empty.bin", &[], 0, 0, false).unwrap();
        let chain = fs.extent_chain("EMPTY.BIN").unwrap();
        assert_eq!(chain[0].rc, 1);

        fs.insert("empty2.bin", &[], 0, 0, true).unwrap();
        let chain = fs.extent_chain("EMPTY2.BIN").unwrap();
        assert_eq!(chain[0].rc, 2);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let dir = TempDir::new().unwrap();
        let mut fs = fresh_fs(&dir);

        assert!(matches!(
            fs.insert("noextension", &payload(10), 0, 0, false),
            Err(DskError::InvalidName(_))
        ));
    }
}
