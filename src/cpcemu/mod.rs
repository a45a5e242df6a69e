/// CPCEMU disk image envelope

/// Packed record layouts and geometry constants
pub mod records;
/// Sector skew (interleave) handling
pub mod skew;

pub use records::{DiskInfo, SectorInfo, TrackInfo};
pub use skew::SkewTable;

use crate::error::{DskError, Result};
use crate::io::ImageFile;
use log::debug;
use records::*;
use std::path::Path;

/// Disk variant, resolved from the first sector id on track 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskVariant {
    /// System (vendor) format, sector ids 0x41.., two reserved tracks
    System,
    /// Data format, sector ids 0xC1.., no reserved tracks
    Data,
}

impl DiskVariant {
    /// First sector id byte for this variant
    pub fn base_sector_id(&self) -> u8 {
        match self {
            DiskVariant::System => SYSTEM_SECTOR_BASE,
            DiskVariant::Data => DATA_SECTOR_BASE,
        }
    }
}

impl std::fmt::Display for DiskVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskVariant::System => write!(f, "system"),
            DiskVariant::Data => write!(f, "data"),
        }
    }
}

/// A CPCEMU `.dsk` image opened over a backing file.
///
/// Exposes the envelope: the disk info record, per-track info records, and
/// logical sector access through the skew table. The CP/M layer above never
/// touches byte offsets directly.
#[derive(Debug)]
pub struct CpcImage {
    file: ImageFile,
    info: DiskInfo,
    skew: SkewTable,
}

impl CpcImage {
    /// Open an existing image, read its disk info record, and check that
    /// the backing file covers the declared geometry
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = ImageFile::open(path)?;
        let mut buf = [0u8; DISK_INFO_SIZE];
        file.read_at(0, &mut buf)?;
        let info = DiskInfo::parse(&buf)?;

        // Extended images have per-track sizes; only the uniform layout
        // can be checked up front
        if !info.is_extended() {
            let tracks = info.num_tracks as u64 * info.num_heads.max(1) as u64;
            let expected = DISK_INFO_SIZE as u64 + tracks * info.track_size as u64;
            let actual = file.len()?;
            if actual < expected {
                return Err(DskError::invalid_image(format!(
                    "image is {} bytes, declared geometry needs {}",
                    actual, expected
                )));
            }
        }

        debug!(
            "opened image: {} tracks, {} head(s), extended={}",
            info.num_tracks,
            info.num_heads,
            info.is_extended()
        );

        Ok(Self {
            file,
            info,
            skew: SkewTable::canonical(),
        })
    }

    /// Create a freshly formatted data-format image.
    ///
    /// Writes the disk info record and, for every track, a track info record
    /// carrying the canonical interleave followed by nine sectors of filler.
    pub fn format<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = ImageFile::create(path)?;

        let info = DiskInfo::new(NUM_TRACKS as u8, 1, TRACK_SIZE as u16);
        file.write_at(0, &info.to_bytes())?;

        let filler = [FILLER_BYTE; SECTOR_SIZE];
        for track in 0..NUM_TRACKS {
            let track_info = TrackInfo::new(track as u8, 0, &skew::DEFAULT_SKEW);
            file.write_at(track_offset(track), &track_info.to_bytes())?;

            for physical in 0..SECTORS_PER_TRACK {
                file.write_at(sector_offset(track, physical), &filler)?;
            }
        }

        debug!("formatted {} tracks of {} sectors", NUM_TRACKS, SECTORS_PER_TRACK);

        Ok(Self {
            file,
            info,
            skew: SkewTable::canonical(),
        })
    }

    /// The disk info record
    pub fn info(&self) -> &DiskInfo {
        &self.info
    }

    /// True for the extended CPCEMU variant
    pub fn is_extended(&self) -> bool {
        self.info.is_extended()
    }

    /// Read the track info record for a track
    pub fn read_track_info(&mut self, track: usize) -> Result<TrackInfo> {
        let mut buf = [0u8; TRACK_INFO_SIZE];
        self.file.read_at(track_offset(track), &mut buf)?;
        TrackInfo::parse(&buf)
    }

    /// Resolve the disk variant from track 0's first sector id
    pub fn variant(&mut self) -> Result<DiskVariant> {
        let track_info = self.read_track_info(0)?;
        match track_info.sector_info[0].sector_id {
            SYSTEM_SECTOR_BASE => Ok(DiskVariant::System),
            DATA_SECTOR_BASE => Ok(DiskVariant::Data),
            id => Err(DskError::invalid_image(format!(
                "unknown disk variant, first sector id 0x{:02X}",
                id
            ))),
        }
    }

    /// Rebuild the skew table from track 0's sector info
    pub fn rebuild_skew(&mut self) -> Result<()> {
        let variant = self.variant()?;
        let track_info = self.read_track_info(0)?;
        self.skew = SkewTable::from_sector_info(
            &track_info.sector_info[..SECTORS_PER_TRACK],
            variant.base_sector_id(),
        )?;
        debug!("skew table rebuilt: {:?}", self.skew.as_slice());
        Ok(())
    }

    /// The current skew table
    pub fn skew(&self) -> &SkewTable {
        &self.skew
    }

    /// Read one logical sector (512 bytes)
    pub fn read_logical_sector(
        &mut self,
        track: usize,
        sector: usize,
    ) -> Result<[u8; SECTOR_SIZE]> {
        let mut buf = [0u8; SECTOR_SIZE];
        let offset = sector_offset(track, self.skew.physical(sector));
        self.file.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Write one logical sector (512 bytes)
    pub fn write_logical_sector(
        &mut self,
        track: usize,
        sector: usize,
        data: &[u8; SECTOR_SIZE],
    ) -> Result<()> {
        let offset = sector_offset(track, self.skew.physical(sector));
        self.file.write_at(offset, data)
    }

    /// Flush pending writes to the backing store
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()
    }
}

/// Absolute offset of a track's info record
fn track_offset(track: usize) -> u64 {
    (DISK_INFO_SIZE + track * TRACK_SIZE) as u64
}

/// Absolute offset of a physical sector's data within a track
fn sector_offset(track: usize, physical: usize) -> u64 {
    track_offset(track) + (TRACK_INFO_SIZE + physical * SECTOR_SIZE) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_produces_full_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.dsk");

        let image = CpcImage::format(&path).unwrap();
        assert!(!image.is_extended());

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 194816);
    }

    #[test]
    fn test_format_then_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.dsk");

        CpcImage::format(&path).unwrap();

        let mut image = CpcImage::open(&path).unwrap();
        assert_eq!(image.info().num_tracks, 40);
        assert_eq!(image.info().num_heads, 1);
        assert_eq!(image.variant().unwrap(), DiskVariant::Data);

        // Rebuilding from the formatted ids reproduces the canonical table
        image.rebuild_skew().unwrap();
        assert_eq!(image.skew(), &SkewTable::canonical());
    }

    #[test]
    fn test_logical_sector_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rw.dsk");

        let mut image = CpcImage::format(&path).unwrap();

        let mut data = [0u8; SECTOR_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        image.write_logical_sector(5, 3, &data).unwrap();
        let read = image.read_logical_sector(5, 3).unwrap();
        assert_eq!(read, data);

        // A different logical sector is untouched filler
        let other = image.read_logical_sector(5, 4).unwrap();
        assert!(other.iter().all(|&b| b == FILLER_BYTE));
    }

    #[test]
    fn test_logical_sector_lands_at_skewed_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skewed.dsk");

        let mut image = CpcImage::format(&path).unwrap();
        let data = [0xAA; SECTOR_SIZE];
        // Physical slot 2 carries id 0xC2, so logical 1 lands there
        image.write_logical_sector(0, 1, &data).unwrap();
        drop(image);

        let raw = std::fs::read(&path).unwrap();
        let offset = 256 + 256 + 2 * SECTOR_SIZE;
        assert!(raw[offset..offset + SECTOR_SIZE].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_open_rejects_truncated_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.dsk");

        CpcImage::format(&path).unwrap();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(100_000).unwrap();

        assert!(matches!(
            CpcImage::open(&path),
            Err(DskError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.dsk");
        std::fs::write(&path, vec![0x55u8; 1024]).unwrap();

        assert!(CpcImage::open(&path).is_err());
    }
}
