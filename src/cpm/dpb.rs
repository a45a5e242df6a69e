/// Disk Parameter Block profiles and derived geometry

use crate::cpcemu::records::{NUM_TRACKS, SECTORS_PER_TRACK, SECTOR_SIZE};
use crate::cpcemu::DiskVariant;
use crate::error::{DskError, Result};
use log::debug;

/// CP/M record length, the smallest addressable unit of file data
pub const RECORD_SIZE: usize = 128;

/// Directory entry length on disk
pub const DIR_ENTRY_SIZE: usize = 32;

/// Allocation blocks the fixed CPC geometry can hold, the bitmap capacity
pub const MAX_BLOCKS: usize = NUM_TRACKS * SECTORS_PER_TRACK * SECTOR_SIZE / 1024;

/// Disk Parameter Block.
///
/// CP/M keeps no DPB on the disk itself; the BIOS supplies one per format.
/// The full descriptor also carries records-per-track, block and extent
/// masks, the directory allocation bitmap and checksum vector sizes; only
/// the fields this tool reads are kept here. The two CPC profiles below
/// are the ones AMSDOS generates, selected by the detected disk variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskParameterBlock {
    /// Block shift factor; block bytes = 128 << bsh
    pub bsh: u8,
    /// Number of blocks on the disk minus 1
    pub dsm: u16,
    /// Number of directory entries minus 1
    pub drm: u16,
    /// Reserved tracks at the start of the disk
    pub off: u16,
}

/// AMSDOS system (vendor) format: two reserved tracks
pub const DPB_CPC_SYSTEM: DiskParameterBlock = DiskParameterBlock {
    bsh: 3,
    dsm: 0xAA,
    drm: 0x3F,
    off: 2,
};

/// AMSDOS data format: no reserved tracks
pub const DPB_CPC_DATA: DiskParameterBlock = DiskParameterBlock {
    bsh: 3,
    dsm: 0xB3,
    drm: 0x3F,
    off: 0,
};

impl DiskParameterBlock {
    /// Select the profile matching a detected disk variant
    pub fn for_variant(variant: DiskVariant) -> Self {
        match variant {
            DiskVariant::System => DPB_CPC_SYSTEM,
            DiskVariant::Data => DPB_CPC_DATA,
        }
    }

    /// Block size in bytes
    pub fn block_size(&self) -> usize {
        RECORD_SIZE << self.bsh
    }

    /// Number of directory entries
    pub fn dir_entries(&self) -> usize {
        self.drm as usize + 1
    }
}

/// Sizes derived from the DPB, computed once at init
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// Allocation block size in bytes
    pub block_size: usize,
    /// 512-byte sectors per block
    pub sectors_per_block: usize,
    /// 128-byte records per sector
    pub records_per_sector: usize,
    /// 128-byte records per block
    pub records_per_block: usize,
    /// Logical sectors occupied by the directory table
    pub dir_sectors: usize,
    /// Directory entries per sector
    pub entries_per_sector: usize,
    /// First track of the data area (after reserved tracks)
    pub base_track: usize,
    /// First allocation block past the directory
    pub first_data_block: usize,
    /// Number of allocation blocks on the disk
    pub total_blocks: usize,
}

impl Layout {
    /// Derive the working sizes from a DPB.
    ///
    /// Rejects parameter blocks describing more blocks than the fixed CPC
    /// geometry can address; the allocation table capacity is a hard limit.
    pub fn from_dpb(dpb: &DiskParameterBlock) -> Result<Self> {
        let block_size = dpb.block_size();
        let dir_bytes = dpb.dir_entries() * DIR_ENTRY_SIZE;
        let total_blocks = dpb.dsm as usize + 1;

        if total_blocks > MAX_BLOCKS {
            return Err(DskError::invalid_image(format!(
                "DPB describes {} blocks, limit is {}",
                total_blocks, MAX_BLOCKS
            )));
        }

        let layout = Self {
            block_size,
            sectors_per_block: block_size / SECTOR_SIZE,
            records_per_sector: SECTOR_SIZE / RECORD_SIZE,
            records_per_block: block_size / RECORD_SIZE,
            dir_sectors: dir_bytes / SECTOR_SIZE,
            entries_per_sector: SECTOR_SIZE / DIR_ENTRY_SIZE,
            base_track: dpb.off as usize,
            first_data_block: dir_bytes / block_size,
            total_blocks,
        };

        debug!(
            "layout: block={}B, dir={} sectors, base track {}, first data block {}",
            layout.block_size, layout.dir_sectors, layout.base_track, layout.first_data_block
        );

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_profile_layout() {
        let layout = Layout::from_dpb(&DPB_CPC_DATA).unwrap();

        assert_eq!(layout.block_size, 1024);
        assert_eq!(layout.sectors_per_block, 2);
        assert_eq!(layout.records_per_sector, 4);
        assert_eq!(layout.records_per_block, 8);
        assert_eq!(layout.dir_sectors, 4);
        assert_eq!(layout.entries_per_sector, 16);
        assert_eq!(layout.base_track, 0);
        assert_eq!(layout.first_data_block, 2);
        assert_eq!(layout.total_blocks, 180);
    }

    #[test]
    fn test_system_profile_layout() {
        let layout = Layout::from_dpb(&DPB_CPC_SYSTEM).unwrap();

        assert_eq!(layout.base_track, 2);
        assert_eq!(layout.total_blocks, 171);
        assert_eq!(layout.first_data_block, 2);
    }

    #[test]
    fn test_oversized_dpb_rejected() {
        let mut dpb = DPB_CPC_DATA;
        dpb.dsm = MAX_BLOCKS as u16; // one block past the table capacity
        assert!(Layout::from_dpb(&dpb).is_err());
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(DiskParameterBlock::for_variant(DiskVariant::System).off, 2);
        assert_eq!(DiskParameterBlock::for_variant(DiskVariant::Data).off, 0);
    }
}
