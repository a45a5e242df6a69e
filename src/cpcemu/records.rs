/// CPCEMU record layouts and geometry constants

use crate::error::{DskError, Result};

/// Standard DSK format signature
pub const STANDARD_SIGNATURE: &[u8] = b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n";

/// Extended DSK format signature
pub const EXTENDED_SIGNATURE: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";

/// Track-Info block marker
pub const TRACK_INFO_MARKER: &[u8] = b"Track-Info\r\n";

/// Creator signature written into fresh images
pub const CREATOR_SIGNATURE: &[u8] = b"cpcdsk 0.1";

/// Size of the disk info record
pub const DISK_INFO_SIZE: usize = 256;

/// Size of the track info record
pub const TRACK_INFO_SIZE: usize = 256;

/// Size of one sector info entry
pub const SECTOR_INFO_SIZE: usize = 8;

/// Number of entries in the sector info table
pub const SECTOR_INFO_ENTRIES: usize = 29;

/// Tracks on a single-sided CPC disk
pub const NUM_TRACKS: usize = 40;

/// Sectors per track
pub const SECTORS_PER_TRACK: usize = 9;

/// Sector size in bytes (size code 2)
pub const SECTOR_SIZE: usize = 512;

/// FDC size code for 512-byte sectors
pub const SECTOR_SIZE_CODE: u8 = 2;

/// Total track length: info record plus nine sectors
pub const TRACK_SIZE: usize = TRACK_INFO_SIZE + SECTORS_PER_TRACK * SECTOR_SIZE;

/// First sector id on a system disk
pub const SYSTEM_SECTOR_BASE: u8 = 0x41;

/// First sector id on a data disk
pub const DATA_SECTOR_BASE: u8 = 0xC1;

/// CP/M filler byte used when formatting
pub const FILLER_BYTE: u8 = 0xE5;

/// GAP#3 length used when formatting
pub const GAP3_LENGTH: u8 = 0x4E;

const CREATOR_OFFSET: usize = 34;
const TRACK_COUNT_OFFSET: usize = 48;
const HEAD_COUNT_OFFSET: usize = 49;
const TRACK_SIZE_OFFSET: usize = 50;
const TRACK_SIZE_TABLE_OFFSET: usize = 52;
const TRACK_SIZE_TABLE_LEN: usize = 80;

const TRACK_NUM_OFFSET: usize = 16;
const HEAD_NUM_OFFSET: usize = 17;
const SECTOR_SIZE_CODE_OFFSET: usize = 20;
const NUM_SECTORS_OFFSET: usize = 21;
const GAP3_OFFSET: usize = 22;
const FILLER_OFFSET: usize = 23;
const SECTOR_TABLE_OFFSET: usize = 24;

/// Disk info record at offset 0 of the image (256 bytes)
#[derive(Debug, Clone)]
pub struct DiskInfo {
    /// Signature, `MV - CPCEMU ...` or `EXTENDED ...`
    pub header: [u8; 34],
    /// Creator tag
    pub creator: [u8; 14],
    /// Number of tracks per side
    pub num_tracks: u8,
    /// Number of heads (sides)
    pub num_heads: u8,
    /// Track length in bytes, standard format only
    pub track_size: u16,
    /// High bytes of per-track lengths, extended format only
    pub track_size_table: [u8; TRACK_SIZE_TABLE_LEN],
}

impl DiskInfo {
    /// Build the disk info record for a fresh standard image
    pub fn new(num_tracks: u8, num_heads: u8, track_size: u16) -> Self {
        let mut header = [0u8; 34];
        header.copy_from_slice(STANDARD_SIGNATURE);

        let mut creator = [0u8; 14];
        creator[..CREATOR_SIGNATURE.len()].copy_from_slice(CREATOR_SIGNATURE);

        Self {
            header,
            creator,
            num_tracks,
            num_heads,
            track_size,
            track_size_table: [(track_size >> 8) as u8; TRACK_SIZE_TABLE_LEN],
        }
    }

    /// Parse the record, validating the signature
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < DISK_INFO_SIZE {
            return Err(DskError::invalid_image("disk info record truncated"));
        }

        if !data.starts_with(b"MV - CPC") && !data.starts_with(b"EXTENDED") {
            return Err(DskError::invalid_image("unrecognized disk signature"));
        }

        let mut header = [0u8; 34];
        header.copy_from_slice(&data[..34]);

        let mut creator = [0u8; 14];
        creator.copy_from_slice(&data[CREATOR_OFFSET..CREATOR_OFFSET + 14]);

        let mut track_size_table = [0u8; TRACK_SIZE_TABLE_LEN];
        track_size_table.copy_from_slice(
            &data[TRACK_SIZE_TABLE_OFFSET..TRACK_SIZE_TABLE_OFFSET + TRACK_SIZE_TABLE_LEN],
        );

        Ok(Self {
            header,
            creator,
            num_tracks: data[TRACK_COUNT_OFFSET],
            num_heads: data[HEAD_COUNT_OFFSET],
            track_size: u16::from_le_bytes([
                data[TRACK_SIZE_OFFSET],
                data[TRACK_SIZE_OFFSET + 1],
            ]),
            track_size_table,
        })
    }

    /// Serialise to the 256-byte wire form
    pub fn to_bytes(&self) -> [u8; DISK_INFO_SIZE] {
        let mut data = [0u8; DISK_INFO_SIZE];
        data[..34].copy_from_slice(&self.header);
        data[CREATOR_OFFSET..CREATOR_OFFSET + 14].copy_from_slice(&self.creator);
        data[TRACK_COUNT_OFFSET] = self.num_tracks;
        data[HEAD_COUNT_OFFSET] = self.num_heads;
        data[TRACK_SIZE_OFFSET..TRACK_SIZE_OFFSET + 2]
            .copy_from_slice(&self.track_size.to_le_bytes());
        data[TRACK_SIZE_TABLE_OFFSET..TRACK_SIZE_TABLE_OFFSET + TRACK_SIZE_TABLE_LEN]
            .copy_from_slice(&self.track_size_table);
        data
    }

    /// True for the extended CPCEMU variant
    pub fn is_extended(&self) -> bool {
        self.header.starts_with(b"EXTENDED")
    }
}

/// One entry of the sector info table (8 bytes)
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorInfo {
    /// Cylinder the sector claims to live on
    pub track: u8,
    /// Head the sector claims to live on
    pub head: u8,
    /// Sector id byte (R of CHRN)
    pub sector_id: u8,
    /// FDC size code (N of CHRN)
    pub size_code: u8,
    /// FDC status register 1
    pub fdc_status1: u8,
    /// FDC status register 2
    pub fdc_status2: u8,
    /// Actual data length, extended format only
    pub data_length: u16,
}

impl SectorInfo {
    fn parse(data: &[u8]) -> Self {
        Self {
            track: data[0],
            head: data[1],
            sector_id: data[2],
            size_code: data[3],
            fdc_status1: data[4],
            fdc_status2: data[5],
            data_length: u16::from_le_bytes([data[6], data[7]]),
        }
    }

    fn write(&self, data: &mut [u8]) {
        data[0] = self.track;
        data[1] = self.head;
        data[2] = self.sector_id;
        data[3] = self.size_code;
        data[4] = self.fdc_status1;
        data[5] = self.fdc_status2;
        data[6..8].copy_from_slice(&self.data_length.to_le_bytes());
    }
}

/// Track info record preceding each track's sector data (256 bytes)
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Track number (0 to number of tracks minus 1)
    pub track_num: u8,
    /// Head number (0 or 1)
    pub head_num: u8,
    /// FDC size code shared by the track's sectors
    pub sector_size_code: u8,
    /// Sectors in this track
    pub num_sectors: u8,
    /// GAP#3 length used for formatting
    pub gap3_length: u8,
    /// Filler byte used for formatting
    pub filler_byte: u8,
    /// Sector info table, first `num_sectors` entries are live
    pub sector_info: [SectorInfo; SECTOR_INFO_ENTRIES],
}

impl TrackInfo {
    /// Build the track info record for a freshly formatted data track.
    ///
    /// `interleave[i]` is the logical index assigned to physical slot `i`;
    /// each slot's sector id becomes `DATA_SECTOR_BASE + interleave[i]`.
    pub fn new(track_num: u8, head_num: u8, interleave: &[u8; SECTORS_PER_TRACK]) -> Self {
        let mut sector_info = [SectorInfo::default(); SECTOR_INFO_ENTRIES];

        for (i, entry) in sector_info.iter_mut().take(SECTORS_PER_TRACK).enumerate() {
            *entry = SectorInfo {
                track: track_num,
                head: head_num,
                sector_id: DATA_SECTOR_BASE + interleave[i],
                size_code: SECTOR_SIZE_CODE,
                fdc_status1: 0,
                fdc_status2: 0,
                data_length: SECTOR_SIZE as u16,
            };
        }

        Self {
            track_num,
            head_num,
            sector_size_code: SECTOR_SIZE_CODE,
            num_sectors: SECTORS_PER_TRACK as u8,
            gap3_length: GAP3_LENGTH,
            filler_byte: FILLER_BYTE,
            sector_info,
        }
    }

    /// Parse the record, validating the track marker
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < TRACK_INFO_SIZE {
            return Err(DskError::invalid_image("track info record truncated"));
        }

        if !data.starts_with(b"Track-Info") {
            return Err(DskError::invalid_image("missing Track-Info marker"));
        }

        let mut sector_info = [SectorInfo::default(); SECTOR_INFO_ENTRIES];
        for (i, entry) in sector_info.iter_mut().enumerate() {
            let offset = SECTOR_TABLE_OFFSET + i * SECTOR_INFO_SIZE;
            *entry = SectorInfo::parse(&data[offset..offset + SECTOR_INFO_SIZE]);
        }

        Ok(Self {
            track_num: data[TRACK_NUM_OFFSET],
            head_num: data[HEAD_NUM_OFFSET],
            sector_size_code: data[SECTOR_SIZE_CODE_OFFSET],
            num_sectors: data[NUM_SECTORS_OFFSET],
            gap3_length: data[GAP3_OFFSET],
            filler_byte: data[FILLER_OFFSET],
            sector_info,
        })
    }

    /// Serialise to the 256-byte wire form
    pub fn to_bytes(&self) -> [u8; TRACK_INFO_SIZE] {
        let mut data = [0u8; TRACK_INFO_SIZE];
        data[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        data[TRACK_NUM_OFFSET] = self.track_num;
        data[HEAD_NUM_OFFSET] = self.head_num;
        data[SECTOR_SIZE_CODE_OFFSET] = self.sector_size_code;
        data[NUM_SECTORS_OFFSET] = self.num_sectors;
        data[GAP3_OFFSET] = self.gap3_length;
        data[FILLER_OFFSET] = self.filler_byte;

        for (i, entry) in self.sector_info.iter().enumerate() {
            let offset = SECTOR_TABLE_OFFSET + i * SECTOR_INFO_SIZE;
            entry.write(&mut data[offset..offset + SECTOR_INFO_SIZE]);
        }

        data
    }
}
