/// Sector skew (interleave) handling

use crate::cpcemu::records::{SectorInfo, SECTORS_PER_TRACK};
use crate::error::{DskError, Result};

/// Canonical CPC interleave written by the formatter: entry `i` is the
/// logical index whose sector id lands in physical slot `i` of a track
pub const DEFAULT_SKEW: [u8; SECTORS_PER_TRACK] = [0, 5, 1, 6, 2, 7, 3, 8, 4];

/// Maps a logical sector index to its physical position within the track.
///
/// The nine sectors of a CPC track are stored interleaved; their id bytes
/// carry `base + k` in skewed order. The table is derived from track 0's
/// sector info when an image is opened and must always be a permutation of
/// `0..9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkewTable {
    table: [u8; SECTORS_PER_TRACK],
}

impl SkewTable {
    /// The table matching a freshly formatted image: the inverse of the
    /// canonical interleave, since `DEFAULT_SKEW` lists physical slots
    /// while this table is indexed by logical sector
    pub fn canonical() -> Self {
        let mut table = [0u8; SECTORS_PER_TRACK];
        for (physical, &logical) in DEFAULT_SKEW.iter().enumerate() {
            table[logical as usize] = physical as u8;
        }
        Self { table }
    }

    /// Rebuild the table from track 0's sector info entries.
    ///
    /// Each entry's id minus the variant base gives the logical index the
    /// physical slot carries. Fails unless the result is a permutation.
    pub fn from_sector_info(entries: &[SectorInfo], base_id: u8) -> Result<Self> {
        let mut table = [u8::MAX; SECTORS_PER_TRACK];

        for (physical, entry) in entries.iter().take(SECTORS_PER_TRACK).enumerate() {
            let logical = entry.sector_id.wrapping_sub(base_id) as usize;
            if logical >= SECTORS_PER_TRACK {
                return Err(DskError::invalid_image(format!(
                    "sector id 0x{:02X} out of range for base 0x{:02X}",
                    entry.sector_id, base_id
                )));
            }
            table[logical] = physical as u8;
        }

        if table.iter().any(|&p| p == u8::MAX) {
            return Err(DskError::invalid_image(
                "sector skew table is not a permutation",
            ));
        }

        Ok(Self { table })
    }

    /// Physical position within the track for a logical sector index
    #[inline]
    pub fn physical(&self, logical: usize) -> usize {
        self.table[logical] as usize
    }

    /// The raw table, `table[logical] = physical`
    pub fn as_slice(&self) -> &[u8; SECTORS_PER_TRACK] {
        &self.table
    }
}
