/// Per-disk allocation block bitmap

use crate::error::{DskError, Result};
use bit_vec::BitVec;
use log::trace;

/// One bit per allocation block; set means in use.
///
/// Seeded from a full directory scan before any write, so deleted files'
/// blocks fall free automatically.
#[derive(Debug, Clone)]
pub struct AllocBitmap {
    bits: BitVec,
}

impl AllocBitmap {
    /// A bitmap with every block free
    pub fn new(total_blocks: usize) -> Self {
        Self {
            bits: BitVec::from_elem(total_blocks, false),
        }
    }

    /// Mark a block as used
    pub fn mark(&mut self, block: usize) {
        if block < self.bits.len() {
            self.bits.set(block, true);
        }
    }

    /// Whether a block is marked used
    pub fn is_used(&self, block: usize) -> bool {
        self.bits.get(block).unwrap_or(false)
    }

    /// Find, mark, and return the first free block at index `from` or above
    pub fn allocate(&mut self, from: usize) -> Result<usize> {
        for block in from..self.bits.len() {
            if !self.bits[block] {
                self.bits.set(block, true);
                trace!("allocated block {}", block);
                return Ok(block);
            }
        }
        Err(DskError::DiskFull)
    }

    /// Number of free blocks at index `from` or above
    pub fn free_count(&self, from: usize) -> usize {
        (from..self.bits.len()).filter(|&b| !self.bits[b]).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_first_fit() {
        let mut bitmap = AllocBitmap::new(8);
        bitmap.mark(2);
        bitmap.mark(3);

        assert_eq!(bitmap.allocate(2).unwrap(), 4);
        assert_eq!(bitmap.allocate(2).unwrap(), 5);
        assert!(bitmap.is_used(4));
    }

    #[test]
    fn test_allocate_respects_floor() {
        let mut bitmap = AllocBitmap::new(8);
        assert_eq!(bitmap.allocate(3).unwrap(), 3);
        assert!(!bitmap.is_used(0));
    }

    #[test]
    fn test_disk_full() {
        let mut bitmap = AllocBitmap::new(4);
        for _ in 0..2 {
            bitmap.allocate(2).unwrap();
        }
        assert!(matches!(bitmap.allocate(2), Err(DskError::DiskFull)));
    }

    #[test]
    fn test_free_count() {
        let mut bitmap = AllocBitmap::new(10);
        bitmap.mark(4);
        bitmap.mark(7);
        assert_eq!(bitmap.free_count(2), 6);
        assert_eq!(bitmap.free_count(0), 8);
    }

    #[test]
    fn test_mark_out_of_range_ignored() {
        let mut bitmap = AllocBitmap::new(4);
        bitmap.mark(100);
        assert!(!bitmap.is_used(100));
    }
}
