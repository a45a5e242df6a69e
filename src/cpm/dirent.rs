/// CP/M directory entries and 8.3 name handling

use crate::cpm::dpb::DIR_ENTRY_SIZE;
use crate::error::{DskError, Result};

/// User number marking an unused (or deleted) directory entry
pub const NO_FILE: u8 = 0xE5;

/// Host-hostile characters replaced when building extraction filenames
const FORBIDDEN_HOST_CHARS: &[u8] = b"<>:\"/\\|?*";

/// One 32-byte CP/M directory entry (an extent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// User number; `NO_FILE` means the slot is free
    pub user_number: u8,
    /// File name, space padded; bytes 0 and 1 carry attribute bits
    pub file_name: [u8; 8],
    /// Extension, space padded; bytes 0 and 1 carry attribute bits
    pub ext: [u8; 3],
    /// Extent number within the file's chain
    pub ex: u8,
    /// Reserved
    pub s1: u8,
    /// Reserved
    pub s2: u8,
    /// 128-byte records used in this extent
    pub rc: u8,
    /// Allocation block indices; 0 terminates
    pub al: [u8; 16],
}

impl DirEntry {
    /// A zeroed entry for a fresh extent
    pub fn empty() -> Self {
        Self {
            user_number: 0,
            file_name: [b' '; 8],
            ext: [b' '; 3],
            ex: 0,
            s1: 0,
            s2: 0,
            rc: 0,
            al: [0; 16],
        }
    }

    /// Parse an entry from its 32-byte on-disk form
    pub fn parse(data: &[u8]) -> Self {
        let mut file_name = [0u8; 8];
        file_name.copy_from_slice(&data[1..9]);
        let mut ext = [0u8; 3];
        ext.copy_from_slice(&data[9..12]);
        let mut al = [0u8; 16];
        al.copy_from_slice(&data[16..32]);

        Self {
            user_number: data[0],
            file_name,
            ext,
            ex: data[12],
            s1: data[13],
            s2: data[14],
            rc: data[15],
            al,
        }
    }

    /// Serialise to the 32-byte on-disk form
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut data = [0u8; DIR_ENTRY_SIZE];
        data[0] = self.user_number;
        data[1..9].copy_from_slice(&self.file_name);
        data[9..12].copy_from_slice(&self.ext);
        data[12] = self.ex;
        data[13] = self.s1;
        data[14] = self.s2;
        data[15] = self.rc;
        data[16..32].copy_from_slice(&self.al);
        data
    }

    /// Whether the slot is free
    pub fn is_unused(&self) -> bool {
        self.user_number == NO_FILE
    }

    /// Read-only attribute, high bit of the first extension byte
    pub fn is_read_only(&self) -> bool {
        self.ext[0] & 0x80 != 0
    }

    /// System attribute, high bit of the second extension byte
    pub fn is_system(&self) -> bool {
        self.ext[1] & 0x80 != 0
    }

    /// Canonical `NAME.EXT` form of the entry's name.
    ///
    /// Attribute high bits are masked off; only printable, non-space bytes
    /// survive. Characters the host filesystem rejects become `_` so the
    /// result is usable as an extraction target.
    pub fn normalised_name(&self) -> String {
        let mut name = String::with_capacity(13);

        for &b in &self.file_name {
            let c = b & 0x7F;
            if c.is_ascii_graphic() {
                name.push(if FORBIDDEN_HOST_CHARS.contains(&c) {
                    '_'
                } else {
                    c as char
                });
            }
        }

        name.push('.');

        for &b in &self.ext {
            let c = b & 0x7F;
            if c.is_ascii_graphic() {
                name.push(if FORBIDDEN_HOST_CHARS.contains(&c) {
                    '_'
                } else {
                    c as char
                });
            }
        }

        name
    }

    /// Case-insensitive match against a host-supplied name
    pub fn matches(&self, name: &str) -> bool {
        self.normalised_name().eq_ignore_ascii_case(name)
    }
}

/// Split a host `NAME.EXT` string into the space-padded, uppercased 8.3
/// fields of a directory entry.
///
/// Fails when the stem exceeds 8 characters, the extension exceeds 3, or no
/// extension is present.
pub fn denormalise(name: &str) -> Result<([u8; 8], [u8; 3])> {
    let (stem, ext) = name
        .split_once('.')
        .ok_or_else(|| DskError::invalid_name(format!("{}: no extension", name)))?;

    if stem.is_empty() || stem.len() > 8 {
        return Err(DskError::invalid_name(format!(
            "{}: stem must be 1-8 characters",
            name
        )));
    }
    if ext.len() > 3 {
        return Err(DskError::invalid_name(format!(
            "{}: extension must be at most 3 characters",
            name
        )));
    }

    let mut name_field = [b' '; 8];
    for (dest, c) in name_field.iter_mut().zip(stem.bytes()) {
        *dest = c.to_ascii_uppercase();
    }

    let mut ext_field = [b' '; 3];
    for (dest, c) in ext_field.iter_mut().zip(ext.bytes()) {
        *dest = c.to_ascii_uppercase();
    }

    Ok((name_field, ext_field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let mut data = [0u8; 32];
        data[0] = 0;
        data[1..9].copy_from_slice(b"TESTFILE");
        data[9..12].copy_from_slice(b"TXT");
        data[12] = 1;
        data[15] = 0x80;
        data[16] = 5;
        data[17] = 6;

        let entry = DirEntry::parse(&data);
        assert_eq!(entry.normalised_name(), "TESTFILE.TXT");
        assert_eq!(entry.ex, 1);
        assert_eq!(entry.rc, 0x80);
        assert_eq!(entry.al[0], 5);
        assert_eq!(entry.to_bytes(), data);
    }

    #[test]
    fn test_attribute_bits_masked_in_name() {
        let mut entry = DirEntry::empty();
        entry.file_name[..4].copy_from_slice(b"GAME");
        entry.ext = [b'B' | 0x80, b'I' | 0x80, b'N'];

        assert_eq!(entry.normalised_name(), "GAME.BIN");
        assert!(entry.is_read_only());
        assert!(entry.is_system());
    }

    #[test]
    fn test_matches_case_insensitive() {
        let mut entry = DirEntry::empty();
        entry.file_name[..4].copy_from_slice(b"GAME");
        entry.ext.copy_from_slice(b"BIN");

        assert!(entry.matches("game.bin"));
        assert!(entry.matches("GAME.BIN"));
        assert!(!entry.matches("OTHER.BIN"));
    }

    #[test]
    fn test_unused_entry() {
        let mut entry = DirEntry::empty();
        entry.user_number = NO_FILE;
        assert!(entry.is_unused());
    }

    #[test]
    fn test_denormalise() {
        let (name, ext) = denormalise("hello.bas").unwrap();
        assert_eq!(&name, b"HELLO   ");
        assert_eq!(&ext, b"BAS");
    }

    #[test]
    fn test_denormalise_short_ext() {
        let (name, ext) = denormalise("A.B").unwrap();
        assert_eq!(&name, b"A       ");
        assert_eq!(&ext, b"B  ");
    }

    #[test]
    fn test_denormalise_rejects_bad_names() {
        assert!(denormalise("NOEXTENSION").is_err());
        assert!(denormalise("TOOLONGNAME.BIN").is_err());
        assert!(denormalise("NAME.LONG").is_err());
        assert!(denormalise(".BIN").is_err());
    }

    #[test]
    fn test_forbidden_chars_become_underscores() {
        let mut entry = DirEntry::empty();
        entry.file_name[..4].copy_from_slice(b"A?B*");
        entry.ext.copy_from_slice(b"BIN");
        assert_eq!(entry.normalised_name(), "A_B_.BIN");
    }
}
