/*!
# cpcdsk

A Rust library for reading, writing, creating and modifying Amstrad CPC
disk images (`.dsk`) with CP/M 2.2 filesystem and AMSDOS header support.

## Features

- Standard CPCEMU disk images, bit-compatible with the emulators
- Logical sector access through the track interleave (skew) table
- CP/M directory listing, file extraction, insertion and deletion
- AMSDOS 128-byte header building, validation and decoding
- Idiomatic Rust API with structured error handling

## Quick Start

```rust,no_run
use cpcdsk::CpmFs;

// Create and format a fresh image
let mut fs = CpmFs::create("disk.dsk")?;

// Insert a host file with an AMSDOS header
let data = std::fs::read("game.bin")?;
fs.insert("game.bin", &data, 0x8000, 0x8000, true)?;

// List the directory
for entry in fs.list()? {
    println!("{:>13} {}K", entry.name, entry.size_kb);
}

// Extract it again (header stripped)
let contents = fs.read_file("GAME.BIN", false)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Image layout

A standard image is three nested formats: the CPCEMU envelope emulating an
NEC765-style floppy controller (disk info, per-track info, interleaved
sectors), the CP/M 2.2 filesystem inside the sector stream (directory
entries, extents, 1 KiB allocation blocks), and an optional AMSDOS header
in the first 128-byte record of a file.

## Modules

- `cpcemu`: disk image envelope, packed records, sector skew
- `cpm`: CP/M filesystem, DPB profiles, directory, allocation
- `amsdos`: AMSDOS file header
- `io`: positioned I/O over the backing file
- `error`: error types and Result alias
*/

#![warn(missing_docs)]

/// AMSDOS 128-byte file header
pub mod amsdos;
/// CPCEMU disk image envelope
pub mod cpcemu;
/// CP/M 2.2 filesystem over a CPCEMU image
pub mod cpm;
/// Error types and Result alias
pub mod error;
/// Positioned I/O over the image backing store
pub mod io;

// Re-export common types
pub use amsdos::{AmsdosHeader, FileType};
pub use cpcemu::{CpcImage, DiskInfo, DiskVariant, SkewTable, TrackInfo};
pub use cpm::{CpmFs, DirEntry, DiskParameterBlock, FileEntry, FileInfo};
pub use error::{DskError, Result};
