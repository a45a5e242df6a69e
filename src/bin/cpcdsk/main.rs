//! # Command Line Interface
//!
//! One transaction per invocation: open the image, format it if requested,
//! mount the filesystem, dispatch the subcommand, close.

use clap::{arg, crate_version, ArgAction, Command};
use cpcdsk::cpm::SectorChunk;
use cpcdsk::{CpmFs, DskError, FileEntry};
use std::path::Path;
use std::process::ExitCode;

mod shell;

fn build_cli() -> Command {
    Command::new("cpcdsk")
        .about("Manipulates Amstrad CPC disk images and the CP/M files inside them.")
        .version(crate_version!())
        .after_long_help(
            "Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Insert addresses are hexadecimal; non-hex characters are ignored, so
`0x8000`, `&8000` and `8000h` all parse.",
        )
        .arg(arg!(--file <IMAGE> "disk image to operate on").required(true))
        .arg(
            arg!(--"no-amsdos" "do not add an AMSDOS header on insert")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            arg!(--text "treat SUB (0x1A) as the end-of-file marker on extract")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(Command::new("new").about("Create a new empty disk image"))
        .subcommand(Command::new("dir").about("List contents of the disk image"))
        .subcommand(
            Command::new("info")
                .about("Print info about a file in the disk")
                .arg(arg!(<name> "file to describe"))
                .arg(arg!(--tracks "print (track, first, last) triples only").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("dump")
                .about("Hexdump contents of a file to standard output")
                .arg(arg!(<name> "file to dump")),
        )
        .subcommand(
            Command::new("extract")
                .about("Extract contents of a file into the host disk")
                .arg(arg!(<name> "file to extract")),
        )
        .subcommand(Command::new("extall").about("Extract all files to the host disk"))
        .subcommand(
            Command::new("insert")
                .about("Insert a file on the host system into the disk")
                .arg(arg!(<name> "host file to insert"))
                .arg(arg!([entry_addr] "load address, base 16"))
                .arg(arg!([exec_addr] "execution address, base 16")),
        )
        .subcommand(
            Command::new("del")
                .about("Delete a file from the disk")
                .arg(arg!(<name> "file to delete")),
        )
        .subcommand(
            Command::new("dasm")
                .about("Disassemble a file from the disk as Z80 code")
                .arg(arg!(<name> "file to disassemble")),
        )
        .subcommand(Command::new("shell").about("Open an interactive shell on the image"))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> cpcdsk::Result<()> {
    let matches = build_cli().get_matches();
    let image_path = matches
        .get_one::<String>("file")
        .expect("--file is required")
        .clone();
    let no_amsdos = matches.get_flag("no-amsdos");
    let text = matches.get_flag("text");

    if let Some(("new", _)) = matches.subcommand() {
        let mut fs = CpmFs::create(&image_path)?;
        return fs.flush();
    }

    let mut fs = CpmFs::open(&image_path)?;

    match matches.subcommand() {
        Some(("dir", _)) => cmd_dir(&mut fs)?,
        Some(("info", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            cmd_info(&mut fs, name, sub.get_flag("tracks"))?;
        }
        Some(("dump", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            cmd_dump(&mut fs, name)?;
        }
        Some(("extract", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            cmd_extract(&mut fs, name, text)?;
        }
        Some(("extall", _)) => {
            for entry in fs.list()? {
                cmd_extract(&mut fs, &entry.name, text)?;
            }
        }
        Some(("insert", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            let entry_addr = sub
                .get_one::<String>("entry_addr")
                .map(|s| parse_hex(s))
                .unwrap_or(0);
            let exec_addr = sub
                .get_one::<String>("exec_addr")
                .map(|s| parse_hex(s))
                .unwrap_or(0);
            cmd_insert(&mut fs, name, entry_addr, exec_addr, !no_amsdos)?;
        }
        Some(("del", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            if fs.delete(name)? {
                println!("{} is deleted.", name);
            }
        }
        Some(("dasm", sub)) => {
            let name = sub.get_one::<String>("name").expect("required");
            cmd_dasm(&mut fs, name)?;
        }
        Some(("shell", _)) => shell::run(&mut fs, &image_path)?,
        _ => {}
    }

    fs.flush()
}

/// Parse a base-16 address, ignoring every non-hex character
pub fn parse_hex(s: &str) -> u16 {
    let digits: String = s.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    u16::from_str_radix(&digits, 16).unwrap_or(0)
}

pub fn cmd_dir(fs: &mut CpmFs) -> cpcdsk::Result<()> {
    let files = fs.list()?;

    for entry in &files {
        print_dir_entry(entry);
    }

    println!("\n{} file(s), {}K free", files.len(), fs.free_kb()?);
    Ok(())
}

fn print_dir_entry(entry: &FileEntry) {
    println!(
        "{:>13}\t{:>3}K\t{:<6}\t{:<9}",
        entry.name,
        entry.size_kb,
        if entry.system { "system" } else { "" },
        if entry.read_only { "read-only" } else { "" },
    );
}

pub fn cmd_info(fs: &mut CpmFs, name: &str, tracks_only: bool) -> cpcdsk::Result<()> {
    let info = match fs.file_info(name) {
        Ok(info) => info,
        Err(DskError::NotFound(name)) => {
            println!("File {} not found.", name);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if tracks_only {
        println!(
            "; track number, first sector, last sector for the file {}",
            name
        );
        for (track, min, max) in &info.track_runs {
            println!("db 0x{:02x}, 0x{:02x}, 0x{:02x}", track, min, max);
        }
        println!("db 0xff");
        return Ok(());
    }

    for extent in &info.extents {
        let entry = &extent.entry;
        println!("Directory Entry: {:02}", entry.ex);
        println!("-------------------");
        println!(" U     FILE_NAME EX S1 S2  RC");
        println!(
            "{:02} {:>13} {:02} {:02} {:02} {:03}",
            entry.user_number,
            entry.normalised_name(),
            entry.ex,
            entry.s1,
            entry.s2,
            entry.rc
        );
        println!();
        println!("Allocation blocks");
        println!("-----------------");
        let blocks: Vec<String> = entry.al.iter().map(|b| format!("{:02}", b)).collect();
        println!("{}", blocks.join(" "));
        println!();
        println!("Track, Sector pairs");
        println!("-------------------");
        for (track, sector_id) in &extent.sectors {
            println!("0x{:02x}, 0x{:02x}", track, sector_id);
        }
        println!();
    }

    if let Some(header) = &info.header {
        print!("{}", header);
    }

    Ok(())
}

pub fn cmd_dump(fs: &mut CpmFs, name: &str) -> cpcdsk::Result<()> {
    let chunks = match fs.dump_file(name) {
        Ok(chunks) => chunks,
        Err(DskError::NotFound(name)) => {
            println!("File {} not found.", name);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for chunk in &chunks {
        println!("# track: {:2}, sector: {:2}", chunk.track, chunk.sector);
        print_hex_dump(chunk);
    }

    Ok(())
}

fn print_hex_dump(chunk: &SectorChunk) {
    for (i, line) in chunk.data.chunks(16).enumerate() {
        print!("{:04x}: ", chunk.offset + i * 16);

        for (j, byte) in line.iter().enumerate() {
            print!("{:02x} ", byte);
            if j == 7 {
                print!(" ");
            }
        }
        for j in line.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in line {
            let c = if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }
}

pub fn cmd_extract(fs: &mut CpmFs, name: &str, text: bool) -> cpcdsk::Result<()> {
    // Resolve the canonical on-disk name for the host-side file
    let canonical = match fs
        .list()?
        .into_iter()
        .find(|e| e.name.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.name,
        None => {
            println!("File {} not found.", name);
            return Ok(());
        }
    };

    let data = fs.read_file(&canonical, text)?;
    std::fs::write(&canonical, &data)?;
    println!("Extracted file {}.", canonical);
    Ok(())
}

pub fn cmd_insert(
    fs: &mut CpmFs,
    name: &str,
    entry_addr: u16,
    exec_addr: u16,
    amsdos: bool,
) -> cpcdsk::Result<()> {
    let host = Path::new(name);
    let disk_name = host
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    let data = std::fs::read(host).map_err(|e| {
        DskError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {}: {}", name, e),
        ))
    })?;

    fs.insert(disk_name, &data, entry_addr, exec_addr, amsdos)?;
    println!("Wrote {} into disk.", disk_name);
    Ok(())
}

pub fn cmd_dasm(fs: &mut CpmFs, name: &str) -> cpcdsk::Result<()> {
    let header = match fs.file_header(name) {
        Ok(header) => header,
        Err(DskError::NotFound(name)) => {
            println!("File {} not found.", name);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let data = fs.read_file(name, false)?;
    let origin = header.map(|h| h.data_location).unwrap_or(0);
    disassemble_z80(&data, origin);
    Ok(())
}

/// Print a Z80 disassembly of `data`, addresses starting at `origin`
pub fn disassemble_z80(data: &[u8], origin: u16) {
    let mut slice: &[u8] = data;
    let mut offset: usize = 0;

    while !slice.is_empty() {
        let start_len = slice.len();
        let address = origin.wrapping_add(offset as u16);

        match dez80::Instruction::decode_one(&mut slice) {
            Ok(instruction) => {
                let consumed = start_len - slice.len();
                let bytes: Vec<String> = data[offset..offset + consumed]
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect();

                println!("{:04X}  {:<12} {}", address, bytes.join(" "), instruction);
                offset += consumed;
            }
            Err(_) => {
                // Invalid instruction - show as data byte
                println!(
                    "{:04X}  {:02X}           DB {:02X}h",
                    address, slice[0], slice[0]
                );
                slice = &slice[1..];
                offset += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_hex("0x8000"), 0x8000);
        assert_eq!(parse_hex("&8000"), 0x8000);
        assert_eq!(parse_hex("8000h"), 0x8000);
        assert_eq!(parse_hex("C000"), 0xC000);
        assert_eq!(parse_hex(""), 0);
        assert_eq!(parse_hex("&&"), 0);
    }

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }
}
