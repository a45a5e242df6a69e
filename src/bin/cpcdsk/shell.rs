//! Interactive shell over one disk image

use cpcdsk::CpmFs;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "dasm", "del", "dir", "dump", "exit", "extract", "free", "help", "info",
                "insert", "quit", "tracks",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".cpcdsk_history");
        p
    })
}

/// Run the interactive shell over an already mounted image
pub fn run(fs: &mut CpmFs, image_path: &str) -> cpcdsk::Result<()> {
    println!("=== cpcdsk ===");
    println!("Interactive shell on {} ({} disk).", image_path, fs.variant());
    println!("Type 'help' for available commands\n");

    let mut rl = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        let readline = rl.readline("> ");
        let input = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(input);

        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts[0].to_lowercase();

        let result = match command.as_str() {
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => {
                save_history(&mut rl);
                println!("Goodbye!");
                break;
            }
            "dir" | "ls" | "cat" => super::cmd_dir(fs),
            "info" => match parts.get(1) {
                Some(name) => super::cmd_info(fs, name, false),
                None => usage("info <name>"),
            },
            "tracks" => match parts.get(1) {
                Some(name) => super::cmd_info(fs, name, true),
                None => usage("tracks <name>"),
            },
            "dump" => match parts.get(1) {
                Some(name) => super::cmd_dump(fs, name),
                None => usage("dump <name>"),
            },
            "extract" => match parts.get(1) {
                Some(name) => {
                    let text = parts.get(2).is_some_and(|&opt| opt == "--text");
                    super::cmd_extract(fs, name, text)
                }
                None => usage("extract <name> [--text]"),
            },
            "insert" => match parts.get(1) {
                Some(name) => {
                    let entry_addr = parts.get(2).map(|s| super::parse_hex(s)).unwrap_or(0);
                    let exec_addr = parts.get(3).map(|s| super::parse_hex(s)).unwrap_or(0);
                    super::cmd_insert(fs, name, entry_addr, exec_addr, true)
                }
                None => usage("insert <name> [<entry_addr> <exec_addr>]"),
            },
            "del" => match parts.get(1) {
                Some(name) => fs.delete(name).map(|deleted| {
                    if deleted {
                        println!("{} is deleted.", name);
                    }
                }),
                None => usage("del <name>"),
            },
            "dasm" => match parts.get(1) {
                Some(name) => super::cmd_dasm(fs, name),
                None => usage("dasm <name>"),
            },
            "free" => fs.free_kb().map(|free| println!("{}K free", free)),
            _ => {
                println!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    command
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

fn usage(text: &str) -> cpcdsk::Result<()> {
    println!("Usage: {}", text);
    Ok(())
}

fn save_history<H: Helper, I: rustyline::history::History>(rl: &mut Editor<H, I>) {
    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  dir                            - List files on the disk");
    println!("  info <name>                    - Show directory entries and sector chain");
    println!("  tracks <name>                  - Show (track, first, last) loader triples");
    println!("  dump <name>                    - Hex dump a file");
    println!("  extract <name> [--text]        - Extract a file to the host disk");
    println!("  insert <name> [entry exec]     - Insert a host file (addresses in hex)");
    println!("  del <name>                     - Delete a file");
    println!("  dasm <name>                    - Disassemble a file as Z80 code");
    println!("  free                           - Show free space");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
}
