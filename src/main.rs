use std::{
    fmt::{Debug, Display},
    fs::File,
    io::Write,
    path::PathBuf,
    process::exit,
};

use clap::{Parser, Subcommand};
use gbemu::Emulator;

#[derive(Parser)]
#[command(name = "gbemu", about = "Gameboy emulator core, driven headlessly")]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a ROM and run it headlessly for a fixed number of CPU steps.
    #[command(arg_required_else_help = true)]
    Run {
        /// Gameboy ROM file
        rom_file: PathBuf,
        /// Number of CPU steps to execute before stopping
        #[arg(long, default_value_t = 10_000_000)]
        steps: u64,
        /// Save the emulator state into a save file on exit
        #[arg(long, value_name = "SAVE_FILE")]
        save_to: Option<PathBuf>,
    },

    /// Resume the emulator from a save file and run it for a fixed number
    /// of CPU steps; on exit the new state is saved into the same file
    /// unless changed using the options below.
    #[command(arg_required_else_help = true)]
    Resume {
        /// Saved file
        save_file: PathBuf,
        /// Number of CPU steps to execute before stopping
        #[arg(long, default_value_t = 10_000_000)]
        steps: u64,
        /// Do not save new state into the current save file
        #[arg(long, conflicts_with = "save_to")]
        no_save: bool,
        /// Save new state into the given file while leaving the
        /// current save file unchanged
        #[arg(long, value_name = "SAVE_FILE", conflicts_with = "no_save")]
        save_to: Option<PathBuf>,
    },

    /// Extract the original ROM out of a save file.
    ExtractRom {
        /// Saved file
        save_file: PathBuf,
        /// New ROM file
        rom_file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.commands {
        Commands::Run {
            rom_file,
            steps,
            save_to,
        } => {
            let rom = read_or_exit(&rom_file, "ROM file");
            let mut emulator = Emulator::from_rom(&rom).unwrap_or_else(|e| {
                err_exit("Failed to initialize emulator", e);
            });

            run_headless(&mut emulator, steps);

            if let Some(path) = save_to {
                write_or_exit(&path, "save file", &emulator.save());
                eprintln!("Game state saved to file {path:?}.");
            }
        }

        Commands::Resume {
            save_file,
            steps,
            no_save,
            save_to,
        } => {
            let data = read_or_exit(&save_file, "save file");
            let mut emulator = Emulator::from_saved(&data).unwrap_or_else(|e| {
                err_exit("Failed to resume emulator", e);
            });

            run_headless(&mut emulator, steps);

            let save_path = if no_save {
                None
            } else {
                save_to.or(Some(save_file))
            };
            if let Some(path) = save_path {
                write_or_exit(&path, "save file", &emulator.save());
                eprintln!("Game state saved to file {path:?}.");
            }
        }

        Commands::ExtractRom {
            save_file,
            rom_file,
        } => {
            let data = read_or_exit(&save_file, "save file");
            match Emulator::rom_from_saved(&data) {
                Ok(rom) => {
                    write_or_exit(&rom_file, "ROM file", &rom);
                    eprintln!("ROM saved to file {rom_file:?}.");
                }
                Err(e) => err_exit("Decoding save file failed", e),
            }
        }
    }

    eprintln!("Quit.");
}

/// Step the machine `steps` times, stopping early if it crashes.
fn run_headless(emulator: &mut Emulator, steps: u64) {
    for _ in 0..steps {
        emulator.step();
        if emulator.is_crashed() {
            eprintln!("Emulator crashed, see error log above; stopping early.");
            break;
        }
    }
}

fn read_or_exit(path: &PathBuf, err_name: &str) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(ret) => ret,
        Err(e) => err_exit(
            format!("Cannot open {err_name} {path:?} for reading"),
            e.kind(),
        ),
    }
}

fn write_or_exit(path: &PathBuf, err_name: &str, data: &[u8]) {
    match File::create(path) {
        Ok(mut f) => {
            if let Err(e) = f.write_all(data) {
                err_exit(format!("Write to {err_name} {path:?} failed"), e.kind());
            }
        }
        Err(e) => err_exit(format!("Cannot open {err_name} {path:?} for writing"), e.kind()),
    }
}

fn err_exit<M: Display, E: Debug>(msg: M, err: E) -> ! {
    eprintln!("{msg}.");
    eprintln!("Error: {err:?}.");
    exit(1);
}
