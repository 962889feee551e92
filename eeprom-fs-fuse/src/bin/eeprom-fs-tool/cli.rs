use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// EEPROM image file
    #[arg(long, short)]
    pub image: PathBuf,

    /// Reject every command that would modify the image
    #[arg(long)]
    pub read_only: bool,

    /// Log every record read and written (at trace level)
    #[arg(long)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh image of the given capacity
    Format {
        /// Capacity in KB, 16 blocks of 64 bytes each
        #[arg(long)]
        kb: u16,
    },
    #[command(flatten)]
    Volume(VolumeCommand),
}

/// Commands that run on a mounted image
#[derive(Subcommand)]
pub enum VolumeCommand {
    /// Create a directory, e.g. `/docs`
    Mkdir { dir: String },
    /// Delete a directory and every file in it
    Rmdir { dir: String },
    /// Rename a directory
    Mvdir { from: String, to: String },
    /// List the files of a directory; the root also lists directories
    Ls { dir: Option<String> },
    /// Copy a host file into the image
    Put { host: PathBuf, path: String },
    /// Copy a file out of the image
    Get { path: String, host: PathBuf },
    /// Print a file to stdout
    Cat { path: String },
    /// Erase a file
    Rm { path: String },
    /// Show block usage
    Df,
    /// Replace the attributes of a file
    Attr {
        path: String,
        #[arg(long)]
        read_only: bool,
        #[arg(long)]
        hidden: bool,
        #[arg(long)]
        system: bool,
        #[arg(long)]
        archive: bool,
    },
}
