use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Inspect and edit simple-fs disk images")]
pub struct Cli {
    /// Disk image file
    #[arg(long, short)]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new file system on the image
    Format {
        /// Overwrite an existing file system without asking
        #[arg(long, short)]
        force: bool,

        /// Resize the image to this many blocks first
        #[arg(long, short)]
        blocks: Option<u64>,
    },
    /// Dump the superblock and every valid inode
    Debug,
    /// Allocate a new inode and print its number
    Create,
    /// Delete an inode and release its blocks
    Delete { inumber: u32 },
    /// Print the size of an inode in bytes
    Getsize { inumber: u32 },
    /// Write the content of an inode to stdout
    Cat { inumber: u32 },
    /// Append a host file to an inode
    Copyin { path: PathBuf, inumber: u32 },
    /// Copy the content of an inode into a host file
    Copyout { inumber: u32, path: PathBuf },
}
