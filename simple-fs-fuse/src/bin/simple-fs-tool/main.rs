mod cli;

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command};
use simple_fs::{BLOCK_SIZE, SimpleFileSystem};
use simple_fs_fuse::{BlockFile, format_image};
use typed_bytesize::ByteSizeIec;

/// 拷贝文件时每次读写的字节数，必须是块大小的整数倍
const CHUNK_SIZE: usize = 4 * BLOCK_SIZE;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let formatting = matches!(cli.command, Command::Format { .. });
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(formatting)
        .truncate(false)
        .open(&cli.image)?;

    match cli.command {
        Command::Format { force, blocks } => format(fd, blocks, force)?,
        Command::Debug => print!("{}", open(fd)?.debug().map_err(io::Error::other)?),
        Command::Create => {
            let mut fs = mount(fd)?;
            let inumber = fs.create().map_err(io::Error::other)?;
            println!("created inode {inumber}");
        }
        Command::Delete { inumber } => {
            let mut fs = mount(fd)?;
            fs.delete(inumber).map_err(io::Error::other)?;
            println!("inode {inumber} deleted");
        }
        Command::Getsize { inumber } => {
            let size = mount(fd)?.size(inumber).map_err(io::Error::other)?;
            println!("inode {inumber} has size {size}");
        }
        Command::Cat { inumber } => {
            copyout(&mount(fd)?, inumber, &mut io::stdout().lock())?;
        }
        Command::Copyin { path, inumber } => {
            let mut fs = mount(fd)?;
            let copied = copyin(&mut fs, &std::fs::read(&path)?, inumber)?;
            println!("{copied} bytes copied");
        }
        Command::Copyout { inumber, path } => {
            let fs = mount(fd)?;
            let copied = copyout(&fs, inumber, &mut File::create(&path)?)?;
            println!("{copied} bytes copied");
        }
    }

    Ok(())
}

fn open(fd: File) -> io::Result<SimpleFileSystem> {
    Ok(SimpleFileSystem::new(Arc::new(BlockFile::new(fd)?)))
}

fn mount(fd: File) -> io::Result<SimpleFileSystem> {
    let mut fs = open(fd)?;
    fs.mount().map_err(io::Error::other)?;
    Ok(fs)
}

fn format(fd: File, blocks: Option<u64>, force: bool) -> io::Result<()> {
    let disk_size = match blocks {
        Some(blocks) => blocks * BLOCK_SIZE as u64,
        None if fd.metadata()?.len() == 0 => ByteSizeIec::mib(4).0,
        None => fd.metadata()?.len(),
    };

    let formatted = format_image(fd, disk_size, force, |old| {
        confirm(&format!(
            "image already holds a file system of {} blocks, overwrite?",
            old.total_blocks
        ))
    })?;

    match formatted {
        Some(super_block) => println!(
            "formatted {} blocks, {} inodes",
            super_block.total_blocks, super_block.inode_capacity
        ),
        None => println!("image left unchanged"),
    }
    Ok(())
}

fn confirm(question: &str) -> io::Result<bool> {
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// 追加到 inode 末尾，返回实际写入的字节数
fn copyin(fs: &mut SimpleFileSystem, data: &[u8], inumber: u32) -> io::Result<usize> {
    let mut offset = fs.size(inumber).map_err(io::Error::other)? as usize;
    let mut copied = 0;

    for chunk in data.chunks(CHUNK_SIZE) {
        let written = fs.write(inumber, chunk, offset).map_err(io::Error::other)?;
        offset += written;
        copied += written;
        if written < chunk.len() {
            log::warn!("inode {inumber}: only {copied} of {} bytes copied", data.len());
            break;
        }
    }

    Ok(copied)
}

fn copyout(fs: &SimpleFileSystem, inumber: u32, out: &mut impl Write) -> io::Result<usize> {
    let mut buf = vec![0; CHUNK_SIZE];
    let mut offset = 0;

    loop {
        let read = fs.read(inumber, &mut buf, offset).map_err(io::Error::other)?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])?;
        offset += read;
    }

    out.flush()?;
    Ok(offset)
}
