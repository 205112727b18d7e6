#![no_std]

extern crate alloc;

/* simple-fs 的整体架构，自上而下 */

// 文件系统层：格式化、挂载、inode 的增删与读写
mod sfs;

// 调试层：只读地导出超级块与 inode 状态
mod debug;

// 空闲块表：挂载时扫描 inode 重建，只存在于内存
mod free_map;

// 磁盘数据结构层：超级块、inode、间接索引块与字节缓冲的相互编解码
mod layout;

mod error;

pub use self::{
    debug::{InodeReport, Report},
    error::{Error, Result},
    free_map::FreeMap,
    layout::{DiskInode, IndirectBlock, SuperBlock},
    sfs::SimpleFileSystem,
};

pub const MAGIC: u32 = 0xf0f0_3410;
pub const BLOCK_SIZE: usize = 4096;

/// inode 内直接索引的个数
pub const DIRECT_COUNT: usize = 5;
/// 磁盘上一条 inode 记录的字节数
pub const INODE_SIZE: usize = 32;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
/// 间接索引块能容纳的块编号个数
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;
/// 单个文件最多占用的数据块数
pub const MAX_FILE_BLOCKS: usize = DIRECT_COUNT + POINTERS_PER_BLOCK;

type DataBlock = [u8; BLOCK_SIZE];
