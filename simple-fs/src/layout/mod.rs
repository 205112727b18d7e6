//! # 磁盘数据结构层
//!
//! simple-fs 的磁盘布局：
//! 超级块(块 0) | inode 表(块 1..=inode_blocks) | 数据区
//!
//! 数据区里的块要么是数据块，要么是间接索引块，
//! 身份只取决于引用它的 inode，块本身不带任何标记。
//!
//! 所有记录都是小端 `u32` 字段，经 `binrw` 与字节缓冲互相转换，
//! 不依赖内存布局。

mod super_block;
pub use super_block::SuperBlock;

mod inode;
pub use inode::DiskInode;

mod indirect;
pub use indirect::IndirectBlock;
