use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

use crate::{DIRECT_COUNT, DataBlock, INODE_SIZE, Result};

/// 磁盘上的 inode 记录，[`INODES_PER_BLOCK`](crate::INODES_PER_BLOCK) 个紧密排列在一个 inode 块中。
///
/// 块编号 0 表示“未使用”。
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskInode {
    #[br(map = |valid: u32| valid != 0)]
    #[bw(map = |valid: &bool| u32::from(*valid))]
    pub valid: bool,
    /// 文件字节数
    pub size: u32,
    /// 直接索引，存储容量：DIRECT_COUNT * BLOCK_SIZE 字节
    pub direct: [u32; DIRECT_COUNT],
    /// 指向一个间接索引块
    pub indirect: u32,
}

impl DiskInode {
    /// 新建一个有效的空文件
    #[inline]
    pub fn init(&mut self) {
        *self = Self {
            valid: true,
            ..Default::default()
        }
    }

    /// 从 inode 块中取出第 `slot` 条记录
    pub fn decode(block: &DataBlock, slot: usize) -> Result<Self> {
        let offset = slot * INODE_SIZE;
        Ok(Self::read(&mut Cursor::new(&block[offset..offset + INODE_SIZE]))?)
    }

    /// 只覆盖 inode 块中的第 `slot` 条记录，同块的其它记录保持不变
    pub fn encode(&self, block: &mut DataBlock, slot: usize) -> Result<()> {
        let offset = slot * INODE_SIZE;
        self.write(&mut Cursor::new(&mut block[offset..offset + INODE_SIZE]))?;
        Ok(())
    }

    /// 非零的直接索引
    pub fn direct_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().copied().filter(|&block| block != 0)
    }

    #[inline]
    pub fn has_indirect(&self) -> bool {
        self.indirect != 0
    }
}
