use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

use crate::{BLOCK_SIZE, DataBlock, INODES_PER_BLOCK, Result};

/// 超级块：
/// - 提供文件系统合法性校验(魔数由 `binrw` 读写并校验)；
/// - 记录磁盘几何信息
///
/// 格式化时写入一次，此后只读。
#[binrw]
#[brw(little, magic = 0xf0f0_3410u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// 文件系统占据块数
    pub total_blocks: u32,
    /// inode 表占据块数
    pub inode_blocks: u32,
    /// inode 表的容量，不是当前已用的 inode 数
    pub inode_capacity: u32,
}

impl SuperBlock {
    /// 按设备总块数计算布局：`ceil(total_blocks / 10)` 块用于 inode 表，至少一块。
    ///
    /// 10 块的设备因此只有 1 个 inode 块(128 个 inode)，
    /// 20 块为 2 个，200 块为 20 个。
    pub fn new(total_blocks: u32) -> Self {
        let inode_blocks = total_blocks.div_ceil(10).max(1);
        Self {
            total_blocks,
            inode_blocks,
            inode_capacity: inode_blocks * INODES_PER_BLOCK as u32,
        }
    }

    /// 魔数不符时返回 [`Error::InvalidFormat`](crate::Error::InvalidFormat)
    pub fn decode(block: &DataBlock) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(&block[..]))?)
    }

    pub fn encode(&self) -> Result<DataBlock> {
        let mut block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))?;
        Ok(block)
    }

    /// 数据区的第一个块
    #[inline]
    pub fn data_area_start(&self) -> u32 {
        self.inode_blocks.saturating_add(1)
    }

    #[inline]
    pub fn contains_inode(&self, inumber: u32) -> bool {
        inumber < self.inode_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MAGIC};

    #[test]
    fn geometry() {
        let sb = SuperBlock::new(10);
        assert_eq!(sb.inode_blocks, 1);
        assert_eq!(sb.inode_capacity, 128);

        let sb = SuperBlock::new(11);
        assert_eq!(sb.inode_blocks, 2);
        assert_eq!(sb.data_area_start(), 3);

        let sb = SuperBlock::new(200);
        assert_eq!(sb.inode_blocks, 20);
        assert_eq!(sb.inode_capacity, 20 * 128);

        assert_eq!(SuperBlock::new(3).inode_blocks, 1);
    }

    #[test]
    fn bit_exact_layout() {
        let block = SuperBlock::new(200).encode().unwrap();
        assert_eq!(block[0..4], MAGIC.to_le_bytes());
        assert_eq!(block[4..8], 200u32.to_le_bytes());
        assert_eq!(block[8..12], 20u32.to_le_bytes());
        assert_eq!(block[12..16], 2560u32.to_le_bytes());
        assert!(block[16..].iter().all(|&b| b == 0));

        assert_eq!(SuperBlock::decode(&block).unwrap(), SuperBlock::new(200));
    }

    #[test]
    fn bad_magic() {
        let mut block = SuperBlock::new(20).encode().unwrap();
        block[0] ^= 0xff;
        assert_eq!(SuperBlock::decode(&block), Err(Error::InvalidFormat));
        assert_eq!(SuperBlock::decode(&[0; BLOCK_SIZE]), Err(Error::InvalidFormat));
    }
}
