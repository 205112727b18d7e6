//! 间接索引块：整个块连续存储**块编号**，每个编号都指向一个**数据块**

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

use crate::{BLOCK_SIZE, DataBlock, POINTERS_PER_BLOCK, Result};

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectBlock {
    pointers: [u32; POINTERS_PER_BLOCK],
}

impl IndirectBlock {
    #[inline]
    pub fn new() -> Self {
        Self {
            pointers: [0; POINTERS_PER_BLOCK],
        }
    }

    pub fn decode(block: &DataBlock) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(&block[..]))?)
    }

    pub fn encode(&self) -> Result<DataBlock> {
        let mut block = [0; BLOCK_SIZE];
        self.write(&mut Cursor::new(&mut block[..]))?;
        Ok(block)
    }

    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        self.pointers[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, block: u32) {
        self.pointers[index] = block;
    }

    /// 非零的块编号
    pub fn used(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().filter(|&block| block != 0)
    }
}

impl Default for IndirectBlock {
    fn default() -> Self {
        Self::new()
    }
}
