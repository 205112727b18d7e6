//! 内存盘：整块设备都放在一段堆内存里

use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::BlockDevice;

#[derive(Debug)]
pub struct RamDisk {
    block_size: usize,
    blocks: usize,
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            block_size,
            blocks,
            data: Mutex::new(vec![0; block_size * blocks]),
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 块在内存中的字节范围
    fn span(&self, block_id: usize) -> core::ops::Range<usize> {
        assert!(
            block_id < self.blocks,
            "block {block_id} out of range ({} blocks)",
            self.blocks
        );
        let start = block_id * self.block_size;
        start..start + self.block_size
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        assert_eq!(buf.len(), self.block_size, "not a complete block!");
        let span = self.span(block_id);
        buf.copy_from_slice(&self.data.lock()[span]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        assert_eq!(buf.len(), self.block_size, "not a complete block!");
        let span = self.span(block_id);
        self.data.lock()[span].copy_from_slice(buf);
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.blocks
    }
}
