//! # 空闲块表
//!
//! 每个块对应一位，置位表示已占用。
//! 空闲块表从不落盘：挂载时从超级块、inode 表以及每个有效 inode
//! 可达的所有块重建，因此总与磁盘内容一致。

use alloc::vec;
use alloc::vec::Vec;

/// 位组：64 个块一组
type BitGroup = u64;
const GROUP_BITS: usize = BitGroup::BITS as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeMap {
    groups: Vec<BitGroup>,
    /// 设备总块数
    blocks: usize,
}

/// 块编号
struct BlockID(usize);

impl FreeMap {
    /// 全部空闲。最后一组中超出设备的位预先置位，永远不会被分配。
    pub fn new(blocks: usize) -> Self {
        let mut groups = vec![0; blocks.div_ceil(GROUP_BITS)];
        let tail = blocks % GROUP_BITS;
        if tail != 0 {
            groups[blocks / GROUP_BITS] = BitGroup::MAX << tail;
        }

        Self { groups, blocks }
    }

    /// 表示的总块数
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    /// # Panics
    ///
    /// `block_id` 超出设备块数时 panic，[`mark_busy`](Self::mark_busy)
    /// 与 [`mark_free`](Self::mark_free) 同理
    pub fn is_busy(&self, block_id: u32) -> bool {
        let (group_index, ingroup_index) = self.locate(block_id);
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    pub fn mark_busy(&mut self, block_id: u32) {
        let (group_index, ingroup_index) = self.locate(block_id);
        self.groups[group_index] |= 1 << ingroup_index;
    }

    /// 超出设备的块不能释放，否则最后一组中预先置位的位会被分配出去
    pub fn mark_free(&mut self, block_id: u32) {
        let (group_index, ingroup_index) = self.locate(block_id);
        self.groups[group_index] &= !(1 << ingroup_index);
    }

    /// 已占用的块数
    pub fn busy_count(&self) -> usize {
        (0..self.blocks as u32)
            .filter(|&block_id| self.is_busy(block_id))
            .count()
    }

    #[inline]
    fn locate(&self, block_id: u32) -> (usize, usize) {
        assert!(
            (block_id as usize) < self.blocks,
            "block {block_id} out of range ({} blocks)",
            self.blocks
        );
        BlockID(block_id as usize).decode()
    }

    /// 从块 1 开始找第一个空闲块，块 0 永远不是候选。
    /// 只查找，不占用。
    pub fn first_free(&self) -> Option<u32> {
        self.groups
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                let bits = if group_index == 0 { bits | 1 } else { bits };
                (bits != BitGroup::MAX).then_some((group_index, bits.trailing_ones()))
            })
            .map(|(group_index, ingroup_index)| {
                BlockID::encode(group_index, ingroup_index as usize) as u32
            })
    }
}

impl BlockID {
    #[inline]
    fn encode(group_index: usize, ingroup_index: usize) -> usize {
        group_index * GROUP_BITS + ingroup_index
    }

    #[inline]
    fn decode(self) -> (usize, usize) {
        (self.0 / GROUP_BITS, self.0 % GROUP_BITS)
    }
}
