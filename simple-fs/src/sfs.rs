//! # 文件系统层
//!
//! [`SimpleFileSystem`] 持有块设备与挂载状态，所有操作都经由它完成。
//! 挂载状态就是空闲块表：挂载时构建，卸载时丢弃。
//!
//! 设备只保证单块写入的原子性，跨块的操作(例如先写间接索引块，
//! 再写数据块，最后写 inode)中途中断会留下不一致的磁盘内容；
//! 下次挂载时空闲块表按磁盘实际内容重建。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::layout::{DiskInode, IndirectBlock, SuperBlock};
use crate::{BLOCK_SIZE, DIRECT_COUNT, DataBlock, Error, FreeMap, Result};
use crate::{INODE_SIZE, INODES_PER_BLOCK, MAX_FILE_BLOCKS};

pub struct SimpleFileSystem {
    block_device: Arc<dyn BlockDevice>,
    /// 空闲块表，仅在挂载后存在
    free_map: Option<FreeMap>,
}

impl SimpleFileSystem {
    /// 未挂载的文件系统句柄
    pub fn new(block_device: Arc<dyn BlockDevice>) -> Self {
        Self {
            block_device,
            free_map: None,
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.free_map.is_some()
    }

    /// 挂载后才有空闲块表
    #[inline]
    pub fn free_map(&self) -> Option<&FreeMap> {
        self.free_map.as_ref()
    }

    /// 在设备上建立新的文件系统。
    ///
    /// 设备上已有合法文件系统时，除非 `force`，否则拒绝执行且不改动任何状态。
    pub fn format(&mut self, force: bool) -> Result<SuperBlock> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        match self.stored_super_block() {
            Some(_) if !force => {
                log::warn!("device already formatted, refusing to overwrite");
                return Err(Error::AlreadyFormatted);
            }
            Some(old) => log::warn!("overwriting existing file system: {old:?}"),
            None => {}
        }

        let total_blocks =
            u32::try_from(self.block_device.num_blocks()).unwrap_or(u32::MAX);
        let super_block = SuperBlock::new(total_blocks);
        if super_block.data_area_start() > total_blocks {
            return Err(Error::DeviceTooSmall {
                blocks: total_blocks as usize,
            });
        }

        let zero: DataBlock = [0; BLOCK_SIZE];
        for block_id in 1..total_blocks {
            self.write_block(block_id, &zero);
        }
        // 超级块最后落盘，中途中断的格式化不会被当作合法文件系统
        self.write_block(0, &super_block.encode()?);

        log::info!(
            "formatted: {} blocks, {} inode blocks, {} inodes",
            super_block.total_blocks,
            super_block.inode_blocks,
            super_block.inode_capacity
        );
        Ok(super_block)
    }

    /// 校验超级块并扫描 inode 表，重建空闲块表
    pub fn mount(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }

        let super_block = self.super_block()?;
        let mut free_map = FreeMap::new(self.block_device.num_blocks());

        // 超级块与 inode 表
        for block_id in 0..super_block.data_area_start() {
            free_map.mark_busy(block_id);
        }

        for block_index in 0..super_block.inode_blocks {
            for inode in self.inode_block(block_index)? {
                if !inode.valid {
                    continue;
                }

                for block_id in inode.direct_blocks() {
                    Self::claim(&mut free_map, block_id)?;
                }

                if inode.has_indirect() {
                    Self::claim(&mut free_map, inode.indirect)?;
                    for block_id in self.load_indirect(inode.indirect)?.used() {
                        Self::claim(&mut free_map, block_id)?;
                    }
                }
            }
        }

        log::info!(
            "mounted: {}/{} blocks in use",
            free_map.busy_count(),
            free_map.len()
        );
        self.free_map = Some(free_map);
        Ok(())
    }

    pub fn unmount(&mut self) -> Result<()> {
        self.free_map.take().ok_or(Error::NotMounted)?;
        log::info!("unmounted");
        Ok(())
    }

    /// 在 inode 表中按编号顺序线性查找第一个空闲槽位，复杂度 O(inode_capacity)。
    /// 不维护计数器，占用情况总是扫描得出。
    pub fn create(&mut self) -> Result<u32> {
        if !self.is_mounted() {
            return Err(Error::NotMounted);
        }

        let super_block = self.super_block()?;
        for block_index in 0..super_block.inode_blocks {
            let Some(slot) = self
                .inode_block(block_index)?
                .iter()
                .position(|inode| !inode.valid)
            else {
                continue;
            };

            let inumber = block_index * INODES_PER_BLOCK as u32 + slot as u32;
            let mut inode = DiskInode::default();
            inode.init();
            self.save(inumber, &inode)?;

            log::info!("created inode {inumber}");
            return Ok(inumber);
        }

        log::warn!("inode table full ({} inodes)", super_block.inode_capacity);
        Err(Error::InodeTableFull)
    }

    /// 清空并释放 inode 占用的全部块，然后清零 inode 记录
    pub fn delete(&mut self, inumber: u32) -> Result<()> {
        let inode = self.valid_inode(inumber)?;

        for block_id in inode.direct_blocks() {
            self.release(block_id)?;
        }

        if inode.has_indirect() {
            for block_id in self.load_indirect(inode.indirect)?.used() {
                self.release(block_id)?;
            }
            self.release(inode.indirect)?;
        }

        self.save(inumber, &DiskInode::default())?;
        log::info!("deleted inode {inumber} ({} bytes)", inode.size);
        Ok(())
    }

    /// 文件字节数
    pub fn size(&self, inumber: u32) -> Result<u32> {
        Ok(self.valid_inode(inumber)?.size)
    }

    /// 从块 1 开始查找第一个空闲块。只查找不占用，
    /// 调用方确定使用该块后自行标记。
    pub fn find_free_block(&self) -> Result<u32> {
        self.free_map
            .as_ref()
            .ok_or(Error::NotMounted)?
            .first_free()
            .ok_or(Error::DiskFull)
    }

    /// 从 `offset` 处读出数据填充 `buf`，返回读取的字节数。
    ///
    /// 读取位置在文件末尾或之后时返回 0；
    /// 请求越过文件末尾时只读到末尾为止。
    pub fn read(&self, inumber: u32, buf: &mut [u8], offset: usize) -> Result<usize> {
        let inode = self.valid_inode(inumber)?;
        let size = inode.size as usize;
        if offset >= size {
            log::debug!("inode {inumber}: read at {offset} is past end of file ({size})");
            return Ok(0);
        }

        let length = buf.len().min(size - offset);
        let mut block_index = offset / BLOCK_SIZE;
        let mut inblock_offset = offset % BLOCK_SIZE;
        // 间接索引块至多读一次
        let mut indirect: Option<IndirectBlock> = None;

        // 已读取多少字节
        let mut read_size = 0;
        while read_size < length {
            let block_id = if block_index < DIRECT_COUNT {
                inode.direct[block_index]
            } else if block_index < MAX_FILE_BLOCKS && inode.has_indirect() {
                if indirect.is_none() {
                    indirect = Some(self.load_indirect(inode.indirect)?);
                }
                indirect
                    .as_ref()
                    .map_or(0, |indirect| indirect.get(block_index - DIRECT_COUNT))
            } else {
                0
            };

            let block_read_size = (BLOCK_SIZE - inblock_offset).min(length - read_size);
            let dest = &mut buf[read_size..read_size + block_read_size];
            if block_id == 0 {
                // 未分配的块读作全零
                log::warn!("inode {inumber}: logical block {block_index} is not allocated");
                dest.fill(0);
            } else {
                let data_block = self.read_block(block_id);
                dest.copy_from_slice(&data_block[inblock_offset..inblock_offset + block_read_size]);
            }

            read_size += block_read_size;
            inblock_offset = 0;
            block_index += 1;
        }

        log::trace!("inode {inumber}: read {read_size} bytes at {offset}");
        Ok(read_size)
    }

    /// 把 `buf` 追加写入文件，返回写入的字节数。
    ///
    /// 只支持在已有的块之后追加新块，不支持覆盖文件内部已写入的字节；
    /// `offset` 与文件大小不一致时仍然追加到文件末尾。
    /// 磁盘写满时返回已写入的字节数，一个字节都没写入时返回错误。
    pub fn write(&mut self, inumber: u32, buf: &[u8], offset: usize) -> Result<usize> {
        let mut inode = self.valid_inode(inumber)?;
        if offset != inode.size as usize {
            log::warn!(
                "inode {inumber}: write at {offset} appends at end of file ({} bytes)",
                inode.size
            );
        }

        let mut indirect = if inode.has_indirect() {
            Some(self.load_indirect(inode.indirect)?)
        } else {
            None
        };

        // 已分配的数据块数，即下一个追加块的逻辑索引
        let mut block_index = inode.direct_blocks().count()
            + indirect.as_ref().map_or(0, |indirect| indirect.used().count());

        let mut written_size = 0;
        let mut failure = None;
        for chunk in buf.chunks(BLOCK_SIZE) {
            if let Err(err) =
                self.append_block(inumber, &mut inode, &mut indirect, block_index, chunk)
            {
                failure = Some(err);
                break;
            }
            written_size += chunk.len();
            block_index += 1;
        }

        // 即便一个字节都没写入，也可能挂上了新的间接索引块
        inode.size += written_size as u32;
        self.save(inumber, &inode)?;

        match failure {
            Some(err) if written_size == 0 => Err(err),
            Some(err) => {
                log::warn!(
                    "inode {inumber}: short write {written_size}/{} bytes: {err}",
                    buf.len()
                );
                Ok(written_size)
            }
            None => {
                log::trace!("inode {inumber}: wrote {written_size} bytes");
                Ok(written_size)
            }
        }
    }

    /// 块 0 上魔数合法的超级块，不校验其几何信息是否与设备相符。
    /// 格式化据此判断设备上是否已有文件系统。
    pub fn stored_super_block(&self) -> Option<SuperBlock> {
        if self.block_device.num_blocks() == 0 {
            return None;
        }
        SuperBlock::decode(&self.read_block(0)).ok()
    }

    /// 重新读取并校验超级块
    pub fn super_block(&self) -> Result<SuperBlock> {
        if self.block_device.num_blocks() == 0 {
            return Err(Error::InvalidFormat);
        }

        let super_block = SuperBlock::decode(&self.read_block(0))?;
        if super_block.data_area_start() as usize > self.block_device.num_blocks() {
            return Err(Error::Corrupted {
                block: super_block.inode_blocks,
            });
        }
        Ok(super_block)
    }

    /// 按编号读取 inode 记录，不要求挂载，也不要求 inode 有效
    pub fn inode(&self, inumber: u32) -> Result<DiskInode> {
        if !self.super_block()?.contains_inode(inumber) {
            return Err(Error::InodeOutOfRange(inumber));
        }
        self.load(inumber)
    }
}

impl SimpleFileSystem {
    /// 通过编号获取 inode 在磁盘上的位置：**块ID**以及**块内槽位**
    #[inline]
    fn inode_pos(inumber: u32) -> (u32, usize) {
        let block_id = 1 + inumber / INODES_PER_BLOCK as u32;
        let slot = inumber as usize % INODES_PER_BLOCK;

        (block_id, slot)
    }

    pub(crate) fn load(&self, inumber: u32) -> Result<DiskInode> {
        let (block_id, slot) = Self::inode_pos(inumber);
        DiskInode::decode(&self.read_block(block_id), slot)
    }

    /// 读-改-写整个 inode 块，只覆盖目标槽位
    pub(crate) fn save(&self, inumber: u32, inode: &DiskInode) -> Result<()> {
        let (block_id, slot) = Self::inode_pos(inumber);
        let mut block = self.read_block(block_id);
        inode.encode(&mut block, slot)?;
        self.write_block(block_id, &block);
        log::trace!("saved inode {inumber} at block {block_id} +{}", slot * INODE_SIZE);
        Ok(())
    }

    /// inode 表中第 `block_index` 块的全部记录
    pub(crate) fn inode_block(&self, block_index: u32) -> Result<Vec<DiskInode>> {
        let block = self.read_block(1 + block_index);
        (0..INODES_PER_BLOCK)
            .map(|slot| DiskInode::decode(&block, slot))
            .collect()
    }

    /// 索引块编号落在设备之外时返回 [`Error::Corrupted`]
    pub(crate) fn load_indirect(&self, block_id: u32) -> Result<IndirectBlock> {
        if block_id as usize >= self.block_device.num_blocks() {
            return Err(Error::Corrupted { block: block_id });
        }
        IndirectBlock::decode(&self.read_block(block_id))
    }

    #[inline]
    pub(crate) fn read_block(&self, block_id: u32) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        self.block_device.read_block(block_id as usize, &mut block);
        block
    }

    #[inline]
    fn write_block(&self, block_id: u32, block: &DataBlock) {
        self.block_device.write_block(block_id as usize, block);
    }

    fn free_map_mut(&mut self) -> Result<&mut FreeMap> {
        self.free_map.as_mut().ok_or(Error::NotMounted)
    }

    /// 挂载、编号范围、有效性依次校验
    fn valid_inode(&self, inumber: u32) -> Result<DiskInode> {
        if !self.is_mounted() {
            return Err(Error::NotMounted);
        }

        let inode = self.inode(inumber)?;
        if !inode.valid {
            return Err(Error::InvalidInode(inumber));
        }
        Ok(inode)
    }

    /// 挂载时标记 inode 引用的块
    fn claim(free_map: &mut FreeMap, block_id: u32) -> Result<()> {
        if block_id as usize >= free_map.len() {
            return Err(Error::Corrupted { block: block_id });
        }
        free_map.mark_busy(block_id);
        Ok(())
    }

    /// 清零并释放一个块
    fn release(&mut self, block_id: u32) -> Result<()> {
        self.write_block(block_id, &[0; BLOCK_SIZE]);
        self.free_map_mut()?.mark_free(block_id);
        log::trace!("released block {block_id}");
        Ok(())
    }

    /// 为文件追加第 `block_index` 个数据块并写入 `chunk`
    fn append_block(
        &mut self,
        inumber: u32,
        inode: &mut DiskInode,
        indirect: &mut Option<IndirectBlock>,
        block_index: usize,
        chunk: &[u8],
    ) -> Result<()> {
        if block_index >= MAX_FILE_BLOCKS {
            return Err(Error::FileTooLarge(inumber));
        }

        // 越过直接索引，先挂上间接索引块，再为数据分配块
        if block_index >= DIRECT_COUNT && indirect.is_none() {
            let indirect_id = self.find_free_block()?;
            let empty = IndirectBlock::new();
            self.write_block(indirect_id, &empty.encode()?);
            self.free_map_mut()?.mark_busy(indirect_id);
            inode.indirect = indirect_id;
            *indirect = Some(empty);
            log::debug!("inode {inumber}: indirect block {indirect_id}");
        }

        let block_id = self.find_free_block()?;
        if block_index < DIRECT_COUNT {
            inode.direct[block_index] = block_id;
        } else if let Some(indirect) = indirect.as_mut() {
            indirect.set(block_index - DIRECT_COUNT, block_id);
            self.write_block(inode.indirect, &indirect.encode()?);
        }

        let mut data_block: DataBlock = [0; BLOCK_SIZE];
        data_block[..chunk.len()].copy_from_slice(chunk);
        self.write_block(block_id, &data_block);
        self.free_map_mut()?.mark_busy(block_id);

        log::trace!("inode {inumber}: logical block {block_index} -> {block_id}");
        Ok(())
    }
}
