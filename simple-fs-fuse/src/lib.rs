
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use block_dev::BlockDevice;
use send_wrapper::SendWrapper;
use simple_fs::{BLOCK_SIZE, SimpleFileSystem, SuperBlock};

/// 以宿主机文件作为磁盘镜像的块设备，块数由文件长度决定
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    blocks: usize,
}

impl BlockFile {
    pub fn new(fd: File) -> io::Result<Self> {
        let len = fd.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            log::warn!("image size {len} is not a multiple of {BLOCK_SIZE}, ignoring the tail");
        }

        Ok(Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            blocks: (len / BLOCK_SIZE as u64) as usize,
        })
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.read_exact(buf).expect("not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        file.write_all(buf).expect("not a complete block!");
    }

    fn num_blocks(&self) -> usize {
        self.blocks
    }
}

/// 把镜像调整为 `disk_size` 字节后格式化。
///
/// 镜像上已有文件系统且未指定 `force` 时，先交给 `confirm` 决定是否覆盖；
/// 拒绝覆盖则镜像的长度与内容都不变，返回 `None`。
pub fn format_image(
    fd: File,
    disk_size: u64,
    force: bool,
    confirm: impl FnOnce(&SuperBlock) -> io::Result<bool>,
) -> io::Result<Option<SuperBlock>> {
    let current = SimpleFileSystem::new(Arc::new(BlockFile::new(fd.try_clone()?)?));
    match current.stored_super_block() {
        Some(old) if !force && !confirm(&old)? => {
            log::info!("keeping existing file system ({} blocks)", old.total_blocks);
            return Ok(None);
        }
        _ => {}
    }

    fd.set_len(disk_size)?;
    let mut fs = SimpleFileSystem::new(Arc::new(BlockFile::new(fd)?));
    // 是否覆盖已在调整长度之前确认过
    fs.format(true).map(Some).map_err(io::Error::other)
}
