use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "file system is not mounted")]
    NotMounted,
    #[display(fmt = "file system is already mounted")]
    AlreadyMounted,
    /// 超级块魔数不符
    #[display(fmt = "invalid format: bad superblock magic")]
    InvalidFormat,
    /// 设备上已有合法的文件系统，且调用方没有强制格式化
    #[display(fmt = "device already holds a file system, refusing to format without force")]
    AlreadyFormatted,
    #[display(fmt = "device too small: {} blocks", blocks)]
    DeviceTooSmall { blocks: usize },
    #[display(fmt = "inode {} is out of range", _0)]
    InodeOutOfRange(u32),
    #[display(fmt = "inode {} is not valid", _0)]
    InvalidInode(u32),
    #[display(fmt = "inode table is full")]
    InodeTableFull,
    #[display(fmt = "disk is full")]
    DiskFull,
    #[display(fmt = "inode {} reached the maximum file size", _0)]
    FileTooLarge(u32),
    /// 元数据中的块编号越出了设备范围
    #[display(fmt = "corrupted metadata: block pointer {} out of range", block)]
    Corrupted { block: u32 },
    #[display(fmt = "malformed on-disk record")]
    Codec,
}

impl core::error::Error for Error {}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::BadMagic { .. } => Self::InvalidFormat,
            err => {
                log::debug!("decode failed: {err}");
                Self::Codec
            }
        }
    }
}
