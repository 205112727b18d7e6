//! # 调试层
//!
//! 只读地导出超级块与每个有效 inode 的块分布，不要求挂载。

use alloc::vec::Vec;
use core::fmt;

use crate::layout::SuperBlock;
use crate::{INODES_PER_BLOCK, Result, SimpleFileSystem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub super_block: SuperBlock,
    /// 只包含有效的 inode，按编号升序
    pub inodes: Vec<InodeReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeReport {
    pub inumber: u32,
    pub size: u32,
    /// 非零的直接索引
    pub direct: Vec<u32>,
    /// 间接索引块编号及其中非零的块编号
    pub indirect: Option<(u32, Vec<u32>)>,
}

impl SimpleFileSystem {
    /// 魔数不符时立即返回 [`Error::InvalidFormat`](crate::Error::InvalidFormat)
    pub fn debug(&self) -> Result<Report> {
        let super_block = self.super_block()?;

        let mut inodes = Vec::new();
        for block_index in 0..super_block.inode_blocks {
            for (slot, inode) in self.inode_block(block_index)?.into_iter().enumerate() {
                if !inode.valid {
                    continue;
                }

                let indirect = if inode.has_indirect() {
                    let pointers = self.load_indirect(inode.indirect)?.used().collect();
                    Some((inode.indirect, pointers))
                } else {
                    None
                };

                inodes.push(InodeReport {
                    inumber: block_index * INODES_PER_BLOCK as u32 + slot as u32,
                    size: inode.size,
                    direct: inode.direct_blocks().collect(),
                    indirect,
                });
            }
        }

        Ok(Report {
            super_block,
            inodes,
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sb = &self.super_block;
        writeln!(f, "superblock:")?;
        writeln!(f, "    magic number is valid")?;
        writeln!(f, "    {} blocks on disk", sb.total_blocks)?;
        writeln!(f, "    {} inode blocks", sb.inode_blocks)?;
        writeln!(f, "    {} inodes total", sb.inode_capacity)?;

        for inode in &self.inodes {
            write!(f, "{inode}")?;
        }
        Ok(())
    }
}

impl fmt::Display for InodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn blocks(f: &mut fmt::Formatter<'_>, blocks: &[u32]) -> fmt::Result {
            for block in blocks {
                write!(f, " {block}")?;
            }
            writeln!(f)
        }

        writeln!(f, "inode {}:", self.inumber)?;
        writeln!(f, "    size: {} bytes", self.size)?;
        write!(f, "    direct blocks:")?;
        blocks(f, &self.direct)?;

        if let Some((indirect, pointers)) = &self.indirect {
            writeln!(f, "    indirect block: {indirect}")?;
            write!(f, "    indirect data blocks:")?;
            blocks(f, pointers)?;
        }
        Ok(())
    }
}
