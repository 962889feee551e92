//! # 磁盘块管理器层
//!
//! 构建出卷的布局并使用：主块的读写、按块编号读写记录与载荷。
//! 每次访问都只在栈上开一个块大小的缓冲区，不存在共享的暂存块。

use alloc::sync::Arc;
use core::fmt::Debug;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::layout::{FreeBlock, MasterBlock, Record, DATA_OFFSET};
use crate::{BlockId, Config, FsError, BLOCKS_PER_KB, BLOCK_SIZE, DATA_SIZE};

#[derive(Debug)]
pub struct EepromFileSystem {
    block_device: Arc<dyn BlockDevice>,
    pub(crate) master: MasterBlock,
    config: Config,
}

impl EepromFileSystem {
    /// 格式化设备，容量以KB计，每KB有16块。
    ///
    /// 会覆盖整个卷，只应在首次使用前调用。
    pub fn format(
        block_device: Arc<dyn BlockDevice>,
        capacity_kb: u16,
        config: Config,
    ) -> Result<Self, FsError> {
        if config.read_only {
            log::warn!("format rejected: read-only");
            return Err(FsError::AccessDenied);
        }

        let total_blocks = capacity_kb
            .checked_mul(BLOCKS_PER_KB)
            .filter(|&total| total >= 2)
            .ok_or(FsError::InvalidCapacity)?;

        let efs = Self {
            block_device,
            master: MasterBlock::new(total_blocks),
            config,
        };
        efs.save_master()?;

        // 串起除主块外的所有块
        let last = total_blocks - 1;
        for raw in 1..=last {
            let next = if raw == last {
                BlockId::NULL
            } else {
                BlockId::new(raw + 1)
            };
            efs.write_record(BlockId::new(raw), &FreeBlock { next })?;
        }

        log::debug!("formatted {capacity_kb}KB volume, {total_blocks} blocks");
        Ok(efs)
    }

    /// 加载已格式化的卷
    pub fn mount(block_device: Arc<dyn BlockDevice>, config: Config) -> Result<Self, FsError> {
        let mut efs = Self {
            block_device,
            master: MasterBlock::new(0),
            config,
        };
        efs.master = efs.read_record(BlockId::MASTER)?;

        if !efs.master.is_valid() {
            log::warn!("bad master block: {:?}", efs.master);
            return Err(FsError::NotFormatted);
        }

        log::debug!(
            "mounted volume: {}/{} blocks used",
            efs.master.used_blocks,
            efs.master.total_blocks
        );
        Ok(efs)
    }

    /// 引擎不可重入，多个任务共用时必须在外面串行化
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    #[inline]
    pub fn total_blocks(&self) -> u16 {
        self.master.total_blocks
    }

    #[inline]
    pub fn used_blocks(&self) -> u16 {
        self.master.used_blocks
    }

    #[inline]
    pub fn free_blocks(&self) -> u16 {
        self.master.free_blocks()
    }
}

impl EepromFileSystem {
    /// 只读配置下拒绝一切修改，且不触碰设备
    pub(crate) fn check_writable(&self) -> Result<(), FsError> {
        if self.config.read_only {
            log::warn!("write access rejected: read-only");
            return Err(FsError::AccessDenied);
        }
        Ok(())
    }

    pub(crate) fn save_master(&self) -> Result<(), FsError> {
        self.write_record(BlockId::MASTER, &self.master)
    }

    /// 以`R`的视角读取块首的记录，只传输`R::SIZE`字节
    pub(crate) fn read_record<R: Record + Debug>(&self, id: BlockId) -> Result<R, FsError> {
        let mut buf = [0; BLOCK_SIZE];
        let raw = &mut buf[..R::SIZE];
        self.block_device.read_at(id.addr(), raw)?;
        let record = R::decode(raw);

        if self.config.trace {
            log::trace!("R {id}: {record:?}");
        }
        Ok(record)
    }

    pub(crate) fn write_record<R: Record + Debug>(
        &self,
        id: BlockId,
        record: &R,
    ) -> Result<(), FsError> {
        let mut buf = [0; BLOCK_SIZE];
        let raw = &mut buf[..R::SIZE];
        record.encode(raw);

        if self.config.trace {
            log::trace!("W {id}: {record:?}");
        }
        self.block_device.write_at(id.addr(), raw)?;
        Ok(())
    }

    /// 读取数据块载荷中`offset`处的字节
    pub(crate) fn read_payload(
        &self,
        id: BlockId,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<(), FsError> {
        debug_assert!(offset + buf.len() <= DATA_SIZE);
        if buf.is_empty() {
            return Ok(());
        }
        self.block_device
            .read_at(id.addr() + DATA_OFFSET + offset, buf)?;
        Ok(())
    }

    pub(crate) fn write_payload(&self, id: BlockId, offset: usize, buf: &[u8]) -> Result<(), FsError> {
        debug_assert!(offset + buf.len() <= DATA_SIZE);
        if buf.is_empty() {
            return Ok(());
        }
        self.block_device
            .write_at(id.addr() + DATA_OFFSET + offset, buf)?;
        Ok(())
    }

    /// 遍历链表的步数上限，超出说明链表成环
    pub(crate) fn chain_guard(&self) -> ChainGuard {
        ChainGuard::new(self.master.total_blocks as usize)
    }
}

/// 链表遍历计步器
#[derive(Debug, Clone)]
pub(crate) struct ChainGuard {
    left: usize,
}

impl ChainGuard {
    pub fn new(limit: usize) -> Self {
        Self { left: limit }
    }

    pub fn step(&mut self) -> Result<(), FsError> {
        if self.left == 0 {
            log::warn!("chain walk exceeded the volume size");
            return Err(FsError::Corrupted);
        }
        self.left -= 1;
        Ok(())
    }
}
