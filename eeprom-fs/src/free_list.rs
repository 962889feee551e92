//! 空闲链表
//!
//! 单向链表穿过所有未使用的块，表头在主块中。
//! 分配总是取表头，单块回收总是压回表头（后进先出）。

use crate::layout::FreeBlock;
use crate::{BlockId, EepromFileSystem, FsError};

impl EepromFileSystem {
    /// 取出空闲链表的表头，链表为空即磁盘已满
    pub(crate) fn alloc_block(&mut self) -> Result<BlockId, FsError> {
        let Some(block) = self.master.first_free.non_null() else {
            log::debug!("no free block left");
            return Err(FsError::DiskFull);
        };

        let free: FreeBlock = self.read_record(block)?;
        self.master.first_free = free.next;
        self.master.used_blocks += 1;
        self.save_master()?;

        Ok(block)
    }

    /// 将一个块压回空闲链表，`0`号块直接忽略
    pub(crate) fn release_block(&mut self, block: BlockId) -> Result<(), FsError> {
        if block.is_null() {
            return Ok(());
        }

        self.write_record(
            block,
            &FreeBlock {
                next: self.master.first_free,
            },
        )?;
        self.master.first_free = block;
        self.master.used_blocks = self.master.used_blocks.saturating_sub(1);
        self.save_master()
    }

    /// 将以`first`开头的整条链表挂回空闲链表。
    ///
    /// 数据块的后继指针与空闲块的位于同一偏移，所以按空闲块读取即可；
    /// 无论链表多长，主块只写回一次。
    pub(crate) fn release_chain(&mut self, first: BlockId) -> Result<(), FsError> {
        if first.is_null() {
            return Ok(());
        }

        let mut guard = self.chain_guard();
        let mut last = first;
        let mut count: u16 = 0;
        loop {
            guard.step()?;
            count += 1;
            let node: FreeBlock = self.read_record(last)?;
            match node.next.non_null() {
                Some(next) => last = next,
                None => break,
            }
        }

        if count == 1 {
            return self.release_block(first);
        }

        // 链尾接上旧表头，链首成为新表头
        self.write_record(
            last,
            &FreeBlock {
                next: self.master.first_free,
            },
        )?;
        self.master.first_free = first;
        self.master.used_blocks = self.master.used_blocks.saturating_sub(count);
        self.save_master()?;

        log::debug!("released chain {first}..={last} ({count} blocks)");
        Ok(())
    }

    /// 空闲链表的全部节点，按链表顺序
    #[cfg(test)]
    pub(crate) fn free_chain(&self) -> Result<alloc::vec::Vec<BlockId>, FsError> {
        let mut guard = self.chain_guard();
        let mut chain = alloc::vec::Vec::new();
        let mut next = self.master.first_free;
        while let Some(block) = next.non_null() {
            guard.step()?;
            chain.push(block);
            next = self.read_record::<FreeBlock>(block)?.next;
        }
        Ok(chain)
    }
}
