//! 文件
//!
//! 全卷的文件块同在一条双向链表上，新文件插在表头；
//! 按目录查找时沿链表扫描并比对`parent`。

use enumflags2::BitFlags;

use crate::layout::{FileAttr, FileEntry, Name, NAME_CAP};
use crate::{BlockId, DirHandle, EepromFileSystem, FsError};

/// 文件名不能为空，不能含`/`，且要放得进名字缓冲区
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty() && name.len() < NAME_CAP && !name.contains(['/', '\0'])
}

pub(crate) fn file_name(name: &str) -> Result<Name, FsError> {
    if !is_valid_file_name(name) {
        return Err(FsError::InvalidFileName);
    }
    Name::new(name).ok_or(FsError::InvalidFileName)
}

impl EepromFileSystem {
    pub(crate) fn find_entry(
        &self,
        parent: BlockId,
        name: &str,
    ) -> Result<Option<FileEntry>, FsError> {
        let mut guard = self.chain_guard();
        let mut next = self.master.first_file;
        while let Some(block) = next.non_null() {
            guard.step()?;
            let file: FileEntry = self.read_record(block)?;
            if file.parent == parent && file.name.matches(name) {
                return Ok(Some(file));
            }
            next = file.next;
        }
        Ok(None)
    }

    pub fn find_file(&self, dir: &DirHandle, name: &str) -> Result<FileEntry, FsError> {
        if !dir.is_open() {
            return Err(FsError::InvalidHandle);
        }
        self.find_entry(dir.block(), name)?.ok_or(FsError::NotFound)
    }

    /// 在目录中新建空文件，同名文件已存在则报错
    pub fn create_file(&mut self, dir: &DirHandle, name: &str) -> Result<FileEntry, FsError> {
        self.check_writable()?;
        if !dir.is_open() {
            return Err(FsError::InvalidHandle);
        }
        let name = file_name(name)?;
        if self.find_entry(dir.block(), name.as_str())?.is_some() {
            return Err(FsError::DuplicatedFileName);
        }
        self.create_entry(dir.block(), name)
    }

    /// 分配文件块并插到文件链表表头，返回写入后重新读出的记录
    pub(crate) fn create_entry(&mut self, parent: BlockId, name: Name) -> Result<FileEntry, FsError> {
        let block = self.alloc_block()?;
        let old_head = self.master.first_file;
        if let Some(head) = old_head.non_null() {
            let mut file: FileEntry = self.read_record(head)?;
            file.prev = block;
            self.write_record(head, &file)?;
        }
        self.master.first_file = block;
        self.save_master()?;

        self.write_record(block, &FileEntry::new(block, old_head, parent, name))?;
        log::debug!("created file {name} in {parent} at {block}");

        self.read_record(block)
    }

    /// 释放文件的全部数据块，大小归零
    pub(crate) fn truncate_entry(&mut self, entry: &mut FileEntry) -> Result<(), FsError> {
        self.release_chain(entry.first_data)?;

        entry.size = 0;
        entry.num_data_blocks = 0;
        entry.first_data = BlockId::NULL;
        entry.last_data = BlockId::NULL;
        self.write_record(entry.this, entry)?;

        log::debug!("truncated file {} at {}", entry.name, entry.this);
        Ok(())
    }

    /// 释放数据、摘出文件链表、归还文件块
    pub(crate) fn erase_entry(&mut self, mut entry: FileEntry) -> Result<(), FsError> {
        self.truncate_entry(&mut entry)?;

        if let Some(prev) = entry.prev.non_null() {
            let mut prev_file: FileEntry = self.read_record(prev)?;
            prev_file.next = entry.next;
            self.write_record(prev, &prev_file)?;
        } else {
            self.master.first_file = entry.next;
            self.save_master()?;
        }
        if let Some(next) = entry.next.non_null() {
            let mut next_file: FileEntry = self.read_record(next)?;
            next_file.prev = entry.prev;
            self.write_record(next, &next_file)?;
        }

        self.release_block(entry.this)?;
        log::debug!("erased file {} at {}", entry.name, entry.this);
        Ok(())
    }

    pub fn erase(&mut self, dir: &DirHandle, name: &str) -> Result<(), FsError> {
        self.check_writable()?;
        let entry = self.find_file(dir, name)?;
        if entry.is_read_only() {
            return Err(FsError::AccessDenied);
        }
        self.erase_entry(entry)
    }

    pub fn set_attributes(
        &mut self,
        dir: &DirHandle,
        name: &str,
        attributes: BitFlags<FileAttr>,
    ) -> Result<(), FsError> {
        self.check_writable()?;
        let mut entry = self.find_file(dir, name)?;
        entry.set_attributes(attributes);
        self.write_record(entry.this, &entry)
    }
}
