//! 目录
//!
//! 目录块组成一条双向链表，新目录插在表头。
//! 命名空间是平的：目录名以`/`开头，目录里只能放文件。

use crate::efs::ChainGuard;
use crate::layout::{DirEntry, FileEntry, Name, NAME_CAP};
use crate::{BlockId, EepromFileSystem, FsError};

/// 打开的目录。
///
/// 根目录没有目录块，`block`为`0`，
/// 所以是否已关闭要单独记录。
#[derive(Debug, Clone)]
pub struct DirHandle {
    block: BlockId,
    /// 枚举文件时在全局文件链表上的游标
    next_file: BlockId,
    guard: ChainGuard,
    open: bool,
}

impl DirHandle {
    fn new(block: BlockId, first_file: BlockId, guard: ChainGuard) -> Self {
        Self {
            block,
            next_file: first_file,
            guard,
            open: true,
        }
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.block.is_null()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn check_open(&self) -> Result<(), FsError> {
        if self.open {
            Ok(())
        } else {
            Err(FsError::InvalidHandle)
        }
    }
}

/// 枚举目录链表的游标
#[derive(Debug, Clone)]
pub struct DirListing {
    next: BlockId,
    guard: ChainGuard,
}

/// 目录名必须以`/`开头，不能只有`/`（根目录不可显式命名），
/// 其后不能再出现`/`，且要放得进名字缓冲区。
pub fn is_valid_dir_name(name: &str) -> bool {
    name.len() > 1
        && name.len() < NAME_CAP
        && name.starts_with('/')
        && !name[1..].contains(['/', '\0'])
}

impl EepromFileSystem {
    pub(crate) fn find_dir_block(&self, name: &str) -> Result<Option<BlockId>, FsError> {
        let mut guard = self.chain_guard();
        let mut next = self.master.first_dir;
        while let Some(block) = next.non_null() {
            guard.step()?;
            let dir: DirEntry = self.read_record(block)?;
            if dir.name.matches(name) {
                return Ok(Some(block));
            }
            next = dir.next;
        }
        Ok(None)
    }

    pub fn dir_exists(&self, name: &str) -> Result<bool, FsError> {
        self.find_dir_block(name).map(|block| block.is_some())
    }

    pub fn create_dir(&mut self, name: &str) -> Result<(), FsError> {
        self.check_writable()?;
        if !is_valid_dir_name(name) {
            return Err(FsError::InvalidFileName);
        }
        let dir_name = Name::new(name).ok_or(FsError::InvalidFileName)?;
        if self.find_dir_block(name)?.is_some() {
            return Err(FsError::DuplicatedFileName);
        }

        let block = self.alloc_block()?;
        let old_head = self.master.first_dir;
        if let Some(head) = old_head.non_null() {
            let mut dir: DirEntry = self.read_record(head)?;
            dir.prev = block;
            self.write_record(head, &dir)?;
        }
        self.master.first_dir = block;
        self.save_master()?;

        self.write_record(block, &DirEntry::new(block, old_head, dir_name))?;

        log::debug!("created directory {name} at {block}");
        Ok(())
    }

    /// `/`对应根目录，总是存在
    pub fn open_dir(&self, name: &str) -> Result<DirHandle, FsError> {
        if name.is_empty() {
            return Err(FsError::InvalidFileName);
        }

        let block = if name == "/" {
            BlockId::NULL
        } else {
            self.find_dir_block(name)?.ok_or(FsError::NotFound)?
        };

        Ok(DirHandle::new(
            block,
            self.master.first_file,
            self.chain_guard(),
        ))
    }

    pub fn close_dir(&self, dir: &mut DirHandle) -> Result<(), FsError> {
        dir.block = BlockId::NULL;
        dir.next_file = BlockId::NULL;
        dir.open = false;
        Ok(())
    }

    pub fn rename_dir(&mut self, dir: &DirHandle, new_name: &str) -> Result<(), FsError> {
        self.check_writable()?;
        dir.check_open()?;
        if dir.is_root() {
            return Err(FsError::AccessDenied);
        }
        if !is_valid_dir_name(new_name) {
            return Err(FsError::InvalidFileName);
        }
        let name = Name::new(new_name).ok_or(FsError::InvalidFileName)?;
        if self.find_dir_block(new_name)?.is_some() {
            return Err(FsError::DuplicatedFileName);
        }

        let mut entry: DirEntry = self.read_record(dir.block)?;
        log::debug!("rename directory {} to {new_name}", entry.name);
        entry.name = name;
        self.write_record(dir.block, &entry)
    }

    /// 删除目录及其中的全部文件，成功后句柄被关闭
    pub fn delete_dir(&mut self, dir: &mut DirHandle) -> Result<(), FsError> {
        self.check_writable()?;
        dir.check_open()?;
        if dir.is_root() {
            return Err(FsError::AccessDenied);
        }

        // 先删掉目录中的文件，文件的只读属性不影响级联删除
        let mut guard = self.chain_guard();
        let mut next = self.master.first_file;
        while let Some(block) = next.non_null() {
            guard.step()?;
            let file: FileEntry = self.read_record(block)?;
            next = file.next;
            if file.parent == dir.block {
                self.erase_entry(file)?;
            }
        }

        let entry: DirEntry = self.read_record(dir.block)?;
        if let Some(prev) = entry.prev.non_null() {
            let mut prev_dir: DirEntry = self.read_record(prev)?;
            prev_dir.next = entry.next;
            self.write_record(prev, &prev_dir)?;
        } else {
            self.master.first_dir = entry.next;
            self.save_master()?;
        }
        if let Some(next) = entry.next.non_null() {
            let mut next_dir: DirEntry = self.read_record(next)?;
            next_dir.prev = entry.prev;
            self.write_record(next, &next_dir)?;
        }

        self.release_block(dir.block)?;
        log::debug!("deleted directory {} at {}", entry.name, dir.block);

        self.close_dir(dir)
    }

    pub fn delete_dir_by_name(&mut self, name: &str) -> Result<(), FsError> {
        self.check_writable()?;
        let mut dir = self.open_dir(name)?;
        self.delete_dir(&mut dir)
    }

    pub fn find_first_dir(&self) -> DirListing {
        DirListing {
            next: self.master.first_dir,
            guard: self.chain_guard(),
        }
    }

    /// 没有更多目录时返回[`FsError::NotFound`]
    pub fn find_next_dir(&self, listing: &mut DirListing) -> Result<DirEntry, FsError> {
        let block = listing.next.non_null().ok_or(FsError::NotFound)?;
        listing.guard.step()?;
        let dir: DirEntry = self.read_record(block)?;
        listing.next = dir.next;
        Ok(dir)
    }

    /// 重置目录句柄上的文件游标
    pub fn find_first_file(&self, dir: &mut DirHandle) -> Result<(), FsError> {
        dir.check_open()?;
        dir.next_file = self.master.first_file;
        dir.guard = self.chain_guard();
        Ok(())
    }

    /// 沿全局文件链表找下一个属于该目录的文件，
    /// 没有更多文件时返回[`FsError::NotFound`]
    pub fn find_next_file(&self, dir: &mut DirHandle) -> Result<FileEntry, FsError> {
        dir.check_open()?;
        while let Some(block) = dir.next_file.non_null() {
            dir.guard.step()?;
            let file: FileEntry = self.read_record(block)?;
            dir.next_file = file.next;
            if file.parent == dir.block {
                return Ok(file);
            }
        }
        Err(FsError::NotFound)
    }
}
