#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* eeprom-fs 的整体架构，自上而下 */

// 文件读写层：打开的文件、按字节读写数据链表
mod stream;
pub use stream::{FileHandle, OpenMode};

// 目录与文件层：目录链表、全局文件链表的增删查改
mod dir;
mod file;
pub use dir::{is_valid_dir_name, DirHandle, DirListing};
pub use file::is_valid_file_name;

// 磁盘块管理器层：格式化、挂载、空闲链表
mod efs;
mod free_list;
pub use efs::EepromFileSystem;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;
pub use layout::{DirEntry, FileAttr, FileEntry, Name};

mod block;
mod config;
mod error;
mod path;
pub use block::BlockId;
pub use config::Config;
pub use error::FsError;
pub use path::split_path;

// 磁盘块设备接口层
pub use block_dev::{BlockDevice, DeviceError};

#[cfg(test)]
mod test_util;

pub const BLOCK_SIZE: usize = 64;
/// 数据块中去掉块头后的载荷长度
pub const DATA_SIZE: usize = BLOCK_SIZE - core::mem::size_of::<u16>();
pub const BLOCKS_PER_KB: u16 = (1024 / BLOCK_SIZE) as u16;
