//! 磁盘数据结构层
//!
//! 每个块都是64字节，块的类型不写在块里，
//! 只取决于是哪条链表引用了它：
//!
//! 主块(#0) | 目录块 | 文件块 | 数据块 | 空闲块 ...
//!
//! 所有字段均为小端序、紧凑排列。
//! 读写时只传输记录本身的长度，而不是整个块。

mod data;
mod dir_entry;
mod file_entry;
mod master;

use core::fmt;
use core::str;

pub use self::{
    data::{DataHeader, FreeBlock, DATA_OFFSET},
    dir_entry::DirEntry,
    file_entry::{FileAttr, FileEntry},
    master::MasterBlock,
};
use crate::BlockId;

/// 名字缓冲区的容量，含结尾的NUL
pub const NAME_CAP: usize = 32;

/// 块内某个偏移处的定长记录
pub trait Record: Sized {
    const SIZE: usize;

    /// `raw`的长度恰为[`Record::SIZE`]
    fn decode(raw: &[u8]) -> Self;

    fn encode(&self, raw: &mut [u8]);
}

#[inline]
fn get_u16(raw: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([raw[offset], raw[offset + 1]])
}

#[inline]
fn put_u16(raw: &mut [u8], offset: usize, value: u16) {
    raw[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_u32(raw: &[u8], offset: usize) -> u32 {
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&raw[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

#[inline]
fn put_u32(raw: &mut [u8], offset: usize, value: u32) {
    raw[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn get_block(raw: &[u8], offset: usize) -> BlockId {
    BlockId::new(get_u16(raw, offset))
}

#[inline]
fn put_block(raw: &mut [u8], offset: usize, id: BlockId) {
    put_u16(raw, offset, id.raw())
}

/// NUL结尾的ASCII名字，最长为`NAME_CAP - 1`字节
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Name([u8; NAME_CAP]);

impl Name {
    /// 名字过长或含有NUL时返回`None`，不做截断
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() >= NAME_CAP || bytes.contains(&0) {
            return None;
        }

        let mut buf = [0; NAME_CAP];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_CAP);
        &self.0[..len]
    }

    /// 磁盘上的脏数据不一定是合法的UTF-8，只取合法的前缀
    pub fn as_str(&self) -> &str {
        let bytes = self.as_bytes();
        match str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.as_bytes() == name.as_bytes()
    }

    fn decode(raw: &[u8]) -> Self {
        let mut buf = [0; NAME_CAP];
        buf.copy_from_slice(&raw[..NAME_CAP]);
        Self(buf)
    }

    fn encode(&self, raw: &mut [u8]) {
        raw[..NAME_CAP].copy_from_slice(&self.0);
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
