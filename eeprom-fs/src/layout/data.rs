use core::mem;

use super::{get_block, put_block, Record};
use crate::BlockId;

/// 数据块中有效载荷的起始偏移
pub const DATA_OFFSET: usize = mem::size_of::<u16>();

/// 数据块的块头：文件数据链表的下一块，其后是[`DATA_SIZE`](crate::DATA_SIZE)字节载荷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub next: BlockId,
}

/// 空闲块：只用到头两个字节
///
/// 与[`DataHeader`]的指针位于同一偏移，
/// 所以整条数据链表可以原样挂回空闲链表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub next: BlockId,
}

impl Record for DataHeader {
    const SIZE: usize = DATA_OFFSET;

    fn decode(raw: &[u8]) -> Self {
        Self {
            next: get_block(raw, 0),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_block(raw, 0, self.next)
    }
}

impl Record for FreeBlock {
    const SIZE: usize = DATA_OFFSET;

    fn decode(raw: &[u8]) -> Self {
        Self {
            next: get_block(raw, 0),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_block(raw, 0, self.next)
    }
}
