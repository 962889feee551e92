use super::{get_block, put_block, Name, Record};
use crate::BlockId;

/// 目录块：组成双向链表，整个卷只有一层目录。
///
/// 根目录没有磁盘上的记录，用块编号`0`表示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub(crate) this: BlockId,
    pub(crate) next: BlockId,
    pub(crate) prev: BlockId,
    pub(crate) name: Name,
}

impl DirEntry {
    pub(crate) fn new(this: BlockId, next: BlockId, name: Name) -> Self {
        Self {
            this,
            next,
            prev: BlockId::NULL,
            name,
        }
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.this
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Record for DirEntry {
    const SIZE: usize = 6 + super::NAME_CAP;

    fn decode(raw: &[u8]) -> Self {
        Self {
            this: get_block(raw, 0),
            next: get_block(raw, 2),
            prev: get_block(raw, 4),
            name: Name::decode(&raw[6..]),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_block(raw, 0, self.this);
        put_block(raw, 2, self.next);
        put_block(raw, 4, self.prev);
        self.name.encode(&mut raw[6..]);
    }
}
