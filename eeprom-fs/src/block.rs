use derive_more::{Display, From, Into};

use crate::BLOCK_SIZE;

/// 块编号，从1开始计数，`0`表示空引用。
///
/// 0号块恒为主块，所以任何链表都不会以它为节点。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[display(fmt = "#{}", _0)]
#[repr(transparent)]
pub struct BlockId(u16);

impl BlockId {
    /// 链表的结束标志
    pub const NULL: Self = Self(0);

    /// 主块所在的位置
    pub const MASTER: Self = Self(0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// 空引用时返回`None`，便于`while let`遍历链表
    #[inline]
    pub const fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// 块在设备上的字节地址
    #[inline]
    pub const fn addr(self) -> usize {
        self.0 as usize * BLOCK_SIZE
    }
}
