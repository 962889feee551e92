use enumflags2::{bitflags, BitFlags};

use super::{get_block, get_u32, put_block, put_u32, Name, Record, NAME_CAP};
use crate::BlockId;

/// 文件块
///
/// 所有文件共用一条全局的双向链表，
/// 属于哪个目录只看`parent`，扫描时再筛选。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub(crate) this: BlockId,
    pub(crate) next: BlockId,
    pub(crate) prev: BlockId,
    /// 所在目录，根目录为`0`
    pub(crate) parent: BlockId,
    /// 文件的字节数
    pub(crate) size: u32,
    /// 保留，从不维护
    pub(crate) num_data_blocks: u32,
    pub(crate) first_data: BlockId,
    pub(crate) last_data: BlockId,
    /// 属性字节原样保留，未定义的位也不丢弃
    pub(crate) attr_bits: u8,
    pub(crate) name: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum FileAttr {
    /// 不能以写或追加方式打开，也不能被清空或删除
    ReadOnly = 0b0000_0001,
    Hidden = 0b0000_0010,
    System = 0b0000_0100,
    Archive = 0b0010_0000,
}

impl FileEntry {
    /// 新建的空文件，没有数据块
    pub(crate) fn new(this: BlockId, next: BlockId, parent: BlockId, name: Name) -> Self {
        Self {
            this,
            next,
            prev: BlockId::NULL,
            parent,
            size: 0,
            num_data_blocks: 0,
            first_data: BlockId::NULL,
            last_data: BlockId::NULL,
            attr_bits: 0,
            name,
        }
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.this
    }

    #[inline]
    pub fn parent(&self) -> BlockId {
        self.parent
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn first_data_block(&self) -> BlockId {
        self.first_data
    }

    #[inline]
    pub fn last_data_block(&self) -> BlockId {
        self.last_data
    }

    #[inline]
    pub fn attributes(&self) -> BitFlags<FileAttr> {
        BitFlags::from_bits_truncate(self.attr_bits)
    }

    /// 只改写已定义的属性位
    pub(crate) fn set_attributes(&mut self, attributes: BitFlags<FileAttr>) {
        let known = BitFlags::<FileAttr>::all().bits();
        self.attr_bits = (self.attr_bits & !known) | attributes.bits();
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.attributes().contains(FileAttr::ReadOnly)
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Record for FileEntry {
    const SIZE: usize = 21 + NAME_CAP;

    fn decode(raw: &[u8]) -> Self {
        Self {
            this: get_block(raw, 0),
            next: get_block(raw, 2),
            prev: get_block(raw, 4),
            parent: get_block(raw, 6),
            size: get_u32(raw, 8),
            num_data_blocks: get_u32(raw, 12),
            first_data: get_block(raw, 16),
            last_data: get_block(raw, 18),
            attr_bits: raw[20],
            name: Name::decode(&raw[21..]),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_block(raw, 0, self.this);
        put_block(raw, 2, self.next);
        put_block(raw, 4, self.prev);
        put_block(raw, 6, self.parent);
        put_u32(raw, 8, self.size);
        put_u32(raw, 12, self.num_data_blocks);
        put_block(raw, 16, self.first_data);
        put_block(raw, 18, self.last_data);
        raw[20] = self.attr_bits;
        self.name.encode(&mut raw[21..]);
    }
}
