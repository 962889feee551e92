use super::{get_block, get_u16, put_block, put_u16, Record};
use crate::BlockId;

/// # 主块
///
/// 位于#0块，记录卷的容量与三条链表的表头，
/// 每次结构性修改后都要立即写回。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterBlock {
    /// 卷的总块数（含主块）
    pub total_blocks: u16,
    /// 已占用的块数（含主块）
    pub used_blocks: u16,
    /// 保留，从不维护
    pub first_used: BlockId,
    /// 保留，从不维护
    pub last_used: BlockId,
    /// 空闲链表表头
    pub first_free: BlockId,
    /// 保留，从不维护
    pub last_free: BlockId,
    /// 文件链表表头
    pub first_file: BlockId,
    /// 目录链表表头
    pub first_dir: BlockId,
}

impl MasterBlock {
    /// 刚格式化的卷：除主块外全部空闲，空闲链表从#1开始
    pub fn new(total_blocks: u16) -> Self {
        Self {
            total_blocks,
            used_blocks: 1,
            first_used: BlockId::NULL,
            last_used: BlockId::NULL,
            first_free: BlockId::new(1),
            last_free: BlockId::NULL,
            first_file: BlockId::NULL,
            first_dir: BlockId::NULL,
        }
    }

    /// 未格式化的EEPROM通常全为`0x00`或`0xFF`，两者都过不了这一关
    pub fn is_valid(&self) -> bool {
        let in_volume = |id: BlockId| id.raw() < self.total_blocks;

        self.total_blocks >= 2
            && (1..=self.total_blocks).contains(&self.used_blocks)
            && in_volume(self.first_free)
            && in_volume(self.first_file)
            && in_volume(self.first_dir)
    }

    #[inline]
    pub fn free_blocks(&self) -> u16 {
        self.total_blocks.saturating_sub(self.used_blocks)
    }
}

impl Record for MasterBlock {
    const SIZE: usize = 16;

    fn decode(raw: &[u8]) -> Self {
        Self {
            total_blocks: get_u16(raw, 0),
            used_blocks: get_u16(raw, 2),
            first_used: get_block(raw, 4),
            last_used: get_block(raw, 6),
            first_free: get_block(raw, 8),
            last_free: get_block(raw, 10),
            first_file: get_block(raw, 12),
            first_dir: get_block(raw, 14),
        }
    }

    fn encode(&self, raw: &mut [u8]) {
        put_u16(raw, 0, self.total_blocks);
        put_u16(raw, 2, self.used_blocks);
        put_block(raw, 4, self.first_used);
        put_block(raw, 6, self.last_used);
        put_block(raw, 8, self.first_free);
        put_block(raw, 10, self.last_free);
        put_block(raw, 12, self.first_file);
        put_block(raw, 14, self.first_dir);
    }
}
