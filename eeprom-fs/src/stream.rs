//! 打开的文件：按字节读写数据链表
//!
//! 游标只缓存几个标量，真正的数据都在设备上：
//! `next_data`是当前位置所在的数据块，`position_in_block`是块内偏移。
//! 恰好停在块边界的文件末尾时`next_data`为`0`，下一次写入再追加新块。

use crate::file::file_name;
use crate::layout::{DataHeader, FileEntry};
use crate::{BlockId, DirHandle, EepromFileSystem, FsError, DATA_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// 文件必须已存在
    Read,
    /// 不存在则新建，已存在则清空
    Write,
    /// 不存在则新建，游标置于末尾
    Append,
}

#[derive(Debug, Clone)]
pub struct FileHandle {
    /// 文件块，关闭后为`0`
    block: BlockId,
    mode: OpenMode,
    first_data: BlockId,
    next_data: BlockId,
    position_in_block: usize,
    position: u32,
    size: u32,
}

impl FileHandle {
    fn new(entry: &FileEntry, mode: OpenMode) -> Self {
        Self {
            block: entry.this,
            mode,
            first_data: entry.first_data,
            next_data: entry.first_data,
            position_in_block: 0,
            position: 0,
            size: entry.size,
        }
    }

    #[inline]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.block.is_null()
    }

    fn check_open(&self) -> Result<(), FsError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::InvalidHandle)
        }
    }
}

impl EepromFileSystem {
    /// 打开目录中的文件，写和追加方式会在文件不存在时新建
    pub fn open(&mut self, dir: &DirHandle, name: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        if mode != OpenMode::Read {
            self.check_writable()?;
        }
        if !dir.is_open() {
            return Err(FsError::InvalidHandle);
        }
        let name = file_name(name)?;

        let entry = match (self.find_entry(dir.block(), name.as_str())?, mode) {
            (None, OpenMode::Read) => return Err(FsError::NotFound),
            (Some(entry), OpenMode::Read) => entry,
            (Some(entry), _) if entry.is_read_only() => return Err(FsError::AccessDenied),
            (Some(mut entry), OpenMode::Write) => {
                self.truncate_entry(&mut entry)?;
                entry
            }
            (Some(entry), OpenMode::Append) => entry,
            (None, _) => self.create_entry(dir.block(), name)?,
        };

        let mut file = FileHandle::new(&entry, mode);
        let start = match mode {
            OpenMode::Append => entry.size,
            _ => 0,
        };
        self.seek(&mut file, start)?;

        log::debug!("opened {} ({} bytes) for {mode:?}", entry.name, entry.size);
        Ok(file)
    }

    /// 从头沿数据链表走到`pos`，可以停在文件末尾，不能越过
    pub fn seek(&self, file: &mut FileHandle, pos: u32) -> Result<(), FsError> {
        file.check_open()?;
        if pos > file.size {
            return Err(FsError::InvalidSeek);
        }

        let mut guard = self.chain_guard();
        let mut block = file.first_data;
        let mut remaining = pos as usize;
        while remaining >= DATA_SIZE {
            // 链表比文件大小短，文件已损坏
            let current = block.non_null().ok_or(FsError::AccessDenied)?;
            guard.step()?;
            block = self.read_record::<DataHeader>(current)?.next;
            remaining -= DATA_SIZE;
        }
        if remaining > 0 && block.is_null() {
            return Err(FsError::AccessDenied);
        }

        file.position = pos;
        file.next_data = block;
        file.position_in_block = remaining;
        self.trace_cursor("seek", file);
        Ok(())
    }

    /// 读满`buf`或读到文件末尾，返回读到的字节数。
    ///
    /// 已在末尾时返回[`FsError::EndOfFile`]。
    pub fn read(&self, file: &mut FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        self.read_bytes(file, buf, None)
    }

    /// 与[`read`](Self::read)相同，但读到`delimiter`（含）即停止
    pub fn read_until(
        &self,
        file: &mut FileHandle,
        buf: &mut [u8],
        delimiter: u8,
    ) -> Result<usize, FsError> {
        self.read_bytes(file, buf, Some(delimiter))
    }

    fn read_bytes(
        &self,
        file: &mut FileHandle,
        buf: &mut [u8],
        delimiter: Option<u8>,
    ) -> Result<usize, FsError> {
        file.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut done = 0;
        while done < buf.len() {
            let left_in_file = file.size.saturating_sub(file.position) as usize;
            let Some(block) = file.next_data.non_null() else {
                break;
            };
            if left_in_file == 0 {
                break;
            }

            let len = (buf.len() - done)
                .min(DATA_SIZE - file.position_in_block)
                .min(left_in_file);
            let mut chunk = [0; DATA_SIZE];
            let chunk = &mut chunk[..len];
            self.read_payload(block, file.position_in_block, chunk)?;

            let (len, hit) = match delimiter.and_then(|d| chunk.iter().position(|&b| b == d)) {
                Some(i) => (i + 1, true),
                None => (len, false),
            };
            buf[done..done + len].copy_from_slice(&chunk[..len]);
            done += len;
            self.advance(file, block, len)?;

            if hit {
                break;
            }
        }

        self.trace_cursor("read", file);
        if done == 0 {
            return Err(FsError::EndOfFile);
        }
        Ok(done)
    }

    /// 从游标处写入`buf`，按需追加数据块，返回写入的字节数。
    ///
    /// 空间不足时已写入的部分仍然有效：游标与文件大小都会更新，
    /// 然后返回[`FsError::DiskFull`]。此时写入的字节数即调用前后
    /// [`FileHandle::position`]之差。
    pub fn write(&mut self, file: &mut FileHandle, buf: &[u8]) -> Result<usize, FsError> {
        self.check_writable()?;
        file.check_open()?;
        if file.mode == OpenMode::Read {
            return Err(FsError::AccessDenied);
        }

        let mut done = 0;
        let result = self.write_bytes(file, buf, &mut done);

        // 文件大小每次调用只写回一次
        if file.position > file.size {
            let mut entry: FileEntry = self.read_record(file.block)?;
            entry.size = file.position;
            self.write_record(file.block, &entry)?;
            file.size = file.position;
        }

        self.trace_cursor("write", file);
        result.map(|()| done)
    }

    fn write_bytes(
        &mut self,
        file: &mut FileHandle,
        buf: &[u8],
        done: &mut usize,
    ) -> Result<(), FsError> {
        while *done < buf.len() {
            let block = match file.next_data.non_null() {
                Some(block) => block,
                None => self.append_data_block(file)?,
            };

            let len = (buf.len() - *done).min(DATA_SIZE - file.position_in_block);
            self.write_payload(block, file.position_in_block, &buf[*done..*done + len])?;
            *done += len;
            self.advance(file, block, len)?;
        }
        Ok(())
    }

    /// 在文件的数据链表末尾接上一个新块，并让游标指向它
    fn append_data_block(&mut self, file: &mut FileHandle) -> Result<BlockId, FsError> {
        let block = self.alloc_block()?;

        let mut entry: FileEntry = self.read_record(file.block)?;
        let last = entry.last_data;
        entry.last_data = block;
        if entry.first_data.is_null() {
            entry.first_data = block;
        }
        self.write_record(file.block, &entry)?;

        if let Some(last) = last.non_null() {
            self.write_record(last, &DataHeader { next: block })?;
        }
        self.write_record(
            block,
            &DataHeader {
                next: BlockId::NULL,
            },
        )?;

        file.first_data = entry.first_data;
        file.next_data = block;
        Ok(block)
    }

    /// 前移游标，写满或读完一块时顺着块头走到下一块
    fn advance(&self, file: &mut FileHandle, block: BlockId, len: usize) -> Result<(), FsError> {
        file.position += len as u32;
        file.position_in_block += len;
        if file.position_in_block == DATA_SIZE {
            file.next_data = self.read_record::<DataHeader>(block)?.next;
            file.position_in_block = 0;
        }
        Ok(())
    }

    /// 清空文件，游标回到开头
    pub fn truncate(&mut self, file: &mut FileHandle) -> Result<(), FsError> {
        self.check_writable()?;
        file.check_open()?;

        let mut entry: FileEntry = self.read_record(file.block)?;
        if entry.is_read_only() {
            return Err(FsError::AccessDenied);
        }
        self.truncate_entry(&mut entry)?;

        *file = FileHandle::new(&entry, file.mode);
        self.seek(file, 0)
    }

    pub fn close(&self, file: &mut FileHandle) -> Result<(), FsError> {
        file.block = BlockId::NULL;
        file.first_data = BlockId::NULL;
        file.next_data = BlockId::NULL;
        file.position_in_block = 0;
        file.position = 0;
        file.size = 0;
        Ok(())
    }

    fn trace_cursor(&self, op: &str, file: &FileHandle) {
        if self.config().trace {
            log::trace!(
                "{op} {}: pos={} size={} block={} offset={}",
                file.block,
                file.position,
                file.size,
                file.next_data,
                file.position_in_block
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::{DataHeader, FileEntry};
    use crate::test_util::{formatted, remount};
    use crate::{BlockId, FsError, OpenMode};

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn round_trip() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let data = pattern(150);

        let mut file = efs.open(&root, "blob", OpenMode::Write).unwrap();
        assert_eq!(150, efs.write(&mut file, &data).unwrap());
        assert_eq!(150, file.position());
        assert_eq!(150, efs.find_file(&root, "blob").unwrap().size());
        // 文件块 + 3个数据块
        assert_eq!(1 + 1 + 3, efs.used_blocks());

        efs.seek(&mut file, 0).unwrap();
        let mut buf = [0; 200];
        assert_eq!(150, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(data, buf[..150]);
        assert_eq!(Err(FsError::EndOfFile), efs.read(&mut file, &mut buf));
    }

    #[test]
    fn read_in_small_pieces() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let data = pattern(200);
        let mut file = efs.open(&root, "blob", OpenMode::Write).unwrap();
        efs.write(&mut file, &data).unwrap();

        let mut file = efs.open(&root, "blob", OpenMode::Read).unwrap();
        let mut out = Vec::new();
        let mut buf = [0; 7];
        while let Ok(n) = efs.read(&mut file, &mut buf) {
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(data, out);
        assert_eq!(200, file.position());
    }

    #[test]
    fn seek_boundaries() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let data = pattern(124);
        let mut file = efs.open(&root, "blob", OpenMode::Write).unwrap();
        efs.write(&mut file, &data).unwrap();

        efs.seek(&mut file, 124).unwrap();
        assert_eq!(Err(FsError::InvalidSeek), efs.seek(&mut file, 125));

        let mut buf = [0; 2];
        efs.seek(&mut file, 61).unwrap();
        assert_eq!(2, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(data[61..63], buf);

        efs.seek(&mut file, 62).unwrap();
        assert_eq!(1, efs.read(&mut file, &mut buf[..1]).unwrap());
        assert_eq!(data[62], buf[0]);

        efs.seek(&mut file, 123).unwrap();
        assert_eq!(1, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(data[123], buf[0]);
    }

    #[test]
    fn read_until_delimiter() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "lines", OpenMode::Write).unwrap();
        efs.write(&mut file, b"hello\nworld").unwrap();
        efs.seek(&mut file, 0).unwrap();

        let mut buf = [0; 32];
        assert_eq!(6, efs.read_until(&mut file, &mut buf, b'\n').unwrap());
        assert_eq!(b"hello\n", &buf[..6]);
        assert!(buf[6..].iter().all(|&b| b == 0));

        assert_eq!(5, efs.read_until(&mut file, &mut buf, b'\n').unwrap());
        assert_eq!(b"world", &buf[..5]);
        assert_eq!(
            Err(FsError::EndOfFile),
            efs.read_until(&mut file, &mut buf, b'\n')
        );
    }

    #[test]
    fn delimiter_across_blocks() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut data = vec![b'a'; 70];
        data[65] = b';';
        let mut file = efs.open(&root, "csv", OpenMode::Write).unwrap();
        efs.write(&mut file, &data).unwrap();
        efs.seek(&mut file, 0).unwrap();

        let mut buf = [0; 100];
        assert_eq!(66, efs.read_until(&mut file, &mut buf, b';').unwrap());
        assert_eq!(4, efs.read_until(&mut file, &mut buf, b';').unwrap());
    }

    #[test]
    fn truncate_frees_blocks() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "log", OpenMode::Write).unwrap();
        efs.write(&mut file, &pattern(200)).unwrap();
        let used = efs.used_blocks();

        efs.truncate(&mut file).unwrap();
        assert_eq!(used - 4, efs.used_blocks());
        assert_eq!(0, file.size());
        assert_eq!(0, file.position());
        assert_eq!(0, efs.find_file(&root, "log").unwrap().size());

        efs.write(&mut file, b"again").unwrap();
        efs.seek(&mut file, 0).unwrap();
        let mut buf = [0; 16];
        assert_eq!(5, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(b"again", &buf[..5]);
    }

    #[test]
    fn disk_full_keeps_written_part() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "fill", OpenMode::Write).unwrap();
        let data = pattern(1000);

        // 16块 - 主块 - 文件块 = 14个数据块
        assert_eq!(Err(FsError::DiskFull), efs.write(&mut file, &data));
        assert_eq!(14 * 62, file.position());
        assert_eq!(14 * 62, file.size());
        assert_eq!(14 * 62, efs.find_file(&root, "fill").unwrap().size());
        assert_eq!(16, efs.used_blocks());
        assert_eq!(0, efs.free_blocks());
        assert!(efs.free_chain().unwrap().is_empty());

        assert_eq!(Err(FsError::DiskFull), efs.create_dir("/more"));
        assert_eq!(
            Err(FsError::DiskFull),
            efs.create_file(&root, "more").map(|_| ())
        );
        assert_eq!(16, efs.used_blocks());

        efs.seek(&mut file, 0).unwrap();
        let mut buf = vec![0; 1000];
        assert_eq!(14 * 62, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(data[..14 * 62], buf[..14 * 62]);

        efs.erase(&root, "fill").unwrap();
        assert_eq!(1, efs.used_blocks());
    }

    #[test]
    fn append_across_block_boundary() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "a", OpenMode::Write).unwrap();
        efs.write(&mut file, &[b'x'; 62]).unwrap();
        efs.close(&mut file).unwrap();
        assert!(!file.is_open());

        let mut file = efs.open(&root, "a", OpenMode::Append).unwrap();
        assert_eq!(62, file.position());
        assert_eq!(OpenMode::Append, file.mode());
        efs.write(&mut file, b"y").unwrap();

        let entry = efs.find_file(&root, "a").unwrap();
        assert_eq!(63, entry.size());
        assert_eq!(BlockId::new(2), entry.first_data_block());
        assert_eq!(BlockId::new(3), entry.last_data_block());

        let mut file = efs.open(&root, "a", OpenMode::Read).unwrap();
        let mut buf = [0; 100];
        assert_eq!(63, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(b'y', buf[62]);
    }

    #[test]
    fn write_mode_truncates() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "a", OpenMode::Write).unwrap();
        efs.write(&mut file, &pattern(100)).unwrap();
        assert_eq!(4, efs.used_blocks());

        let file = efs.open(&root, "a", OpenMode::Write).unwrap();
        assert_eq!(0, file.size());
        assert_eq!(2, efs.used_blocks());
    }

    #[test]
    fn overwrite_in_place() {
        let (ram, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "a", OpenMode::Write).unwrap();
        let entry_addr = BlockId::new(1).addr();
        efs.write(&mut file, &pattern(100)).unwrap();

        efs.seek(&mut file, 0).unwrap();
        ram.reset_counters();
        efs.write(&mut file, &[0; 50]).unwrap();
        assert_eq!(0, ram.writes_at(entry_addr));
        assert_eq!(100, file.size());

        efs.seek(&mut file, 100).unwrap();
        efs.write(&mut file, &[1; 10]).unwrap();
        assert_eq!(1, ram.writes_at(entry_addr));
        let entry: FileEntry = efs.read_record(BlockId::new(1)).unwrap();
        assert_eq!(110, entry.size());
    }

    #[test]
    fn handle_checks() {
        let (_, mut efs) = formatted(1);
        let mut root = efs.open_dir("/").unwrap();
        assert_eq!(
            FsError::NotFound,
            efs.open(&root, "missing", OpenMode::Read).unwrap_err()
        );
        assert_eq!(
            FsError::InvalidFileName,
            efs.open(&root, "a/b", OpenMode::Write).unwrap_err()
        );

        let mut file = efs.open(&root, "a", OpenMode::Write).unwrap();
        efs.write(&mut file, b"abc").unwrap();
        let mut reader = efs.open(&root, "a", OpenMode::Read).unwrap();
        assert_eq!(Err(FsError::AccessDenied), efs.write(&mut reader, b"x"));

        efs.close(&mut file).unwrap();
        let mut buf = [0; 4];
        assert_eq!(Err(FsError::InvalidHandle), efs.read(&mut file, &mut buf));
        assert_eq!(Err(FsError::InvalidHandle), efs.write(&mut file, b"x"));
        assert_eq!(Err(FsError::InvalidHandle), efs.seek(&mut file, 0));
        assert_eq!(Err(FsError::InvalidHandle), efs.truncate(&mut file));

        efs.close_dir(&mut root).unwrap();
        assert_eq!(
            FsError::InvalidHandle,
            efs.open(&root, "a", OpenMode::Read).unwrap_err()
        );
    }

    #[test]
    fn read_only_volume() {
        let (ram, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "a", OpenMode::Write).unwrap();
        efs.write(&mut file, b"abc").unwrap();

        let mut efs = remount(&ram, true);
        ram.reset_counters();
        let root = efs.open_dir("/").unwrap();
        for mode in [OpenMode::Write, OpenMode::Append] {
            assert_eq!(FsError::AccessDenied, efs.open(&root, "a", mode).unwrap_err());
        }

        let mut file = efs.open(&root, "a", OpenMode::Read).unwrap();
        let mut buf = [0; 8];
        assert_eq!(3, efs.read(&mut file, &mut buf).unwrap());
        assert_eq!(Err(FsError::AccessDenied), efs.write(&mut file, b"x"));
        assert_eq!(Err(FsError::AccessDenied), efs.truncate(&mut file));
        assert_eq!(Err(FsError::AccessDenied), efs.erase(&root, "a"));
        assert_eq!(0, ram.write_count());
    }

    #[test]
    fn one_kb_scenario() {
        let (_, mut efs) = formatted(1);
        assert_eq!(16, efs.total_blocks());
        assert_eq!(1, efs.used_blocks());

        efs.create_dir("/docs").unwrap();
        assert_eq!(2, efs.used_blocks());

        let docs = efs.open_dir("/docs").unwrap();
        let mut file = efs.open(&docs, "report.txt", OpenMode::Write).unwrap();
        assert_eq!(3, efs.used_blocks());

        assert_eq!(100, efs.write(&mut file, &pattern(100)).unwrap());
        assert_eq!(5, efs.used_blocks());

        let entry = efs.find_file(&docs, "report.txt").unwrap();
        assert_eq!(BlockId::new(2), entry.block());
        assert_eq!(100, entry.size());
        assert_eq!(BlockId::new(3), entry.first_data_block());
        assert_eq!(BlockId::new(4), entry.last_data_block());
    }

    #[test]
    fn seek_past_cut_chain() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "cut", OpenMode::Write).unwrap();
        efs.write(&mut file, &pattern(100)).unwrap();

        // 数据链表#2 -> #3 截成只剩#2，大小却记成200
        let (entry_block, first) = (BlockId::new(1), BlockId::new(2));
        efs.write_record(first, &DataHeader { next: BlockId::NULL })
            .unwrap();
        let mut entry: FileEntry = efs.read_record(entry_block).unwrap();
        entry.size = 200;
        efs.write_record(entry_block, &entry).unwrap();

        let mut file = efs.open(&root, "cut", OpenMode::Read).unwrap();
        assert_eq!(200, file.size());
        efs.seek(&mut file, 30).unwrap();
        assert_eq!(Err(FsError::AccessDenied), efs.seek(&mut file, 70));
        assert_eq!(Err(FsError::AccessDenied), efs.seek(&mut file, 124));
        assert_eq!(
            FsError::AccessDenied,
            efs.open(&root, "cut", OpenMode::Append).unwrap_err()
        );
    }

    #[test]
    fn seek_through_looping_chain() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "loop", OpenMode::Write).unwrap();
        efs.write(&mut file, &pattern(100)).unwrap();

        efs.write_record(BlockId::new(3), &DataHeader { next: BlockId::new(2) })
            .unwrap();
        let mut entry: FileEntry = efs.read_record(BlockId::new(1)).unwrap();
        entry.size = 62 * 40;
        efs.write_record(BlockId::new(1), &entry).unwrap();

        let mut file = efs.open(&root, "loop", OpenMode::Read).unwrap();
        assert_eq!(Err(FsError::Corrupted), efs.seek(&mut file, 62 * 40));
    }

    #[test]
    fn disk_full_count_is_position_delta() {
        let (_, mut efs) = formatted(1);
        let root = efs.open_dir("/").unwrap();
        let mut file = efs.open(&root, "fill", OpenMode::Write).unwrap();
        efs.write(&mut file, &[1; 10]).unwrap();

        let before = file.position();
        assert_eq!(Err(FsError::DiskFull), efs.write(&mut file, &[2; 1000]));
        assert_eq!(14 * 62 - 10, file.position() - before);
    }
}
