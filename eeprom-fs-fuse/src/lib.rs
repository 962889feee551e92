
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError};

/// 以主机上的镜像文件充当EEPROM
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    size: u64,
}

impl BlockFile {
    pub fn new(file: File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }

    /// 打开已有的镜像，只读时不申请写权限
    pub fn open(path: impl AsRef<Path>, writable: bool) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(writable).open(path)?;
        Self::new(file)
    }

    /// 新建（或覆盖）一个`size`字节的镜像
    pub fn create(path: impl AsRef<Path>, size: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size)?;
        Self::new(file)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    fn seek_to(&self, file: &mut File, addr: usize, len: usize) -> Result<(), DeviceError> {
        let end = addr as u64 + len as u64;
        if end > self.size {
            return Err(DeviceError::OutOfRange { addr, len });
        }
        file.seek(SeekFrom::Start(addr as u64)).map_err(host_error)?;
        Ok(())
    }
}

fn host_error(err: io::Error) -> DeviceError {
    log::warn!("image I/O failed: {err}");
    DeviceError::Io
}

impl BlockDevice for BlockFile {
    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        self.seek_to(&mut file, addr, buf.len())?;
        file.read_exact(buf).map_err(host_error)
    }

    fn write_at(&self, addr: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        self.seek_to(&mut file, addr, buf.len())?;
        file.write_all(buf).map_err(host_error)
    }
}
