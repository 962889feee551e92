//! 单元测试用的内存设备

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockDevice, DeviceError};
use spin::Mutex;

use crate::{Config, EepromFileSystem};

/// 记录每个地址被写入次数的内存设备
#[derive(Debug)]
pub struct RamDevice {
    inner: Mutex<RamInner>,
}

#[derive(Debug)]
struct RamInner {
    data: Vec<u8>,
    writes: BTreeMap<usize, usize>,
    max_transfer: usize,
}

impl RamDevice {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RamInner {
                data: vec![0; size],
                writes: BTreeMap::new(),
                max_transfer: 0,
            }),
        })
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().writes.values().sum()
    }

    /// 从`addr`开始的写入次数
    pub fn writes_at(&self, addr: usize) -> usize {
        self.inner.lock().writes.get(&addr).copied().unwrap_or(0)
    }

    pub fn max_transfer(&self) -> usize {
        self.inner.lock().max_transfer
    }

    pub fn reset_counters(&self) {
        let mut inner = self.inner.lock();
        inner.writes.clear();
        inner.max_transfer = 0;
    }
}

impl RamInner {
    fn range(&mut self, addr: usize, len: usize) -> Result<core::ops::Range<usize>, DeviceError> {
        let end = addr
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(DeviceError::OutOfRange { addr, len })?;
        self.max_transfer = self.max_transfer.max(len);
        Ok(addr..end)
    }
}

impl BlockDevice for RamDevice {
    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        let range = inner.range(addr, buf.len())?;
        buf.copy_from_slice(&inner.data[range]);
        Ok(())
    }

    fn write_at(&self, addr: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        let range = inner.range(addr, buf.len())?;
        inner.data[range].copy_from_slice(buf);
        *inner.writes.entry(addr).or_default() += 1;
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 格式化一个`kb`KB的内存卷
pub fn formatted(kb: u16) -> (Arc<RamDevice>, EepromFileSystem) {
    init_logger();
    let ram = RamDevice::new(kb as usize * 1024);
    let efs = EepromFileSystem::format(ram.clone(), kb, Config::new().trace(true)).unwrap();
    (ram, efs)
}

pub fn remount(ram: &Arc<RamDevice>, read_only: bool) -> EepromFileSystem {
    EepromFileSystem::mount(ram.clone(), Config::new().read_only(read_only)).unwrap()
}

#[test]
fn out_of_range_is_reported() {
    let (ram, _) = formatted(1);
    let mut buf = [0; 4];
    assert_eq!(
        Err(DeviceError::OutOfRange { addr: 1022, len: 4 }),
        ram.read_at(1022, &mut buf)
    );

    // 卷比设备大时，格式化会在越界处失败
    let small = RamDevice::new(512);
    assert_eq!(
        crate::FsError::Device(DeviceError::OutOfRange { addr: 512, len: 2 }),
        EepromFileSystem::format(small, 1, Config::new()).unwrap_err()
    );
}

#[test]
fn shared_engine() {
    let (_, efs) = formatted(1);
    let shared = efs.into_shared();
    shared.lock().create_dir("/a").unwrap();
    assert!(shared.lock().dir_exists("/a").unwrap());
    assert_eq!(2, shared.lock().used_blocks());
}
