use std::sync::{Arc, Mutex};

use eeprom_fs::{BlockDevice, Config, DeviceError, EepromFileSystem};

/// 模拟一片EEPROM：初始内容全为`0xFF`，并统计写入次数
#[derive(Debug)]
pub struct MockEeprom {
    data: Mutex<Vec<u8>>,
    writes: Mutex<usize>,
}

impl MockEeprom {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(vec![0xFF; size]),
            writes: Mutex::new(0),
        })
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl BlockDevice for MockEeprom {
    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let data = self.data.lock().unwrap();
        let src = data
            .get(addr..addr + buf.len())
            .ok_or(DeviceError::OutOfRange {
                addr,
                len: buf.len(),
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&self, addr: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let mut data = self.data.lock().unwrap();
        let dst = data
            .get_mut(addr..addr + buf.len())
            .ok_or(DeviceError::OutOfRange {
                addr,
                len: buf.len(),
            })?;
        dst.copy_from_slice(buf);
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn format(kb: u16) -> (Arc<MockEeprom>, EepromFileSystem) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dev = MockEeprom::new(kb as usize * 1024);
    let efs = EepromFileSystem::format(dev.clone(), kb, Config::default()).unwrap();
    (dev, efs)
}
