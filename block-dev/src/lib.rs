//! 存储设备的抽象
//!
//! 面向 EEPROM 一类**按字节寻址**的小容量器件：
//! 文件系统只会在`地址`处读写不超过一个块长度的字节，
//! 总线寻址、页边界切分、写入后的等待都由设备实现自行处理。

#![no_std]

use core::any::Any;
use core::fmt;

pub trait BlockDevice: Send + Sync + Any + fmt::Debug {
    /// 从`addr`开始读满`buf`
    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 将`buf`写入`addr`开始的位置
    fn write_at(&self, addr: usize, buf: &[u8]) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 访问越过了设备末尾
    OutOfRange { addr: usize, len: usize },
    /// 传输失败（总线无应答、主机I/O出错等）
    Io,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { addr, len } => {
                write!(f, "access of {len} bytes at {addr:#x} is out of range")
            }
            Self::Io => f.write_str("transfer failed"),
        }
    }
}
