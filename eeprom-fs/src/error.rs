use block_dev::DeviceError;
use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FsError {
    #[display(fmt = "invalid file name")]
    InvalidFileName,
    #[display(fmt = "duplicated file name")]
    DuplicatedFileName,
    #[display(fmt = "not found")]
    NotFound,
    #[display(fmt = "disk full")]
    DiskFull,
    #[display(fmt = "access denied")]
    AccessDenied,
    #[display(fmt = "seek beyond end of file")]
    InvalidSeek,
    #[display(fmt = "end of file")]
    EndOfFile,
    #[display(fmt = "invalid handle")]
    InvalidHandle,
    /// 格式化时给出的容量无法换算成合法的块数
    #[display(fmt = "invalid capacity")]
    InvalidCapacity,
    /// 主块的内容不像是格式化过的卷
    #[display(fmt = "volume is not formatted")]
    NotFormatted,
    /// 链表成环或长于卷的总块数
    #[display(fmt = "corrupted block chain")]
    Corrupted,
    #[display(fmt = "device error: {}", _0)]
    Device(DeviceError),
}

impl From<DeviceError> for FsError {
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}
