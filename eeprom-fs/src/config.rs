/// 运行时开关，取代编译期的调试与只读配置
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 禁止一切写操作，相关调用直接返回[`FsError::AccessDenied`](crate::FsError::AccessDenied)
    pub read_only: bool,
    /// 逐块记录读写的记录内容与游标状态（`log::trace!`）
    pub trace: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            read_only: false,
            trace: false,
        }
    }

    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub const fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
