//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the event server core.
/// 事件服务器核心的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying I/O error occurred on a session transport.
    /// 会话传输上发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A transport implementation reported a failure that is not an I/O error.
    /// 传输实现报告了一个非I/O错误的故障。
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine behind this handle has been stopped, or its queue is closed.
    /// 此句柄背后的引擎已停止，或其队列已关闭。
    #[error("engine has been stopped")]
    EngineStopped,

    /// `start` was called on an engine that is already running or stopped.
    /// 对已运行或已停止的引擎调用了 `start`。
    #[error("engine was already started")]
    AlreadyStarted,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::Transport(msg) => std::io::Error::other(msg),
            Error::EngineStopped => ErrorKind::BrokenPipe.into(),
            Error::AlreadyStarted => ErrorKind::AlreadyExists.into(),
        }
    }
}
