//! Panic containment shared by the engine loops.
//! 各引擎循环共用的 panic 隔离逻辑。

use crate::config::FaultPolicy;
use std::any::Any;
use tracing::error;

/// Applies `policy` to a panic caught at an engine loop boundary.
///
/// `LogAndContinue` logs and returns so the loop can move on to its next
/// item; `Abort` logs and terminates the process.
///
/// 对在引擎循环边界捕获的 panic 应用 `policy`。`LogAndContinue` 记录后返回，
/// 循环继续处理下一项；`Abort` 记录后终止进程。
pub(crate) fn contain(
    policy: FaultPolicy,
    engine: &'static str,
    stage: &'static str,
    panic: Box<dyn Any + Send>,
) {
    let reason = panic_message(panic.as_ref());
    match policy {
        FaultPolicy::LogAndContinue => {
            error!(engine, stage, reason = %reason, "Panic caught, skipping item");
        }
        FaultPolicy::Abort => {
            error!(engine, stage, reason = %reason, "Panic caught, aborting process");
            std::process::abort();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
