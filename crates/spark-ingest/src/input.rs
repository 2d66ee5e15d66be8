//! 面向流水线暴露的读取器能力面。
//!
//! # 契约说明（What）
//! - `connect`：成功、[`IngestError::Closed`](crate::IngestError::Closed)（永久结束）或其他可重试错误；
//! - `read`：返回一条消息、[`IngestError::NotConnected`](crate::IngestError::NotConnected)（需要重连）或错误；
//! - `acknowledge`：反馈自上次确认以来返回的所有消息的投递结果，本身不会失败；
//! - `close_async` / `wait_for_close`：发起关闭并释放资源。
//!
//! 同一实例上的调用必须串行；只有 `close_async` 允许与阻塞中的 `read` 并发触发，
//! 因此它只需要 `&self`。

use std::{error::Error, time::Duration};

use crate::{error::Result, message::Message};

/// 可确认消息的读取器。
pub trait MessageReader {
    /// 建立（或推进到下一个）底层流。已连接时直接成功。
    fn connect(&mut self) -> Result<()>;

    /// 读取下一条消息。
    fn read(&mut self) -> Result<Message>;

    /// 确认投递结果：`None` 表示成功，`Some(err)` 表示下游投递失败。
    fn acknowledge(&mut self, failure: Option<&dyn Error>) -> Result<()>;

    /// 发出关闭信号，打断可能阻塞中的 `read`。
    fn close_async(&self);

    /// 释放底层资源。
    fn wait_for_close(&mut self, timeout: Duration) -> Result<()>;
}

impl<R: MessageReader + ?Sized> MessageReader for Box<R> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn read(&mut self) -> Result<Message> {
        (**self).read()
    }

    fn acknowledge(&mut self, failure: Option<&dyn Error>) -> Result<()> {
        (**self).acknowledge(failure)
    }

    fn close_async(&self) {
        (**self).close_async()
    }

    fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        (**self).wait_for_close(timeout)
    }
}
