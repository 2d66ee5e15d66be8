//! 重投包装：投递失败的消息在下一次读取时原样重发。

use std::{collections::VecDeque, error::Error, time::Duration};

use tracing::debug;

use crate::{
    error::{IngestError, Result},
    input::MessageReader,
    message::Message,
};

/// 为任意 [`MessageReader`] 提供失败重投。
///
/// # 教案式说明
/// - **意图 (Why)**：行读取器本身不决定重试策略，只保证失败确认后记录区不被重置；
///   `Preserver` 在其之上补齐“确认失败即重发”的语义，供不可丢消息的流水线使用。
/// - **执行 (How)**：
///   1. 每条经 `read` 返回的消息记入待确认列表；
///   2. `acknowledge(Some(_))` 把待确认消息整体移入重发队列；`acknowledge(None)` 清空待确认列表；
///   3. `read` 优先从重发队列按 FIFO 取出消息并重新记入待确认列表；
///   4. 两种确认结果都会转发给内层读取器。
/// - **契约 (What)**：
///   - 重发队列或待确认列表非空时，`connect` 即使遇到内层 [`IngestError::Closed`] 也返回成功，
///     待确认消息的结果落定且重发队列排空后才上报关闭；
///   - 消息段为引用计数视图，进入重发队列不会复制负载。
/// - **风险 (Trade-offs)**：下游持续失败时重发队列与内层记录区都会增长，需要外层设置失败上限。
#[derive(Debug)]
pub struct Preserver<R> {
    inner: R,
    pending: Vec<Message>,
    resend: VecDeque<Message>,
}

impl<R: MessageReader> Preserver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            resend: VecDeque::new(),
        }
    }

    /// 等待确认的消息数量。
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// 等待重发的消息数量。
    pub fn queued_for_resend(&self) -> usize {
        self.resend.len()
    }
}

impl<R: MessageReader> MessageReader for Preserver<R> {
    fn connect(&mut self) -> Result<()> {
        match self.inner.connect() {
            Err(IngestError::Closed) if !self.resend.is_empty() || !self.pending.is_empty() => {
                Ok(())
            }
            other => other,
        }
    }

    fn read(&mut self) -> Result<Message> {
        let message = match self.resend.pop_front() {
            Some(message) => message,
            None => self.inner.read()?,
        };
        self.pending.push(message.clone());
        Ok(message)
    }

    fn acknowledge(&mut self, failure: Option<&dyn Error>) -> Result<()> {
        if failure.is_some() {
            debug!(messages = self.pending.len(), "queueing messages for resend");
            self.resend.extend(self.pending.drain(..));
        } else {
            self.pending.clear();
        }
        self.inner.acknowledge(failure)
    }

    fn close_async(&self) {
        self.inner.close_async();
    }

    fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        self.inner.wait_for_close(timeout)
    }
}
