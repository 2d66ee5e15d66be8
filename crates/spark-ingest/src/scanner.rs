//! 扫描循环：驱动 [`SplitPolicy`] 从句柄中逐条切出记录。
//!
//! # 设计概要（How）
//! - 扫描器独占句柄与读取窗口，记录 `start..end` 为尚未消费的字节；
//! - 每次需要更多数据时，先把未消费字节搬到窗口头部，再按需倍增窗口，最大不超过 `max_token_size`；
//! - 窗口已满且策略仍要求更多数据时，判定为超长记录并终止当前句柄。

use std::io::{self, Read};

use crate::{
    error::{IngestError, Result},
    split::{Split, SplitPolicy},
};

/// 窗口首次分配的大小。
const START_BUFFER_SIZE: usize = 4096;

/// 绑定到单个句柄上的扫描器。
///
/// # 教案式说明
/// - **意图 (Why)**：把“读多少、何时扩容、何时判定超长”与“怎么切”分离，分割策略因此可以保持纯函数。
/// - **契约 (What)**：
///   - [`Scanner::next_token`] 返回 `Ok(Some(token))` 表示一条记录，切片只在下一次调用前有效；
///   - 返回 `Ok(None)` 表示句柄已读尽，此后重复调用仍返回 `Ok(None)`；
///   - 返回错误后扫描器不可继续使用，调用方应丢弃它以释放句柄。
/// - **风险 (Trade-offs)**：窗口是普通 `Vec<u8>`，记录需要被复制进记录区才能跨调用保存。
#[derive(Debug)]
pub struct Scanner<R, P> {
    handle: R,
    policy: P,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    max_token_size: usize,
    at_eof: bool,
    done: bool,
}

impl<R: Read, P: SplitPolicy> Scanner<R, P> {
    /// 绑定句柄与分割策略。
    pub fn new(handle: R, policy: P, max_token_size: usize) -> Self {
        Self {
            handle,
            policy,
            buf: Vec::new(),
            start: 0,
            end: 0,
            max_token_size,
            at_eof: false,
            done: false,
        }
    }

    /// 取出下一条记录。
    pub fn next_token(&mut self) -> Result<Option<&[u8]>> {
        loop {
            if self.done {
                return Ok(None);
            }

            if self.end > self.start || self.at_eof {
                let window = &self.buf[self.start..self.end];
                match self.policy.split(window, self.at_eof) {
                    Split::Token { advance, token } => {
                        let window_len = window.len();
                        if advance > window_len || token.start > token.end || token.end > advance {
                            self.done = true;
                            return Err(IngestError::SplitOverrun {
                                advance,
                                window: window_len,
                            });
                        }
                        let base = self.start;
                        self.start += advance;
                        return Ok(Some(&self.buf[base + token.start..base + token.end]));
                    }
                    Split::Finished => {
                        self.done = true;
                        return Ok(None);
                    }
                    Split::NeedMore if self.at_eof => {
                        self.done = true;
                        return Ok(None);
                    }
                    Split::NeedMore => {}
                }
            }

            self.fill()?;
        }
    }

    /// 当前窗口已分配的字节数。
    pub fn buffered_capacity(&self) -> usize {
        self.buf.len()
    }

    fn fill(&mut self) -> Result<()> {
        // 未消费字节移到头部，腾出尾部空间。
        if self.start > 0 && (self.end == self.buf.len() || self.start > self.buf.len() / 2) {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        if self.end == self.buf.len() {
            if self.buf.len() >= self.max_token_size {
                self.done = true;
                return Err(IngestError::TokenTooLarge {
                    limit: self.max_token_size,
                });
            }
            let grown = (self.buf.len() * 2)
                .max(START_BUFFER_SIZE)
                .min(self.max_token_size);
            self.buf.resize(grown, 0);
        }

        loop {
            match self.handle.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.at_eof = true;
                    return Ok(());
                }
                Ok(read) => {
                    self.end += read;
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Err(IngestError::Io(err));
                }
            }
        }
    }
}
