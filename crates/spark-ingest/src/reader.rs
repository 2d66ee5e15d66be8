//! 行分隔读取器：连接、读取、确认与关闭的状态机。
//!
//! # 模块定位（Why）
//! - 把任意字节流切分为单段或多段消息，消息段直接引用内部记录区，不做额外复制；
//! - 当前流读尽后由调用方再次 `connect`，读取器向流工厂索取下一个流，实现透明换流。
//!
//! # 设计概要（How）
//! - 句柄由绑定其上的 [`Scanner`] 独占，释放句柄即丢弃扫描器，`Drop` 负责关闭底层资源；
//! - 每条非空记录复制进 [`RecordArena`]，返回的 [`Part`](crate::Part) 是封顶的只读视图；
//! - 只有成功确认才会重置记录区，失败确认保持记录区不变，外层可直接重投已发出的消息。

use std::{error::Error, fmt, sync::Arc, time::Duration};

use tracing::{debug, info, trace, warn};

use crate::{
    arena::RecordArena,
    config::LinesConfig,
    error::{IngestError, Result},
    input::MessageReader,
    message::Message,
    scanner::Scanner,
    source::StreamFactory,
    split::DelimiterSplit,
};

/// 外部提供的解阻塞钩子：负责让阻塞在当前句柄上的读取尽快返回。
pub type UnblockHook = Arc<dyn Fn() + Send + Sync>;

/// 读取器会话状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// 没有可读句柄：尚未连接，或上一个流已读尽/失败。
    Disconnected,
    /// 持有句柄，可以读取。
    Connected,
    /// 流工厂已报告没有更多流。
    PermanentlyClosed,
}

/// 可跨线程触发关闭信号的句柄。
///
/// # 契约说明（What）
/// - 读取器的 `read` 需要 `&mut self`，阻塞期间其他线程无法借用读取器本身；
///   通过 [`LineReader::close_handle`] 预先取得的 `CloseHandle` 可以在任意线程调用 [`CloseHandle::close`]；
/// - 调用效果与 [`MessageReader::close_async`] 相同：仅触发解阻塞钩子，不触碰读取器内部状态。
#[derive(Clone)]
pub struct CloseHandle {
    hook: UnblockHook,
}

impl CloseHandle {
    /// 触发解阻塞钩子。
    pub fn close(&self) {
        (self.hook)();
    }
}

impl fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseHandle").finish_non_exhaustive()
    }
}

/// 基于分隔符的行读取器。
///
/// # 教案式说明
/// - **意图 (Why)**：作为摄取流水线的前端，把流工厂产出的字节流转换为有序、可确认的消息序列。
/// - **执行 (How)**：
///   1. `connect` 在未连接时向工厂索取句柄，并绑定新的扫描器；工厂耗尽后进入永久关闭；
///   2. `read` 逐条取记录：非空记录写入记录区并组装为消息段，多段模式以空记录结束一组；
///   3. 流读尽或失败时释放句柄，读尽且无待交付消息时返回 [`IngestError::NotConnected`]；
///   4. `acknowledge(None)` 重置记录区，`acknowledge(Some(_))` 保留记录区。
/// - **契约 (What)**：
///   - 同一实例上的 `connect`/`read`/`acknowledge`/`wait_for_close` 必须串行调用；
///   - 消息按记录在流中的顺序返回；
///   - 已发出的消息段在下一次成功确认之前字节不变。
/// - **风险 (Trade-offs)**：记录区在连续失败确认期间无限增长；重投与限流由外层包装负责。
pub struct LineReader<F: StreamFactory> {
    factory: F,
    unblock: UnblockHook,
    scanner: Option<Scanner<F::Handle, DelimiterSplit>>,
    arena: RecordArena,
    config: LinesConfig,
    state: SessionState,
}

impl<F: StreamFactory> LineReader<F> {
    /// 构造读取器；配置在此校验，非法配置直接返回错误。
    ///
    /// `unblock` 会在 [`MessageReader::close_async`] 时被调用，它应当让阻塞在当前句柄上的
    /// 读取返回（例如从另一线程关闭该句柄）。读取器无法从自身内部打断底层 I/O。
    pub fn new<U>(factory: F, unblock: U, config: LinesConfig) -> Result<Self>
    where
        U: Fn() + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            factory,
            unblock: Arc::new(unblock),
            scanner: None,
            arena: RecordArena::new(config.segment_capacity),
            config,
            state: SessionState::Disconnected,
        })
    }

    /// 当前会话状态。
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 流工厂的只读引用，例如读取 [`FileStreamFactory::current_path`](crate::FileStreamFactory::current_path)。
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// 记录区逻辑写游标：自上次成功确认以来缓存的字节数。
    pub fn buffered_bytes(&self) -> usize {
        self.arena.cursor()
    }

    /// 取得可跨线程触发的关闭句柄。
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            hook: Arc::clone(&self.unblock),
        }
    }

    fn release_handle(&mut self) {
        if self.scanner.take().is_some() {
            trace!("released stream handle");
        }
        if self.state == SessionState::Connected {
            self.state = SessionState::Disconnected;
        }
    }
}

impl<F: StreamFactory> MessageReader for LineReader<F> {
    fn connect(&mut self) -> Result<()> {
        if self.scanner.is_some() {
            return Ok(());
        }
        if self.state == SessionState::PermanentlyClosed {
            return Err(IngestError::Closed);
        }
        self.release_handle();

        match self.factory.next_stream() {
            Ok(Some(handle)) => {
                let policy = DelimiterSplit::new(self.config.delimiter_bytes());
                self.scanner = Some(Scanner::new(handle, policy, self.config.max_token_size));
                self.state = SessionState::Connected;
                debug!(
                    multipart = self.config.multipart,
                    max_token_size = self.config.max_token_size,
                    "connected to next stream"
                );
                Ok(())
            }
            Ok(None) => {
                self.state = SessionState::PermanentlyClosed;
                info!("stream factory exhausted, reader permanently closed");
                Err(IngestError::Closed)
            }
            Err(err) => {
                warn!(error = %err, "failed to open next stream");
                Err(IngestError::Io(err))
            }
        }
    }

    fn read(&mut self) -> Result<Message> {
        let Some(scanner) = self.scanner.as_mut() else {
            return Err(IngestError::NotConnected);
        };
        let multipart = self.config.multipart;
        let mut message = Message::new();

        let outcome = loop {
            match scanner.next_token() {
                Ok(Some(token)) if !token.is_empty() => {
                    message.push(self.arena.append(token));
                    if !multipart {
                        return Ok(message);
                    }
                }
                // 多段模式下空记录结束当前消息。
                Ok(Some(_)) if multipart && !message.is_empty() => return Ok(message),
                Ok(Some(_)) => {}
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.release_handle();
        if let Err(err) = outcome {
            warn!(error = %err, kind = err.kind_label(), "stream read failed, handle released");
            return Err(err);
        }

        debug!(pending_parts = message.len(), "stream drained");
        if message.is_empty() {
            Err(IngestError::NotConnected)
        } else {
            Ok(message)
        }
    }

    fn acknowledge(&mut self, failure: Option<&dyn Error>) -> Result<()> {
        match failure {
            None => self.arena.reset(),
            Some(err) => debug!(
                error = %err,
                buffered_bytes = self.arena.cursor(),
                "delivery failed, record buffer retained"
            ),
        }
        Ok(())
    }

    fn close_async(&self) {
        (self.unblock)();
    }

    /// 释放句柄后立即返回。
    ///
    /// 关闭是非阻塞、尽力而为的：`timeout` 被接受但不会等待，也不会被强制执行。
    fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        trace!(?timeout, "closing reader without waiting");
        self.release_handle();
        Ok(())
    }
}

impl<F: StreamFactory> fmt::Debug for LineReader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("buffered_bytes", &self.arena.cursor())
            .finish_non_exhaustive()
    }
}
