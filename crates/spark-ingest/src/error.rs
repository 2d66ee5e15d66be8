//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义行读取器对外暴露的全部失败语义，调用方据此区分“需要重连”“彻底结束”与“当前流失败”；
//! - 读取器内部不做任何重试，所有错误原样交给直接调用方，由外层包装决定重投策略。
//!
//! ## 设计要求（What）
//! - 所有变体实现 `thiserror::Error`，可直接与 `std::error::Error` 生态互通；
//! - 底层 I/O 错误通过 `#[from]` 透传，不改写其 `ErrorKind` 与消息。

use std::io;

use thiserror::Error;

/// 行读取器的统一错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“流已读尽”“输入彻底结束”“记录超长”“底层 I/O 失败”放进同一枚举，
///   让驱动循环用一次 `match` 即可决定下一步是 `connect`、停止还是上报。
/// - **契约 (What)**：
///   - [`IngestError::NotConnected`] 可恢复：调用方应先 `connect` 再 `read`；
///   - [`IngestError::Closed`] 为终态：工厂不会再产出新的句柄；
///   - [`IngestError::TokenTooLarge`] 与 [`IngestError::Io`] 只终止当前句柄，调用方可以重连到下一个流。
/// - **风险 (Trade-offs)**：`Io` 变体持有 `io::Error`，因此整体类型不可 `Clone`；
///   需要复制时请改用 [`IngestError::kind_label`] 记录稳定标签。
#[derive(Debug, Error)]
pub enum IngestError {
    /// 读取器尚未建立连接，或当前流已读尽。
    #[error("reader is not connected")]
    NotConnected,

    /// 流工厂已报告没有更多输入，读取器永久关闭。
    #[error("reader is permanently closed: no further streams")]
    Closed,

    /// 在找到分隔符之前缓冲的数据超过上限。
    #[error("token exceeds the maximum buffered size of {limit} bytes")]
    TokenTooLarge { limit: usize },

    /// 分割策略返回了超出窗口范围的推进量或记录区间。
    #[error("split policy overran its window: advance {advance} over {window} buffered bytes")]
    SplitOverrun { advance: usize, window: usize },

    /// 配置项未通过构造期校验。
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// TOML 配置文本无法解析。
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 来自流工厂或句柄的底层 I/O 错误，原样透传。
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl IngestError {
    /// 构造配置错误的便捷入口。
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        IngestError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// 判断该错误是否只要求调用方重新 `connect`。
    ///
    /// - `NotConnected`：当前流读尽或尚未连接；
    /// - `TokenTooLarge`/`Io`/`SplitOverrun`：当前句柄已释放，重连会推进到下一个流；
    /// - `Closed` 与配置类错误不可恢复。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::NotConnected
                | IngestError::TokenTooLarge { .. }
                | IngestError::SplitOverrun { .. }
                | IngestError::Io(_)
        )
    }

    /// 返回稳定的错误标签，用于日志字段。
    pub fn kind_label(&self) -> &'static str {
        match self {
            IngestError::NotConnected => "ingest.not_connected",
            IngestError::Closed => "ingest.closed",
            IngestError::TokenTooLarge { .. } => "ingest.token_too_large",
            IngestError::SplitOverrun { .. } => "ingest.split_overrun",
            IngestError::InvalidConfig { .. } => "ingest.invalid_config",
            IngestError::ConfigParse(_) => "ingest.config_parse",
            IngestError::Io(_) => "ingest.io",
        }
    }
}

/// 读取器统一的 `Result` 别名。
pub type Result<T, E = IngestError> = std::result::Result<T, E>;
