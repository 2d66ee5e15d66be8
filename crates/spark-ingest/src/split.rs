//! 分割策略：纯函数式地决定一段缓冲窗口能切出什么记录。
//!
//! # 设计概要（How）
//! - [`SplitPolicy`] 只接收“当前窗口 + 是否已到流末尾”，返回 [`Split`] 决策；
//! - 窗口起止位置、读取与扩容全部由 [`Scanner`](crate::scanner::Scanner) 持有，策略本身不保存任何可变状态；
//! - 记录以相对窗口的区间表达，扫描器据此借出切片，避免策略与缓冲之间出现借用纠缠。

use std::ops::Range;

/// 一次分割调用的决策。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Split {
    /// 产出一条记录：窗口前进 `advance` 字节，记录位于窗口内 `token` 区间。
    Token { advance: usize, token: Range<usize> },
    /// 当前窗口不足以判定，需要继续读取。
    NeedMore,
    /// 流已结束且无剩余数据，扫描终止。
    Finished,
}

/// 可插拔的分割策略。
///
/// # 契约说明（What）
/// - **前置条件**：`window` 为尚未消费的缓冲字节；`at_eof` 为真表示上游不会再提供数据；
/// - **后置条件**：`Token` 的 `advance` 不得超过 `window.len()`，`token` 必须落在 `0..advance` 之内；
///   扫描器会校验这一点并以 [`IngestError::SplitOverrun`](crate::IngestError::SplitOverrun) 报告违约。
pub trait SplitPolicy {
    /// 对当前窗口做出分割决策。
    fn split(&self, window: &[u8], at_eof: bool) -> Split;
}

/// 基于固定分隔符的分割策略。
///
/// # 教案式说明
/// - **意图 (Why)**：覆盖最常见的“按行/按自定义分隔符”切分场景，分隔符可以是多字节序列。
/// - **执行 (How)**：
///   1. 窗口为空且流已结束 → [`Split::Finished`]；
///   2. 找到分隔符 → 产出分隔符之前的字节，并同时越过记录与分隔符；
///   3. 未找到但流已结束 → 把剩余字节作为最后一条无分隔符记录；
///   4. 其余情况 → [`Split::NeedMore`]。
/// - **风险 (Trade-offs)**：查找采用朴素滑窗比较，分隔符较长且窗口很大时复杂度为 `O(n·m)`，
///   对常见的 1~2 字节分隔符可以忽略。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimiterSplit {
    delimiter: Vec<u8>,
}

impl DelimiterSplit {
    /// 以给定分隔符构造策略；空分隔符应在配置校验阶段被拒绝。
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// 当前分隔符。
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    fn find(&self, window: &[u8]) -> Option<usize> {
        match self.delimiter.as_slice() {
            [] => None,
            [single] => window.iter().position(|byte| byte == single),
            delimiter => window
                .windows(delimiter.len())
                .position(|candidate| candidate == delimiter),
        }
    }
}

impl SplitPolicy for DelimiterSplit {
    fn split(&self, window: &[u8], at_eof: bool) -> Split {
        if at_eof && window.is_empty() {
            return Split::Finished;
        }

        if let Some(pos) = self.find(window) {
            return Split::Token {
                advance: pos + self.delimiter.len(),
                token: 0..pos,
            };
        }

        // 流末尾的最后一条记录可以不带分隔符。
        if at_eof {
            return Split::Token {
                advance: window.len(),
                token: 0..window.len(),
            };
        }

        Split::NeedMore
    }
}
