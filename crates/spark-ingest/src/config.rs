//! 行读取器的显式配置。
//!
//! # 设计概要（How）
//! - 所有可调项集中在 [`LinesConfig`]，字段具名且带默认值，可从 TOML 片段反序列化；
//! - [`LinesConfig::validate`] 在构造读取器之前执行，非法配置不会进入运行期。

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// 默认分隔符：换行。
pub const DEFAULT_DELIMITER: &str = "\n";

/// 默认最大记录缓冲：64 KiB，与常见扫描器的单记录上限一致。
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 64 * 1024;

/// 记录区默认分段容量。
pub const DEFAULT_SEGMENT_CAPACITY: usize = 64 * 1024;

/// 行分隔读取器配置。
///
/// # 教案式说明
/// - **意图 (Why)**：以一个值对象描述分隔符、记录上限、多段模式与记录区分段大小，
///   读取器在构造时一次性校验，避免运行中途才发现配置非法。
/// - **契约 (What)**：
///   - `delimiter`：非空字节序列，可为多字节（例如 `"\r\n"`）；
///   - `max_token_size`：查找分隔符时最多缓冲的字节数，必须大于分隔符长度；
///   - `multipart`：开启后连续非空记录组成一条多段消息，以空记录收尾；
///   - `segment_capacity`：记录区每个分段的预分配容量，必须大于 0。
/// - **风险 (Trade-offs)**：`segment_capacity` 过小会导致频繁分配新分段；过大则在低流量时占用更多内存。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinesConfig {
    pub delimiter: String,
    pub max_token_size: usize,
    pub multipart: bool,
    pub segment_capacity: usize,
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_owned(),
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
            multipart: false,
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
        }
    }
}

impl LinesConfig {
    /// 从 TOML 文本解析配置并立即校验。
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: LinesConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 替换分隔符。
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// 替换最大记录缓冲。
    pub fn with_max_token_size(mut self, max_token_size: usize) -> Self {
        self.max_token_size = max_token_size;
        self
    }

    /// 切换多段消息模式。
    pub fn with_multipart(mut self, multipart: bool) -> Self {
        self.multipart = multipart;
        self
    }

    /// 替换记录区分段容量。
    pub fn with_segment_capacity(mut self, segment_capacity: usize) -> Self {
        self.segment_capacity = segment_capacity;
        self
    }

    /// 分隔符的原始字节。
    pub fn delimiter_bytes(&self) -> &[u8] {
        self.delimiter.as_bytes()
    }

    /// 校验配置的内部一致性。
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(IngestError::invalid_config(
                "delimiter",
                "delimiter must contain at least one byte",
            ));
        }
        if self.max_token_size <= self.delimiter.len() {
            return Err(IngestError::invalid_config(
                "max_token_size",
                format!(
                    "max_token_size {} must exceed the delimiter length {}",
                    self.max_token_size,
                    self.delimiter.len()
                ),
            ));
        }
        if self.segment_capacity == 0 {
            return Err(IngestError::invalid_config(
                "segment_capacity",
                "segment_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
