//! 消息与消息段。

use std::ops::Deref;

use bytes::Bytes;

/// 消息中的一段负载：记录区内某段字节的只读、封顶视图。
///
/// # 契约说明（What）
/// - 视图长度在创建时确定，之后记录区的任何追加都无法延伸或改写它；
/// - 克隆只增加引用计数，不复制字节。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Part {
    bytes: Bytes,
}

impl Part {
    pub(crate) fn from_bytes(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// 负载字节。
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Deref for Part {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Part {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// 一条消息：按记录产出顺序排列的若干消息段。
///
/// # 教案式说明
/// - **意图 (Why)**：单段模式下一条记录即一条消息；多段模式下连续的非空记录被组装为一条消息，
///   以空记录作为组结束标记。
/// - **契约 (What)**：读取器成功返回的消息至少包含一段；段的顺序即记录在流中的顺序。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一段负载。
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// 各段负载的字节视图，测试与日志中常用。
    pub fn payloads(&self) -> Vec<&[u8]> {
        self.parts.iter().map(Part::as_bytes).collect()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl IntoIterator for Message {
    type Item = Part;
    type IntoIter = std::vec::IntoIter<Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}
