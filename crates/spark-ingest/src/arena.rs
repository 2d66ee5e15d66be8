//! 记录区：所有已读记录的共享追加存储。
//!
//! # 模块定位（Why）
//! - 读取器交给调用方的每个 [`Part`] 都是记录区中某段字节的视图，必须在确认之前保持不变；
//! - 记录区只追加、不原地改写，也不会在扩容时搬动已有字节，已发出的视图因此始终稳定。
//!
//! # 设计概要（How）
//! - 底层由若干固定容量的 `BytesMut` 分段组成：当前分段剩余空间不足时直接开新分段，旧分段不再写入；
//! - 追加的字节通过 `BytesMut::split` 切出并 `freeze` 为只读 `Bytes`，视图天然封顶，后续追加无法延伸它；
//! - [`RecordArena::reset`] 只把逻辑游标归零并丢弃对旧分段的引用，内存在最后一个视图释放时回收。

use bytes::{BufMut, BytesMut};

use crate::message::Part;

/// 追加式记录区。
///
/// # 教案式说明
/// - **意图 (Why)**：替代“可增长缓冲 + 手工切片”的做法，保证任何已发出的视图不会被后续写入或扩容覆盖。
/// - **契约 (What)**：
///   - [`RecordArena::append`] 把字节复制进当前分段并返回覆盖 `[cursor, cursor + len)` 的只读视图；
///   - 两次 [`RecordArena::reset`] 之间游标单调增长；
///   - `reset` 之后游标为 0，之前发出的视图仍可读，但调用方按确认协议不应再使用它们。
/// - **风险 (Trade-offs)**：确认长期失败时记录区会持续增长，上限由外层重投策略负责。
#[derive(Debug)]
pub struct RecordArena {
    current: BytesMut,
    segment_capacity: usize,
    cursor: usize,
    segments: usize,
}

impl RecordArena {
    /// 以给定分段容量创建空记录区；首个分段在第一次追加时分配。
    pub fn new(segment_capacity: usize) -> Self {
        Self {
            current: BytesMut::new(),
            segment_capacity: segment_capacity.max(1),
            cursor: 0,
            segments: 0,
        }
    }

    /// 追加一条记录并返回其只读视图。
    pub fn append(&mut self, record: &[u8]) -> Part {
        let remaining = self.current.capacity() - self.current.len();
        if record.len() > remaining {
            // 记录大于分段容量时单独成段。
            let capacity = self.segment_capacity.max(record.len());
            self.current = BytesMut::with_capacity(capacity);
            self.segments += 1;
        }

        self.current.put_slice(record);
        self.cursor += record.len();
        Part::from_bytes(self.current.split().freeze())
    }

    /// 逻辑写游标：自上次重置以来追加的总字节数。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 自上次重置以来分配过的分段数量。
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// 是否自上次重置以来没有任何追加。
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// 归零游标并放弃对已写分段的引用。
    pub fn reset(&mut self) {
        // 当前分段未写部分与已发出的视图互不重叠，可以继续复用。
        self.current.clear();
        self.cursor = 0;
        self.segments = usize::from(self.current.capacity() > 0);
    }
}
