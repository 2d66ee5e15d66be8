//! 流工厂：为读取器按需打开下一个字节流。
//!
//! # 契约说明（What）
//! - [`StreamFactory::next_stream`] 返回 `Ok(Some(handle))` 表示新句柄；
//! - 返回 `Ok(None)` 表示不会再有新流，读取器据此永久关闭，这不是错误；
//! - 返回 `Err` 表示本次打开失败，读取器原样上报，调用方可以再次 `connect` 重试；
//! - 工厂在交出句柄后必须允许再次调用，以获取后续的流。

use std::io::{self, Read};

pub mod files;

pub use files::FileStreamFactory;

/// 句柄生产者。
///
/// 句柄在被读取器释放时直接 `drop`，实现 `Drop` 的句柄（例如文件）借此关闭底层资源。
pub trait StreamFactory {
    /// 产出的字节流类型。
    type Handle: Read;

    /// 打开下一个字节流。
    fn next_stream(&mut self) -> io::Result<Option<Self::Handle>>;
}

impl<F: StreamFactory + ?Sized> StreamFactory for Box<F> {
    type Handle = F::Handle;

    fn next_stream(&mut self) -> io::Result<Option<Self::Handle>> {
        (**self).next_stream()
    }
}

/// 以闭包充当流工厂。
#[derive(Debug)]
pub struct FnStreamFactory<F> {
    open: F,
}

/// 用闭包构造流工厂。
///
/// ```
/// use std::io::Cursor;
/// use spark_ingest::source::{from_fn, StreamFactory};
///
/// let mut served = false;
/// let mut factory = from_fn(move || {
///     if served {
///         return Ok(None);
///     }
///     served = true;
///     Ok(Some(Cursor::new(b"a\nb\n".to_vec())))
/// });
/// assert!(factory.next_stream().unwrap().is_some());
/// assert!(factory.next_stream().unwrap().is_none());
/// ```
pub fn from_fn<F, H>(open: F) -> FnStreamFactory<F>
where
    F: FnMut() -> io::Result<Option<H>>,
    H: Read,
{
    FnStreamFactory { open }
}

impl<F, H> StreamFactory for FnStreamFactory<F>
where
    F: FnMut() -> io::Result<Option<H>>,
    H: Read,
{
    type Handle = H;

    fn next_stream(&mut self) -> io::Result<Option<H>> {
        (self.open)()
    }
}

/// 以迭代器充当流工厂：迭代器耗尽即视为没有更多流。
#[derive(Debug)]
pub struct IterStreamFactory<I> {
    streams: I,
}

/// 用一组句柄（或打开结果）构造流工厂。
pub fn iter_streams<I, H>(streams: I) -> IterStreamFactory<I::IntoIter>
where
    I: IntoIterator<Item = io::Result<H>>,
    H: Read,
{
    IterStreamFactory {
        streams: streams.into_iter(),
    }
}

impl<I, H> StreamFactory for IterStreamFactory<I>
where
    I: Iterator<Item = io::Result<H>>,
    H: Read,
{
    type Handle = H;

    fn next_stream(&mut self) -> io::Result<Option<H>> {
        self.streams.next().transpose()
    }
}
