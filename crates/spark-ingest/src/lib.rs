#![deny(unsafe_code)]

//! `spark-ingest` 是摄取流水线的前端：把任意字节流切分为离散、可确认的消息。
//!
//! # 模块定位（Why）
//! - 流工厂逐个打开字节流，读取器按可配置的分隔符切出记录，组装为单段或多段消息；
//! - 消息段是内部记录区的零拷贝视图，在调用方确认之前保持不变；
//! - 当前流读尽后，调用方再次 `connect` 即可透明地切换到下一个流，工厂耗尽则读取器永久关闭。
//!
//! # 使用概览（How）
//!
//! ```
//! use std::io::Cursor;
//! use spark_ingest::{IngestError, LineReader, LinesConfig, MessageReader, source};
//!
//! let factory = source::iter_streams(vec![Ok(Cursor::new(b"a\nb\n".to_vec()))]);
//! let mut reader = LineReader::new(factory, || {}, LinesConfig::default())?;
//! reader.connect()?;
//! assert_eq!(reader.read()?.payloads(), vec![b"a".as_slice()]);
//! assert_eq!(reader.read()?.payloads(), vec![b"b".as_slice()]);
//! reader.acknowledge(None)?;
//! assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
//! assert!(matches!(reader.connect(), Err(IngestError::Closed)));
//! # Ok::<(), IngestError>(())
//! ```
//!
//! # 合约说明（What）
//! - [`MessageReader`] 是对流水线暴露的能力面，由 [`LineReader`] 与 [`Preserver`] 实现；
//! - 同一读取器实例上的调用需要串行，只有关闭信号允许跨线程触发（见 [`CloseHandle`]）；
//! - 读取器内部不做任何重试，重投语义由 [`Preserver`] 之类的外层包装提供。

mod arena;
pub mod config;
pub mod error;
mod input;
mod message;
mod preserver;
mod reader;
pub mod scanner;
pub mod source;
pub mod split;
#[cfg(feature = "cli")]
pub mod telemetry;

pub use arena::RecordArena;
pub use config::LinesConfig;
pub use error::{IngestError, Result};
pub use input::MessageReader;
pub use message::{Message, Part};
pub use preserver::Preserver;
pub use reader::{CloseHandle, LineReader, SessionState, UnblockHook};
pub use source::{FileStreamFactory, StreamFactory};
