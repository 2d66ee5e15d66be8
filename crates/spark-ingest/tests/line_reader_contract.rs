//! `line_reader_contract` 集成测试：聚焦 `LineReader` 的连接、读取、确认与关闭契约。
//!
//! # 测试总览（Why）
//! - 校验单段/多段消息的组装规则与流读尽、工厂耗尽时的信号；
//! - 校验确认协议与记录区游标之间的关系，确认已发出的消息段不会被后续写入破坏；
//! - 校验超长记录、工厂失败与跨线程关闭信号的行为。

use std::{
    collections::VecDeque,
    io::{self, Cursor, Read},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use proptest::prelude::*;
use spark_ingest::{
    IngestError, LineReader, LinesConfig, Message, MessageReader, SessionState, StreamFactory,
    source::{from_fn, iter_streams},
};

fn cursors(inputs: &[&[u8]]) -> Vec<io::Result<Cursor<Vec<u8>>>> {
    inputs
        .iter()
        .map(|input| Ok(Cursor::new(input.to_vec())))
        .collect()
}

fn reader(
    inputs: &[&[u8]],
    config: LinesConfig,
) -> LineReader<impl StreamFactory<Handle = Cursor<Vec<u8>>> + use<>> {
    LineReader::new(iter_streams(cursors(inputs)), || {}, config).expect("合法配置")
}

fn payloads(message: &Message) -> Vec<Vec<u8>> {
    message.iter().map(|part| part.to_vec()).collect()
}

/// 逐条记录输出单段消息，读尽后返回 NotConnected。
#[test]
fn single_part_mode_yields_one_message_per_record() {
    let mut reader = reader(&[b"a\nb\nc\n"], LinesConfig::default());
    reader.connect().expect("连接应成功");
    for expected in [b"a", b"b", b"c"] {
        let message = reader.read().expect("应读到一条消息");
        assert_eq!(payloads(&message), vec![expected.to_vec()]);
    }
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
    assert_eq!(reader.state(), SessionState::Disconnected);
}

/// 多段模式以空记录分组。
#[test]
fn multipart_mode_groups_until_empty_record() {
    let mut reader = reader(
        &[b"a\nb\n\nc\n\n"],
        LinesConfig::default().with_multipart(true),
    );
    reader.connect().expect("连接应成功");
    let first = reader.read().expect("第一组");
    assert_eq!(payloads(&first), vec![b"a".to_vec(), b"b".to_vec()]);
    let second = reader.read().expect("第二组");
    assert_eq!(payloads(&second), vec![b"c".to_vec()]);
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
}

/// 流末尾未以空记录收尾的多段组仍会被交付。
#[test]
fn multipart_trailing_group_is_delivered_on_drain() {
    let mut reader = reader(&[b"x\ny"], LinesConfig::default().with_multipart(true));
    reader.connect().expect("连接应成功");
    let message = reader.read().expect("末尾组应被交付");
    assert_eq!(payloads(&message), vec![b"x".to_vec(), b"y".to_vec()]);
    assert_eq!(reader.state(), SessionState::Disconnected);
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
}

/// 前导空行被跳过，不会产生空消息。
#[test]
fn leading_blank_records_are_skipped() {
    let mut reader = reader(&[b"\n\n\nfirst\n\n\nsecond"], LinesConfig::default());
    reader.connect().expect("连接应成功");
    assert_eq!(payloads(&reader.read().expect("first")), vec![b"first".to_vec()]);
    assert_eq!(payloads(&reader.read().expect("second")), vec![b"second".to_vec()]);
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
}

/// 自定义多字节分隔符。
#[test]
fn custom_delimiter_splits_records() {
    let mut reader = reader(
        &[b"one<>two<>three"],
        LinesConfig::default().with_delimiter("<>"),
    );
    reader.connect().expect("连接应成功");
    let mut seen = Vec::new();
    while let Ok(message) = reader.read() {
        seen.extend(payloads(&message));
    }
    assert_eq!(
        seen,
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
}

/// 读尽当前流后重新连接，透明推进到下一个流，最终报告永久关闭。
#[test]
fn reconnect_advances_through_streams_then_closes() {
    let mut reader = reader(&[b"a\n", b"", b"b\nc"], LinesConfig::default());
    let mut seen = Vec::new();
    loop {
        match reader.connect() {
            Ok(()) => {}
            Err(IngestError::Closed) => break,
            Err(err) => panic!("unexpected connect error: {err}"),
        }
        loop {
            match reader.read() {
                Ok(message) => seen.extend(payloads(&message)),
                Err(IngestError::NotConnected) => break,
                Err(err) => panic!("unexpected read error: {err}"),
            }
        }
        reader.acknowledge(None).expect("确认不会失败");
    }
    assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(reader.state(), SessionState::PermanentlyClosed);
}

/// 工厂耗尽后 connect 返回 Closed，且不再向工厂索取句柄。
#[test]
fn exhausted_factory_is_never_consulted_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let factory = from_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None::<Cursor<Vec<u8>>>)
    });
    let mut reader = LineReader::new(factory, || {}, LinesConfig::default()).expect("构造");
    assert!(matches!(reader.connect(), Err(IngestError::Closed)));
    assert!(matches!(reader.connect(), Err(IngestError::Closed)));
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.state(), SessionState::PermanentlyClosed);
}

/// 工厂的其他失败原样上报，状态保持 Disconnected，可以重试。
#[test]
fn factory_failure_is_propagated_and_retryable() {
    let mut reader = LineReader::new(
        iter_streams(vec![
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(Cursor::new(b"ok\n".to_vec())),
        ]),
        || {},
        LinesConfig::default(),
    )
    .expect("构造");
    match reader.connect() {
        Err(IngestError::Io(err)) => {
            assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
            assert_eq!(err.to_string(), "denied");
        }
        other => panic!("unexpected connect outcome: {other:?}"),
    }
    assert_eq!(reader.state(), SessionState::Disconnected);
    reader.connect().expect("重试应成功");
    assert_eq!(payloads(&reader.read().expect("ok")), vec![b"ok".to_vec()]);
}

/// 成功确认把游标归零；确认前发出的消息段不会被之后的写入改变或延伸。
#[test]
fn acknowledge_success_resets_cursor_without_touching_old_parts() {
    let mut reader = reader(
        &[b"aaa\nbbb\nccc\ndddd\n"],
        LinesConfig::default().with_segment_capacity(4),
    );
    reader.connect().expect("连接应成功");
    let first = reader.read().expect("aaa");
    let second = reader.read().expect("bbb");
    assert_eq!(reader.buffered_bytes(), 6);

    let first_part = first.get(0).expect("单段").clone();
    let second_part = second.get(0).expect("单段").clone();
    let first_ptr = first_part.as_ptr();

    reader.acknowledge(None).expect("确认不会失败");
    assert_eq!(reader.buffered_bytes(), 0);

    let third = reader.read().expect("ccc");
    let fourth = reader.read().expect("dddd");
    assert_eq!(reader.buffered_bytes(), 7);
    assert_eq!(first_part.as_bytes(), b"aaa");
    assert_eq!(first_part.len(), 3);
    assert_eq!(first_part.as_ptr(), first_ptr);
    assert_eq!(second_part.as_bytes(), b"bbb");
    assert_eq!(payloads(&third), vec![b"ccc".to_vec()]);
    assert_eq!(payloads(&fourth), vec![b"dddd".to_vec()]);
}

/// 失败确认不改变游标，之后的读取不会破坏已发出的消息段。
#[test]
fn acknowledge_failure_keeps_buffer_and_parts_intact() {
    let mut reader = reader(
        &[b"one\ntwo\nthree\n"],
        LinesConfig::default().with_segment_capacity(5),
    );
    reader.connect().expect("连接应成功");
    let first = reader.read().expect("one");
    let cursor = reader.buffered_bytes();

    let failure = io::Error::other("sink unavailable");
    reader.acknowledge(Some(&failure)).expect("确认不会失败");
    assert_eq!(reader.buffered_bytes(), cursor);

    let second = reader.read().expect("two");
    let third = reader.read().expect("three");
    assert_eq!(reader.buffered_bytes(), cursor + 3 + 5);
    assert_eq!(payloads(&first), vec![b"one".to_vec()]);
    assert_eq!(payloads(&second), vec![b"two".to_vec()]);
    assert_eq!(payloads(&third), vec![b"three".to_vec()]);
}

/// 超长记录报告 TokenTooLarge 并释放句柄；重连推进到下一个流。
#[test]
fn oversized_record_releases_handle() {
    let mut reader = reader(
        &[b"0123456789abcdef\nshort\n", b"next\n"],
        LinesConfig::default().with_max_token_size(8),
    );
    reader.connect().expect("连接应成功");
    assert!(matches!(
        reader.read(),
        Err(IngestError::TokenTooLarge { limit: 8 })
    ));
    assert_eq!(reader.state(), SessionState::Disconnected);
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));

    reader.connect().expect("重连到下一个流");
    assert_eq!(payloads(&reader.read().expect("next")), vec![b"next".to_vec()]);
}

/// 底层读取失败原样上报并释放句柄。
#[test]
fn handle_read_error_is_propagated() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    let mut reader =
        LineReader::new(iter_streams(vec![Ok(Broken)]), || {}, LinesConfig::default())
            .expect("构造");
    reader.connect().expect("连接应成功");
    match reader.read() {
        Err(IngestError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("unexpected read outcome: {other:?}"),
    }
    assert_eq!(reader.state(), SessionState::Disconnected);
    assert!(matches!(reader.connect(), Err(IngestError::Closed)));
}

/// 记录析构次数的句柄，可选择在读取时失败。
struct Tracked {
    inner: Cursor<Vec<u8>>,
    broken: bool,
    drops: Arc<AtomicUsize>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.broken {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated"));
        }
        self.inner.read(buf)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// 读尽、读取失败、超长记录与 wait_for_close 各自恰好析构一个句柄；重复 connect 不会丢弃当前句柄。
#[test]
fn every_exit_path_drops_exactly_one_handle() {
    let drops = Arc::new(AtomicUsize::new(0));
    let tracked = |content: &[u8], broken: bool| -> io::Result<Tracked> {
        Ok(Tracked {
            inner: Cursor::new(content.to_vec()),
            broken,
            drops: Arc::clone(&drops),
        })
    };
    let streams = vec![
        tracked(b"a\n", false),
        tracked(b"", true),
        tracked(b"0123456789abcdef\n", false),
        tracked(b"x\ny\n", false),
    ];
    let mut reader = LineReader::new(
        iter_streams(streams),
        || {},
        LinesConfig::default().with_max_token_size(8),
    )
    .expect("构造");

    reader.connect().expect("第一个流");
    assert_eq!(payloads(&reader.read().expect("a")), vec![b"a".to_vec()]);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    reader.connect().expect("第二个流");
    assert!(matches!(reader.read(), Err(IngestError::Io(_))));
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    reader.connect().expect("第三个流");
    assert!(matches!(
        reader.read(),
        Err(IngestError::TokenTooLarge { limit: 8 })
    ));
    assert_eq!(drops.load(Ordering::SeqCst), 3);

    reader.connect().expect("第四个流");
    assert_eq!(payloads(&reader.read().expect("x")), vec![b"x".to_vec()]);
    reader.connect().expect("已连接时 connect 幂等");
    assert_eq!(drops.load(Ordering::SeqCst), 3);
    reader
        .wait_for_close(Duration::from_millis(10))
        .expect("关闭不会失败");
    assert_eq!(drops.load(Ordering::SeqCst), 4);

    assert!(matches!(reader.connect(), Err(IngestError::Closed)));
    drop(reader);
    assert_eq!(drops.load(Ordering::SeqCst), 4);
}

/// 可阻塞的内存管道：没有数据时 `read` 阻塞，关闭后返回 EOF。
#[derive(Clone, Default)]
struct Pipe {
    shared: Arc<(Mutex<PipeState>, Condvar)>,
}

#[derive(Default)]
struct PipeState {
    data: VecDeque<u8>,
    closed: bool,
}

impl Pipe {
    fn write(&self, bytes: &[u8]) {
        let (state, ready) = &*self.shared;
        state.lock().data.extend(bytes.iter().copied());
        ready.notify_all();
    }

    fn close(&self) {
        let (state, ready) = &*self.shared;
        state.lock().closed = true;
        ready.notify_all();
    }
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (state, ready) = &*self.shared;
        let mut guard = state.lock();
        while guard.data.is_empty() && !guard.closed {
            ready.wait(&mut guard);
        }
        let len = buf.len().min(guard.data.len());
        for (slot, byte) in buf.iter_mut().zip(guard.data.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

/// 阻塞中的 read 在关闭信号触发后于有限时间内返回。
#[test]
fn close_signal_unblocks_a_blocked_read() {
    let pipe = Pipe::default();
    pipe.write(b"first\n");
    let hook_pipe = pipe.clone();
    let mut reader = LineReader::new(
        iter_streams(vec![Ok(pipe.clone())]),
        move || hook_pipe.close(),
        LinesConfig::default(),
    )
    .expect("构造");
    reader.connect().expect("连接应成功");
    assert_eq!(payloads(&reader.read().expect("first")), vec![b"first".to_vec()]);

    let closer = reader.close_handle();
    let (done_tx, done_rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let outcome = reader.read();
        done_tx
            .send(matches!(outcome, Err(IngestError::NotConnected)))
            .expect("主线程仍在等待");
        reader
    });

    assert!(
        done_rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "没有数据时 read 应保持阻塞"
    );
    closer.close();
    let drained = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("关闭信号后 read 应及时返回");
    assert!(drained, "管道关闭后流被视为读尽");

    let mut reader = worker.join().expect("工作线程不应 panic");
    reader
        .wait_for_close(Duration::from_millis(10))
        .expect("关闭不会失败");
    assert_eq!(reader.state(), SessionState::Disconnected);
}

/// close_async 直接触发解阻塞钩子。
#[test]
fn close_async_invokes_unblock_hook() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let reader = LineReader::new(
        iter_streams(cursors(&[b"a\n"])),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        LinesConfig::default(),
    )
    .expect("构造");
    reader.close_async();
    reader.close_handle().close();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

proptest! {
    /// 不含分隔符、且不以分隔符结尾的输入恰好产出一条等于原文的记录。
    #[test]
    fn undelimited_input_is_one_record(
        body in proptest::collection::vec(any::<u8>().prop_filter("no newline", |b| *b != b'\n'), 1..512),
        multipart in any::<bool>(),
    ) {
        let mut reader = reader(&[body.as_slice()], LinesConfig::default().with_multipart(multipart));
        reader.connect().expect("连接应成功");
        let message = reader.read().expect("应读到唯一一条消息");
        prop_assert_eq!(payloads(&message), vec![body.clone()]);
        prop_assert!(matches!(reader.read(), Err(IngestError::NotConnected)));
    }
}
