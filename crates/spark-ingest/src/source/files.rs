//! 文件流工厂：把单个文件或整棵目录树依次打开为字节流。

use std::{
    collections::VecDeque,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use tracing::debug;

use super::StreamFactory;

/// 依次打开路径下所有常规文件的流工厂。
///
/// # 教案式说明
/// - **意图 (Why)**：为“读取一个目录下的所有日志文件”这类场景提供现成工厂，
///   每个文件读尽后读取器重连即自动推进到下一个文件。
/// - **执行 (How)**：首次调用 [`StreamFactory::next_stream`] 时递归遍历根路径，
///   收集常规文件并按路径字典序排序；此后每次调用打开队首文件。
/// - **契约 (What)**：
///   - 根路径为文件时只产出一个流；
///   - 打开失败以 `io::Error` 原样返回，失败的文件已出队，再次调用会继续下一个；
///   - 遍历失败同样原样返回，但此后工厂不再产出任何流；
///   - [`FileStreamFactory::current_path`] 返回最近一次成功打开的文件，外层包装可据此附加 `path` 元数据。
/// - **风险 (Trade-offs)**：遍历结果在首次调用时固定，之后新增的文件不会被读取。
#[derive(Debug)]
pub struct FileStreamFactory {
    root: PathBuf,
    pending: Option<VecDeque<PathBuf>>,
    current: Option<PathBuf>,
}

impl FileStreamFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pending: None,
            current: None,
        }
    }

    /// 最近一次成功打开的文件路径。
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// 尚未打开的文件数量；遍历尚未发生时返回 `None`。
    pub fn remaining(&self) -> Option<usize> {
        self.pending.as_ref().map(VecDeque::len)
    }

    fn pending(&mut self) -> io::Result<&mut VecDeque<PathBuf>> {
        if self.pending.is_none() {
            let mut files = Vec::new();
            if let Err(err) = collect_files(&self.root, &mut files) {
                // 遍历失败只报告一次，之后工厂视为耗尽。
                self.pending = Some(VecDeque::new());
                return Err(err);
            }
            files.sort();
            debug!(root = %self.root.display(), files = files.len(), "walked file source root");
            self.pending = Some(files.into());
        }
        Ok(self.pending.get_or_insert_with(VecDeque::new))
    }
}

impl StreamFactory for FileStreamFactory {
    type Handle = File;

    fn next_stream(&mut self) -> io::Result<Option<File>> {
        let Some(path) = self.pending()?.pop_front() else {
            self.current = None;
            return Ok(None);
        };
        let file = File::open(&path)?;
        debug!(path = %path.display(), "opened file stream");
        self.current = Some(path);
        Ok(Some(file))
    }
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    if metadata.is_file() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            collect_files(&entry?.path(), files)?;
        }
    }
    Ok(())
}
