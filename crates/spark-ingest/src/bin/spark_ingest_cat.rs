//! `spark-ingest-cat`：把文件或目录下所有文件按分隔符切分并逐条输出。
//!
//! 单段模式下每条消息输出一行；多段模式下消息内每段一行，消息之间以空行分隔。
//! 日志写往 stderr，级别由 `RUST_LOG` 控制。

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use spark_ingest::{
    FileStreamFactory, IngestError, LineReader, LinesConfig, MessageReader, Preserver, telemetry,
};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "spark-ingest-cat", version, about = "按分隔符切分文件并输出消息")]
struct Cli {
    /// 要读取的文件或目录。
    path: PathBuf,

    /// TOML 配置文件；命令行参数覆盖其中的同名项。
    #[arg(long)]
    config: Option<PathBuf>,

    /// 记录分隔符。
    #[arg(long)]
    delimiter: Option<String>,

    /// 查找分隔符时最多缓冲的字节数。
    #[arg(long)]
    max_token_size: Option<usize>,

    /// 以空记录分组的多段消息模式。
    #[arg(long)]
    multipart: bool,
}

impl Cli {
    fn lines_config(&self) -> Result<LinesConfig, IngestError> {
        let mut config = match &self.config {
            Some(path) => LinesConfig::from_toml_str(&fs::read_to_string(path)?)?,
            None => LinesConfig::default(),
        };
        if let Some(delimiter) = &self.delimiter {
            config = config.with_delimiter(delimiter.clone());
        }
        if let Some(max_token_size) = self.max_token_size {
            config = config.with_max_token_size(max_token_size);
        }
        if self.multipart {
            config = config.with_multipart(true);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = telemetry::init("info") {
        eprintln!("failed to install tracing subscriber: {err}");
    }

    match run(&cli) {
        Ok(messages) => {
            info!(messages, "all streams consumed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, kind = err.kind_label(), "ingest failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<u64, IngestError> {
    let config = cli.lines_config()?;
    let multipart = config.multipart;
    // 读取发生在主线程，文件读取不会无限阻塞，因此不需要解阻塞动作。
    let reader = LineReader::new(FileStreamFactory::new(&cli.path), || {}, config)?;
    let mut input = Preserver::new(reader);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut messages = 0u64;

    loop {
        match input.connect() {
            Ok(()) => {}
            Err(IngestError::Closed) => break,
            Err(err) if err.is_recoverable() => {
                error!(error = %err, "skipping stream that failed to open");
                continue;
            }
            Err(err) => return Err(err),
        }

        loop {
            let message = match input.read() {
                Ok(message) => message,
                Err(IngestError::NotConnected) => break,
                Err(err) if err.is_recoverable() => {
                    error!(error = %err, kind = err.kind_label(), "abandoning stream");
                    break;
                }
                Err(err) => return Err(err),
            };

            let written = write_message(&mut out, &message, multipart);
            let failure = written.as_ref().err().map(|err| err as &dyn std::error::Error);
            input.acknowledge(failure)?;
            written?;
            messages += 1;
        }
    }

    out.flush()?;
    input.wait_for_close(Duration::from_secs(1))?;
    Ok(messages)
}

fn write_message(
    out: &mut impl Write,
    message: &spark_ingest::Message,
    multipart: bool,
) -> io::Result<()> {
    for part in message {
        out.write_all(part.as_bytes())?;
        out.write_all(b"\n")?;
    }
    if multipart {
        out.write_all(b"\n")?;
    }
    Ok(())
}
