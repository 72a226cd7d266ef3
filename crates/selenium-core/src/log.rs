//! Server output redirection into a log file

use selenium_host_api::OutputStream;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Log file opened for appending, one writer per server stream
///
/// Opening is the fallible part of redirection, so it happens before the
/// server's streams are taken.
pub struct LogFile {
    path: PathBuf,
    stdout: File,
    stderr: File,
}

impl LogFile {
    /// Open `path` for appending, creating it and its parent directories if
    /// missing. Existing content is never truncated.
    pub async fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let stderr = stdout.try_clone().await?;

        Ok(Self {
            path: path.to_path_buf(),
            stdout,
            stderr,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start copying the server streams into the file
    pub fn pipe(self, stdout: Option<OutputStream>, stderr: Option<OutputStream>) -> LogPipe {
        let mut tasks = Vec::with_capacity(2);
        if let Some(stream) = stdout {
            tasks.push(tokio::spawn(copy_stream(stream, self.stdout)));
        }
        if let Some(stream) = stderr {
            tasks.push(tokio::spawn(copy_stream(stream, self.stderr)));
        }

        debug!(path = %self.path.display(), streams = tasks.len(), "Server output redirected");

        LogPipe {
            path: Some(self.path),
            tasks,
        }
    }
}

/// Background copies of server output streams
///
/// The copies run until the server closes its streams. Dropping the pipe
/// detaches the tasks; [`LogPipe::finish`] waits for them.
pub struct LogPipe {
    path: Option<PathBuf>,
    tasks: Vec<JoinHandle<io::Result<u64>>>,
}

impl LogPipe {
    /// Read `streams` to the end and throw the output away.
    ///
    /// Unread pipes fill up and block the server on its next write.
    pub fn discard(streams: Vec<OutputStream>) -> Self {
        let tasks = streams
            .into_iter()
            .map(|stream| tokio::spawn(copy_stream(stream, tokio::io::sink())))
            .collect();

        Self { path: None, tasks }
    }

    /// Log file receiving the output, `None` when it is discarded
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Wait for all streams to close; returns the number of bytes copied
    pub async fn finish(self) -> io::Result<u64> {
        let mut total = 0;
        for task in self.tasks {
            total += task.await.map_err(io::Error::other)??;
        }
        Ok(total)
    }
}

async fn copy_stream<W>(mut stream: OutputStream, mut writer: W) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let result = tokio::io::copy(&mut stream, &mut writer).await;
    writer.flush().await?;

    if let Err(e) = &result {
        warn!(error = %e, "Server output copy interrupted");
    }
    result
}
