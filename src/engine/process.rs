use std::{ffi::OsString, io, path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
    time::timeout,
};

use super::session::{Launcher, UciChannel};
use crate::error::EngineError;

/// How long a process gets to exit after `quit` before it is killed.
const QUIT_GRACE: Duration = Duration::from_millis(100);

/// Starts a UCI engine as a child process talking over stdin/stdout.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    path: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProcessLauncher {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// Adds a command-line argument for the engine.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A running engine. Killed on drop if [`UciChannel::terminate`] was skipped.
pub struct ProcessChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl Launcher for ProcessLauncher {
    type Channel = ProcessChannel;

    async fn launch(&self) -> Result<ProcessChannel, EngineError> {
        let mut child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Unavailable)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(EngineError::Unavailable(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "engine pipes were not captured",
            )));
        };
        log::debug!("spawned {} as pid {:?}", self.path.display(), child.id());
        Ok(ProcessChannel {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl UciChannel for ProcessChannel {
    async fn send(&mut self, line: &str) -> io::Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    async fn recv(&mut self) -> io::Result<Option<String>> {
        self.stdout.next_line().await
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.send("quit").await {
            log::debug!("engine gone before quit: {e}");
        }
        match timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => log::debug!("engine exited with {status}"),
            Ok(Err(e)) => log::warn!("could not wait for engine: {e}"),
            Err(_) => {
                log::warn!("engine ignored quit, killing it");
                if let Err(e) = self.child.kill().await {
                    log::warn!("could not kill engine: {e}");
                }
            }
        }
    }
}
