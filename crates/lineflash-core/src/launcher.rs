//! Process launcher
//!
//! Spawns the flashing tool with stdout and stderr sharing one pipe, so the
//! output is a single line stream in the order the tool wrote it. The
//! orchestrator only talks to the [`ProcessLauncher`] and [`RunningProcess`]
//! traits so tests can replace the real child process.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::Stdio;
use std::thread;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::dispatch::FlashCommand;

/// Exit of a flashing process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A launched flashing process
#[async_trait]
pub trait RunningProcess: Send {
    /// Next line of merged output, `None` once the output is closed
    async fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> io::Result<ExitOutcome>;

    /// Force-terminate the process
    async fn kill(&mut self) -> io::Result<()>;
}

/// Starts flashing processes
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &FlashCommand) -> io::Result<Box<dyn RunningProcess>>;
}

/// Launcher spawning real child processes with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, command: &FlashCommand) -> io::Result<Box<dyn RunningProcess>> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let (reader, writer) = io::pipe()?;
        cmd.stdout(writer.try_clone()?).stderr(writer);

        let child = cmd.spawn()?;
        // The command still owns the parent's write ends; the reader only
        // sees EOF once they are closed.
        drop(cmd);

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        thread::Builder::new()
            .name("flash-output".to_string())
            .spawn(move || forward_lines(reader, tx))?;
        let output = ReceiverStream::new(rx).boxed();

        Ok(Box::new(ChildProcess { child, output }))
    }
}

const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Read `\n`-terminated lines until EOF or until the receiver goes away.
fn forward_lines(reader: PipeReader, tx: mpsc::Sender<io::Result<Vec<u8>>>) {
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if tx.blocking_send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

struct ChildProcess {
    child: Child,
    output: BoxStream<'static, io::Result<Vec<u8>>>,
}

#[async_trait]
impl RunningProcess for ChildProcess {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.output.next().await {
            Some(Ok(bytes)) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> io::Result<ExitOutcome> {
        let status = self.child.wait().await?;
        Ok(ExitOutcome {
            code: status.code(),
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> FlashCommand {
        FlashCommand::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            std::env::temp_dir(),
        )
    }

    async fn collect(process: &mut Box<dyn RunningProcess>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = process.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_merges_stdout_and_stderr() {
        let mut process = SystemLauncher
            .launch(&sh("echo one; echo two 1>&2; echo three"))
            .unwrap();

        let lines = collect(&mut process).await;
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert!(process.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_merged_output_keeps_emission_order() {
        let mut process = SystemLauncher
            .launch(&sh(
                "echo out1; echo out2; echo out3; echo err1 1>&2; echo out4; echo err2 1>&2",
            ))
            .unwrap();

        let lines = collect(&mut process).await;
        assert_eq!(lines, vec!["out1", "out2", "out3", "err1", "out4", "err2"]);
        assert!(process.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_partial_last_line_is_delivered() {
        let mut process = SystemLauncher
            .launch(&sh("echo first; printf 'no newline'"))
            .unwrap();

        assert_eq!(collect(&mut process).await, vec!["first", "no newline"]);
    }

    #[tokio::test]
    async fn test_reports_exit_code() {
        let mut process = SystemLauncher.launch(&sh("echo failing; exit 3")).unwrap();
        collect(&mut process).await;
        assert_eq!(process.wait().await.unwrap().code, Some(3));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let command = FlashCommand::new(
            vec!["nonexistent_flash_tool_12345".to_string()],
            std::env::temp_dir(),
        );
        assert!(SystemLauncher.launch(&command).is_err());
    }
}
