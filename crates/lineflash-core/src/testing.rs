//! Test doubles for the process launcher and interpreter resolution
//!
//! Lets the orchestrator run end to end without a flashing tool installed.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::dispatch::{FlashCommand, InterpreterResolver};
use crate::launcher::{ExitOutcome, ProcessLauncher, RunningProcess};

/// Resolver answering from a fixed table
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    paths: HashMap<String, PathBuf>,
}

impl StaticResolver {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            paths: entries
                .into_iter()
                .map(|(name, path)| (name.to_string(), PathBuf::from(path)))
                .collect(),
        }
    }

    /// Resolver that finds nothing
    pub fn none() -> Self {
        Self::default()
    }
}

impl InterpreterResolver for StaticResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.paths.get(name).cloned()
    }
}

/// Launcher replaying canned output and exit code.
///
/// A held launcher keeps every process open after its output until
/// [`ScriptedLauncher::release`] is called.
pub struct ScriptedLauncher {
    lines: Vec<String>,
    exit_code: i32,
    spawn_error: Option<String>,
    gate: watch::Sender<bool>,
    launched: Mutex<Vec<FlashCommand>>,
    killed: Arc<AtomicBool>,
}

impl ScriptedLauncher {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>, exit_code: i32) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            exit_code,
            spawn_error: None,
            gate: watch::Sender::new(true),
            launched: Mutex::new(Vec::new()),
            killed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Launcher whose spawn always fails with `message`
    pub fn failing(message: &str) -> Self {
        let mut launcher = Self::new(Vec::<String>::new(), 0);
        launcher.spawn_error = Some(message.to_string());
        launcher
    }

    pub fn held(self) -> Self {
        self.gate.send_replace(false);
        self
    }

    /// Let held processes exit
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Commands passed to `launch`, including failed spawns
    pub fn launched(&self) -> Vec<FlashCommand> {
        self.launched.lock().clone()
    }

    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&self, command: &FlashCommand) -> io::Result<Box<dyn RunningProcess>> {
        self.launched.lock().push(command.clone());
        if let Some(message) = &self.spawn_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
        }
        Ok(Box::new(ScriptedProcess {
            lines: self.lines.clone().into_iter(),
            exit_code: self.exit_code,
            gate: self.gate.subscribe(),
            killed: self.killed.clone(),
        }))
    }
}

struct ScriptedProcess {
    lines: std::vec::IntoIter<String>,
    exit_code: i32,
    gate: watch::Receiver<bool>,
    killed: Arc<AtomicBool>,
}

#[async_trait]
impl RunningProcess for ScriptedProcess {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.lines.next() {
            return Ok(Some(line));
        }
        self.gate
            .wait_for(|open| *open)
            .await
            .map_err(|_| io::Error::other("launcher dropped"))?;
        Ok(None)
    }

    async fn wait(&mut self) -> io::Result<ExitOutcome> {
        Ok(ExitOutcome {
            code: Some(self.exit_code),
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
