//! Supervisor for the local API sidecar (the service behind
//! `http://localhost:8008/`).
//!
//! One child at most. Its stdout/stderr are forwarded to the log; stopping
//! kills the whole process tree so helper processes spawned by the service
//! don't outlive it.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::platform::{kill_process_tree, silent_command};

#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("API server executable '{program}' not found: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to spawn API server: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stop API server: {0}")]
    Stop(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

impl StartOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Started => "API server started successfully",
            Self::AlreadyRunning => "API server is already running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

impl StopOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Stopped => "API server stopped successfully",
            Self::NotRunning => "API server is not running",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub program: String,
}

pub struct SidecarManager {
    program: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl SidecarManager {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: Mutex::new(None),
        }
    }

    fn resolve_program(&self) -> Result<PathBuf, SidecarError> {
        which::which(&self.program).map_err(|source| SidecarError::NotFound {
            program: self.program.clone(),
            source,
        })
    }

    /// Spawn the sidecar unless one is already running.
    pub async fn start(&self) -> Result<StartOutcome, SidecarError> {
        let mut child_lock = self.child.lock().await;

        if let Some(child) = child_lock.as_mut() {
            match child.try_wait() {
                Ok(None) => {
                    log::info!("API server is already running");
                    return Ok(StartOutcome::AlreadyRunning);
                }
                Ok(Some(status)) => {
                    log::info!("API Process Terminated with status: {status}");
                }
                Err(e) => log::warn!("Failed to check API server status: {e}"),
            }
            *child_lock = None;
        }

        log::info!("Attempting to start API server...");
        let program = self.resolve_program()?;

        let mut command = Command::from(silent_command(&program));
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so stop() can take down the whole tree
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|source| SidecarError::Spawn { source })?;
        log::info!(
            "API server process spawned successfully (pid={:?})",
            child.id()
        );

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::spawn(async move {
            log::trace!("Starting to listen for API server output");
            tokio::join!(
                forward_lines(stdout, |line| log::info!("API: {line}")),
                forward_lines(stderr, |line| log::warn!("API Info: {line}")),
            );
            log::trace!("Stopped listening for API server output");
        });

        *child_lock = Some(child);
        log::info!("API server started successfully");
        Ok(StartOutcome::Started)
    }

    /// Kill the sidecar's process tree and reap it.
    pub async fn stop(&self) -> Result<StopOutcome, SidecarError> {
        let mut child_lock = self.child.lock().await;

        let Some(mut child) = child_lock.take() else {
            log::info!("API server is not running");
            return Ok(StopOutcome::NotRunning);
        };

        log::info!("Attempting to stop API server");
        // `id()` is None once the child has been reaped, leaving nothing to kill
        if let Some(pid) = child.id() {
            if let Err(e) = kill_process_tree(pid) {
                log::warn!("Failed to terminate API server process tree: {e}");
                child
                    .start_kill()
                    .map_err(|e| SidecarError::Stop(e.to_string()))?;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| SidecarError::Stop(e.to_string()))?;
        log::info!("API Process Terminated with status: {status}");
        Ok(StopOutcome::Stopped)
    }

    pub async fn status(&self) -> SidecarStatus {
        let mut child_lock = self.child.lock().await;

        let probe = child_lock
            .as_mut()
            .map(|child| (child.try_wait(), child.id()));
        let pid = match probe {
            Some((Ok(None), pid)) => pid,
            Some((Ok(Some(status)), _)) => {
                log::info!("API Process Terminated with status: {status}");
                *child_lock = None;
                None
            }
            Some((Err(e), _)) => {
                log::warn!("Failed to check API server status: {e}");
                None
            }
            None => None,
        };

        SidecarStatus {
            running: pid.is_some(),
            pid,
            program: self.program.clone(),
        }
    }
}

async fn forward_lines<R, F>(stream: Option<R>, emit: F)
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let Some(stream) = stream else {
        return;
    };
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => emit(&line),
            Ok(None) => break,
            Err(e) => {
                log::warn!("API Process Error: {e}");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::platform::is_process_alive;

    #[tokio::test]
    async fn start_status_stop_cycle() {
        let sidecar = SidecarManager::new("sleep", vec!["30".to_string()]);

        assert_eq!(sidecar.start().await.unwrap(), StartOutcome::Started);
        let status = sidecar.status().await;
        assert!(status.running);
        let pid = status.pid.unwrap();
        assert!(is_process_alive(pid));

        assert_eq!(sidecar.start().await.unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(sidecar.status().await.pid, Some(pid));

        assert_eq!(sidecar.stop().await.unwrap(), StopOutcome::Stopped);
        assert!(!sidecar.status().await.running);
        assert!(!is_process_alive(pid));

        assert_eq!(sidecar.stop().await.unwrap(), StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn exited_sidecar_is_reported_and_restartable() {
        let sidecar = SidecarManager::new("true", Vec::new());
        sidecar.start().await.unwrap();

        // `true` exits immediately; poll until it has been reaped
        for _ in 0..200 {
            if !sidecar.status().await.running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!sidecar.status().await.running);

        assert_eq!(sidecar.start().await.unwrap(), StartOutcome::Started);
        sidecar.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stopping_an_already_exited_sidecar_reaps_it() {
        let sidecar = SidecarManager::new("true", Vec::new());
        sidecar.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(sidecar.stop().await.unwrap(), StopOutcome::Stopped);
        assert!(!sidecar.status().await.running);
        assert_eq!(sidecar.stop().await.unwrap(), StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let sidecar = SidecarManager::new("greetdesk-no-such-sidecar", Vec::new());
        assert!(matches!(
            sidecar.start().await,
            Err(SidecarError::NotFound { .. })
        ));
        assert!(!sidecar.status().await.running);
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(StartOutcome::AlreadyRunning.message(), "API server is already running");
        assert_eq!(StopOutcome::NotRunning.message(), "API server is not running");
    }
}
