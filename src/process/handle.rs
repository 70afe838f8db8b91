//! Handle to a spawned OS process

use super::TrackedProcess;
use std::io;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Exit state published by the waiter task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitState {
    Running,
    /// Exit code, `None` when terminated by a signal
    Exited(Option<i32>),
}

/// A running child process
///
/// The child itself is owned by a waiter task; the handle only observes its
/// exit state and forwards kill requests, so clones can be shared freely
/// between the step waiting on the process and the process monitor.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: u32,
    exit: watch::Receiver<ExitState>,
    kill_requests: mpsc::UnboundedSender<()>,
}

impl ProcessHandle {
    /// Hand ownership of `child` to a waiter task and return the handle
    ///
    /// Kill requests signal the child only. Dropping every clone of the
    /// handle counts as a kill request.
    pub fn watch(child: Child) -> Self {
        Self::spawn_waiter(child, false)
    }

    /// Like [`ProcessHandle::watch`] for a child started as the leader of
    /// its own process group; kills signal the whole group on unix
    pub fn watch_group(child: Child) -> Self {
        Self::spawn_waiter(child, true)
    }

    fn spawn_waiter(mut child: Child, group: bool) -> Self {
        let id = child.id().unwrap_or_default();
        let (exit_tx, exit) = watch::channel(ExitState::Running);
        let (kill_requests, mut kills) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                request = kills.recv() => {
                    if request.is_none() {
                        debug!("every handle to process {} was dropped, killing it", id);
                    }
                    terminate(&mut child, id, group);
                    child.wait().await
                }
            };

            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("failed to wait on process {}: {}", id, e);
                    None
                }
            };
            debug!("process {} exited with {:?}", id, code);
            let _ = exit_tx.send(ExitState::Exited(code));
        });

        Self {
            id,
            exit,
            kill_requests,
        }
    }

    /// Wait for the process to exit and return its exit code
    ///
    /// `None` means the process was terminated by a signal.
    pub async fn wait(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        let code = match exit.wait_for(|state| matches!(state, ExitState::Exited(_))).await {
            Ok(state) => match *state {
                ExitState::Exited(code) => code,
                ExitState::Running => None,
            },
            Err(_) => None,
        };
        code
    }

    /// Exit code if the process has already exited
    pub fn exit_code(&self) -> Option<Option<i32>> {
        match *self.exit.borrow() {
            ExitState::Exited(code) => Some(code),
            ExitState::Running => None,
        }
    }
}

fn terminate(child: &mut Child, id: u32, group: bool) {
    #[cfg(unix)]
    if group && id != 0 {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(id as i32), Signal::SIGKILL) {
            Ok(()) => return,
            Err(e) => warn!("failed to signal process group {}: {}", id, e),
        }
    }
    #[cfg(not(unix))]
    let _ = group;

    if let Err(e) = child.start_kill() {
        warn!("failed to signal process {}: {}", id, e);
    }
}

impl TrackedProcess for ProcessHandle {
    fn id(&self) -> u32 {
        self.id
    }

    fn has_exited(&self) -> bool {
        matches!(*self.exit.borrow(), ExitState::Exited(_))
    }

    fn kill(&self) -> io::Result<()> {
        // A closed channel means the waiter already saw the exit.
        let _ = self.kill_requests.send(());
        Ok(())
    }
}
