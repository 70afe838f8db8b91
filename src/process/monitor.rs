//! Process monitor - tracks every OS process spawned during a run
//!
//! All state lives inside a single consumer task. Callers talk to it through
//! a message queue and wait for a reply, so registration and kill-all can
//! never interleave halfway.

use super::TrackedProcess;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("process monitor has shut down")]
    Closed,
}

/// Ids currently tracked and ids killed through the monitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub tracked: Vec<u32>,
    pub killed: Vec<u32>,
}

enum Request {
    Add(Arc<dyn TrackedProcess>, oneshot::Sender<()>),
    Remove(u32, oneshot::Sender<()>),
    Kill(Arc<dyn TrackedProcess>, oneshot::Sender<()>),
    IsKilled(u32, oneshot::Sender<bool>),
    KillAll(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<MonitorSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Default)]
struct MonitorState {
    tracked: HashMap<u32, Arc<dyn TrackedProcess>>,
    killed: HashSet<u32>,
}

impl MonitorState {
    fn add(&mut self, process: Arc<dyn TrackedProcess>) {
        if process.has_exited() {
            debug!("process {} already exited, not tracking", process.id());
            return;
        }
        debug!("tracking process {}", process.id());
        self.tracked.insert(process.id(), process);
    }

    fn kill(&mut self, process: &dyn TrackedProcess) {
        let id = process.id();
        if !process.has_exited() {
            debug!("killing process {}", id);
            if let Err(e) = process.kill() {
                warn!("failed to kill process {}: {}", id, e);
            }
        }
        self.tracked.remove(&id);
        self.killed.insert(id);
    }

    fn kill_all(&mut self) {
        let tracked: Vec<_> = self.tracked.values().cloned().collect();
        for process in tracked {
            self.kill(process.as_ref());
        }
    }

    fn snapshot(&self) -> MonitorSnapshot {
        let mut tracked: Vec<u32> = self.tracked.keys().copied().collect();
        let mut killed: Vec<u32> = self.killed.iter().copied().collect();
        tracked.sort_unstable();
        killed.sort_unstable();
        MonitorSnapshot { tracked, killed }
    }
}

async fn serve(mut requests: mpsc::Receiver<Request>) {
    let mut state = MonitorState::default();

    while let Some(request) = requests.recv().await {
        match request {
            Request::Add(process, reply) => {
                state.add(process);
                let _ = reply.send(());
            }
            Request::Remove(id, reply) => {
                state.tracked.remove(&id);
                let _ = reply.send(());
            }
            Request::Kill(process, reply) => {
                state.kill(process.as_ref());
                let _ = reply.send(());
            }
            Request::IsKilled(id, reply) => {
                let _ = reply.send(state.killed.contains(&id));
            }
            Request::KillAll(reply) => {
                state.kill_all();
                let _ = reply.send(());
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(state.snapshot());
            }
            Request::Shutdown(reply) => {
                requests.close();
                let _ = reply.send(());
                break;
            }
        }
    }

    debug!("process monitor stopped with {} tracked", state.tracked.len());
}

/// Handle to a running process monitor
///
/// Cloning the handle is cheap; every clone talks to the same monitor.
#[derive(Clone)]
pub struct ProcessMonitor {
    requests: mpsc::Sender<Request>,
}

impl fmt::Debug for ProcessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessMonitor")
            .field("closed", &self.requests.is_closed())
            .finish()
    }
}

impl ProcessMonitor {
    /// Start a monitor on the current tokio runtime
    pub fn start() -> Self {
        let (requests, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(serve(receiver));
        Self { requests }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> Request,
    ) -> Result<R, MonitorError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::Closed)?;
        response.await.map_err(|_| MonitorError::Closed)
    }

    /// Track a running process; an already-exited process is ignored
    pub async fn add<P: TrackedProcess + Clone>(&self, process: &P) -> Result<(), MonitorError> {
        let process: Arc<dyn TrackedProcess> = Arc::new(process.clone());
        self.request(|reply| Request::Add(process, reply)).await
    }

    /// Stop tracking a process
    pub async fn remove<P: TrackedProcess>(&self, process: &P) -> Result<(), MonitorError> {
        let id = process.id();
        self.request(|reply| Request::Remove(id, reply)).await
    }

    /// Terminate a process and remember that the monitor killed it
    pub async fn kill<P: TrackedProcess + Clone>(&self, process: &P) -> Result<(), MonitorError> {
        let process: Arc<dyn TrackedProcess> = Arc::new(process.clone());
        self.request(|reply| Request::Kill(process, reply)).await
    }

    /// Whether the monitor killed this process
    pub async fn is_killed<P: TrackedProcess>(&self, process: &P) -> Result<bool, MonitorError> {
        let id = process.id();
        self.request(|reply| Request::IsKilled(id, reply)).await
    }

    /// Kill every tracked process
    pub async fn kill_all(&self) -> Result<(), MonitorError> {
        self.request(Request::KillAll).await
    }

    /// Current tracked and killed ids
    pub async fn snapshot(&self) -> Result<MonitorSnapshot, MonitorError> {
        self.request(Request::Snapshot).await
    }

    /// Stop the monitor; later requests fail with [`MonitorError::Closed`]
    pub async fn shutdown(&self) -> Result<(), MonitorError> {
        self.request(Request::Shutdown).await
    }
}
