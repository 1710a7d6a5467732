use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Structured-concurrency root: a [`CancellationToken`] every spawned task
/// holds a clone of, plus a [`JoinSet`] tracking their handles so `main` can
/// join everything before closing the storage connection (the "guaranteed
/// finalizer" every scope needs).
///
/// Mirrors the spawn-and-track shape in the teacher's consensus task loop,
/// generalized from a bare `ctrl_c()` branch to a token threaded through
/// every component.
#[derive(Debug)]
pub struct TaskManager {
    token: CancellationToken,
    tasks: JoinSet<()>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self { token: CancellationToken::new(), tasks: JoinSet::new() }
    }

    /// A clone of the root cancellation token, to hand to a spawned task.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn a future onto the runtime and track its handle.
    pub fn spawn(&mut self, fut: impl std::future::Future<Output = ()> + Send + 'static) {
        self.tasks.spawn(fut);
    }

    /// Cancel the root token, signalling every descendant to wind down.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Wait for every tracked task to finish. Call after [`Self::shutdown`]
    /// to block until the scope has fully drained.
    pub async fn join_all(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(error) = result {
                if error.is_panic() {
                    tracing::error!(target: "tasks", %error, "a spawned task panicked");
                }
            }
        }
    }
}

/// Wait for either `SIGINT` or `SIGTERM` (unix) / Ctrl-C (other platforms).
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
