use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Draining,
    Stopped,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::Running,
            1 => RunState::Draining,
            _ => RunState::Stopped,
        }
    }
}

/// Shared run lifecycle: `Running -> Draining -> Stopped`, never backwards.
///
/// Cancellation is a broadcast: every clone observes the same token, however
/// many workers are watching it.
#[derive(Debug, Clone)]
pub struct Controller {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(RunState::Running as u8)),
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests cancellation. Returns `true` only for the call that moved the
    /// run from `Running` to `Draining`.
    pub fn interrupt(&self) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                RunState::Running as u8,
                RunState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if transitioned {
            self.token.cancel();
        }
        transitioned
    }

    pub fn stop(&self) {
        self.state.store(RunState::Stopped as u8, Ordering::Release);
    }

    /// Subscribes to SIGINT (and SIGTERM on unix) once and interrupts the run
    /// on the first one received. Listeners are registered before this returns.
    /// The task also exits if the run is cancelled some other way; after a
    /// completed run the caller aborts it.
    pub fn watch_signals(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let listener = ShutdownSignal::register();
        tokio::spawn(async move {
            let mut listener = match listener {
                Ok(listener) => listener,
                Err(e) => {
                    warn!(error = %e, "Failed to listen for interrupt signals");
                    return;
                }
            };
            tokio::select! {
                _ = controller.token.cancelled() => {}
                _ = listener.recv() => {
                    warn!("Interrupt caught, draining workers");
                    controller.interrupt();
                }
            }
        })
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
struct ShutdownSignal {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => info!("SIGTERM received"),
        }
    }
}

#[cfg(windows)]
struct ShutdownSignal {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl ShutdownSignal {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) {
        self.ctrl_c.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_idempotent() {
        let controller = Controller::new();
        assert_eq!(controller.state(), RunState::Running);

        assert!(controller.interrupt());
        assert!(!controller.interrupt());
        assert_eq!(controller.state(), RunState::Draining);
        assert!(controller.is_cancelled());
    }

    #[test]
    fn test_clones_share_cancellation() {
        let controller = Controller::new();
        let observers: Vec<_> = (0..8).map(|_| controller.clone()).collect();

        controller.interrupt();

        assert!(observers.iter().all(|c| c.is_cancelled()));
    }

    #[test]
    fn test_stopped_is_terminal() {
        let controller = Controller::new();
        controller.stop();
        assert!(!controller.interrupt());
        assert_eq!(controller.state(), RunState::Stopped);
        assert!(!controller.is_cancelled());
    }

    #[tokio::test]
    async fn test_watch_signals_exits_on_cancel() {
        let controller = Controller::new();
        let watcher = controller.watch_signals();

        controller.interrupt();

        tokio::time::timeout(std::time::Duration::from_secs(1), watcher)
            .await
            .expect("watcher should exit")
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sigint_moves_run_to_draining() {
        let controller = Controller::new();
        let watcher = controller.watch_signals();

        // SAFETY: the runtime has a SIGINT handler installed by now.
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        tokio::time::timeout(std::time::Duration::from_secs(5), watcher)
            .await
            .expect("watcher should see the signal")
            .unwrap();
        assert_eq!(controller.state(), RunState::Draining);
        assert!(controller.is_cancelled());
    }
}
