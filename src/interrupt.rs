//! User interrupt plumbing.
//!
//! Ctrl-C does not abort the harness directly. It raises a flag that the
//! workload generator checks between images and the process driver selects
//! on, so every stage returns normally and the workspace cleanup still runs.

use log::warn;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Raising side. Dropping it without raising leaves the interrupt unraised.
pub struct InterruptTrigger {
    tx: watch::Sender<bool>,
}

impl InterruptTrigger {
    pub fn raise(&self) {
        self.tx.send_replace(true);
    }
}

/// Observing side, cheap to clone and hand to each stage.
#[derive(Clone, Debug)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    pub fn new() -> (InterruptTrigger, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptTrigger { tx }, Interrupt { rx })
    }

    /// An interrupt that can never be raised.
    pub fn never() -> Interrupt {
        Interrupt::new().1
    }

    pub fn is_raised(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt is raised; pends forever if it never can be.
    pub async fn raised(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|raised| *raised).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Spawns a task that raises `trigger` on the first Ctrl-C.
pub fn watch_ctrl_c(trigger: InterruptTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted by user, stopping after the current step");
            trigger.raise();
        }
    })
}
