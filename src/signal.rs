//! Bridges external stop signals into the running job.
//!
//! The device's pause button needs no bridging: the SDK reports it as status
//! 102 on the run itself. An OS interrupt is different. When one arrives
//! while a job is active the bridge raises the job's [`InterruptFlag`] and
//! releases the plotting handle, which the SDK treats as a halt request. The
//! runner checks the flag when its blocking run call returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::session::SessionController;

/// Cooperative cancellation flag shared between the bridge and one job.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns `true` if it was not already raised.
    pub fn trigger(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolves when the server should shut down.
///
/// Each Ctrl+C received while a job is active interrupts that job and keeps
/// the server up; a Ctrl+C with no active job ends the wait.
pub async fn interrupt_bridge(controller: SessionController) {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
        let interrupted = {
            let controller = controller.clone();
            tokio::task::spawn_blocking(move || controller.interrupt())
                .await
                .unwrap_or(false)
        };
        if interrupted {
            info!("Interrupting plot via Ctrl+C; press Ctrl+C again to stop the server");
        } else {
            info!("Ctrl+C received with no active plot, shutting down");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_triggers_once() {
        let flag = InterruptFlag::new();
        let shared = flag.clone();
        assert!(!flag.is_triggered());
        assert!(shared.trigger());
        assert!(!flag.trigger());
        assert!(flag.is_triggered());
    }
}
