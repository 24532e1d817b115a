use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Restartable quiescence timer.
///
/// `arm` starts the window, or pushes it back if it is already running, so
/// a burst of triggers collapses into a single trailing-edge firing.
/// Dropping or cancelling the debouncer guarantees it never fires.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Start the window now, superseding any pending firing.
    pub fn arm(&mut self) {
        let at = Instant::now() + self.window;
        match &mut self.deadline {
            Some(sleep) => sleep.as_mut().reset(at),
            None => self.deadline = Some(Box::pin(tokio::time::sleep_until(at))),
        }
    }

    /// Arm only if nothing is pending. Keeps a steady trickle of triggers
    /// from postponing the firing forever.
    pub fn arm_if_idle(&mut self) {
        if self.deadline.is_none() {
            self.arm();
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Resolves when the window elapses and disarms. Pends forever while
    /// disarmed. Cancel safe: dropping the future leaves the timer armed.
    pub async fn fired(&mut self) {
        match &mut self.deadline {
            Some(sleep) => {
                sleep.as_mut().await;
                self.deadline = None;
            }
            None => future::pending().await,
        }
    }
}
