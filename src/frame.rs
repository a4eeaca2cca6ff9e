//! Frame driver.
//!
//! The driver is RUNNING from `start` until `stop`, and STOPPED afterwards. The
//! running flag is shared between clones, so the task that delivers ticks and the
//! controller that stops it look at the same state: once `stop` returns, the next
//! tick sees STOPPED and does no work.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::{Stream, StreamExt};

use crate::{error::RenderError, lifecycle::SceneController, renderer::Renderer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Running,
    Stopped,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The driver is stopped; nothing was updated or rendered.
    Stopped,
    /// Animation advanced and exactly one frame was rendered.
    Rendered,
    /// Animation advanced but there is no renderer to draw with.
    Headless,
    /// Animation advanced but rendering failed. Fatal errors stop the driver.
    Failed(RenderError),
}

#[derive(Clone, Debug)]
pub struct FrameDriver {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl FrameDriver {
    /// A driver in the STOPPED state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    /// Stops the driver. Returns whether it was running.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> FrameState {
        if self.is_running() {
            FrameState::Running
        } else {
            FrameState::Stopped
        }
    }

    /// Number of ticks that did work.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Claims the next tick. `false` means the driver is stopped and the tick must be skipped.
    pub(crate) fn begin_tick(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.ticks.fetch_add(1, Ordering::SeqCst);
        true
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives `controller` with one tick per stream item until the stream ends or
/// the driver is stopped. Returns the number of ticks that did work.
///
/// The winit host calls [`SceneController::tick`] from its redraw loop instead;
/// this is for hosts that produce frame deltas as a stream.
pub async fn drive<R, S>(controller: &mut SceneController<R>, ticks: S) -> usize
where
    R: Renderer,
    S: Stream<Item = Duration>,
{
    let driver = controller.frame_driver();
    let mut ticks = std::pin::pin!(ticks);
    let mut done = 0;
    while let Some(dt) = ticks.next().await {
        if !driver.is_running() {
            break;
        }
        match controller.tick(dt) {
            TickOutcome::Stopped => break,
            _ => done += 1,
        }
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_new_driver_is_stopped() {
        let driver = FrameDriver::new();
        assert_eq!(driver.state(), FrameState::Stopped);
        assert!(!driver.begin_tick());
        assert_eq!(driver.ticks(), 0);
    }

    #[test]
    fn stopping_a_clone_stops_every_clone() {
        let driver = FrameDriver::new();
        driver.start();
        let task = driver.clone();
        assert!(task.begin_tick());
        assert!(driver.stop());
        assert!(!task.begin_tick());
        assert_eq!(task.state(), FrameState::Stopped);
        assert_eq!(driver.ticks(), 1);
    }

    #[test]
    fn stopping_twice_reports_the_first_stop_only() {
        let driver = FrameDriver::new();
        driver.start();
        assert!(driver.stop());
        assert!(!driver.stop());
    }
}
