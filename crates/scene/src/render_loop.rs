//! Per-refresh draw cycle as an explicit state machine.
//!
//! ```text
//! Idle --start--> Scheduled --tick--> Running --+--> Scheduled
//!                     |                         |
//!                     +-----stop----> Cancelled <--fatal frame error
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::backend::FrameError;

/// Revocable token for one scheduled refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u64);

/// Source of display refresh callbacks.
pub trait RefreshScheduler {
    /// Ask for one callback on the next refresh.
    fn schedule(&mut self) -> FrameHandle;

    /// Withdraw a pending callback. Revoking a fired or unknown handle is a no-op.
    fn revoke(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Scheduled(FrameHandle),
    Running,
    Cancelled,
}

/// What a refresh callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// The backend skipped this frame; the next one is scheduled.
    Dropped,
    /// The handle was stale or the loop is not waiting for a frame.
    Ignored,
    /// The backend failed for good; the loop is cancelled.
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("render loop already started")]
    AlreadyStarted,
    #[error("render loop was cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    frames_rendered: u64,
    frames_dropped: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frames_rendered: 0,
            frames_dropped: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Schedule the first frame.
    pub fn start(&mut self, scheduler: &mut impl RefreshScheduler) -> Result<(), LoopError> {
        match self.state {
            LoopState::Idle => {
                let handle = scheduler.schedule();
                tracing::debug!(handle = handle.0, "render loop started");
                self.state = LoopState::Scheduled(handle);
                Ok(())
            }
            LoopState::Cancelled => Err(LoopError::Cancelled),
            LoopState::Scheduled(_) | LoopState::Running => Err(LoopError::AlreadyStarted),
        }
    }

    /// Handle one refresh callback: draw, then schedule the next frame.
    pub fn tick<F>(
        &mut self,
        handle: FrameHandle,
        scheduler: &mut impl RefreshScheduler,
        draw: F,
    ) -> FrameOutcome
    where
        F: FnOnce() -> Result<(), FrameError>,
    {
        if self.state != LoopState::Scheduled(handle) {
            tracing::trace!(handle = handle.0, state = ?self.state, "ignoring refresh");
            return FrameOutcome::Ignored;
        }

        self.state = LoopState::Running;
        let outcome = match draw() {
            Ok(()) => {
                self.frames_rendered += 1;
                FrameOutcome::Rendered
            }
            Err(err) if err.is_fatal() => {
                tracing::error!("render backend unavailable, stopping loop: {err}");
                self.state = LoopState::Cancelled;
                return FrameOutcome::Halted;
            }
            Err(err) => {
                tracing::warn!("frame dropped: {err}");
                self.frames_dropped += 1;
                FrameOutcome::Dropped
            }
        };

        self.state = LoopState::Scheduled(scheduler.schedule());
        outcome
    }

    /// Revoke the pending frame and stop for good.
    pub fn stop(&mut self, scheduler: &mut impl RefreshScheduler) {
        if let LoopState::Scheduled(handle) = self.state {
            scheduler.revoke(handle);
        }
        if self.state != LoopState::Cancelled {
            tracing::debug!(frames = self.frames_rendered, "render loop stopped");
        }
        self.state = LoopState::Cancelled;
    }
}

#[derive(Debug, Default)]
struct DriverState {
    next: u64,
    pending: BTreeSet<FrameHandle>,
    scheduled: u64,
    revoked: u64,
}

/// Deterministic refresh source: frames fire only when [`Self::fire`] is called.
///
/// Clones share state, so one copy can drive a controller while another
/// inspects what was scheduled.
#[derive(Debug, Clone, Default)]
pub struct ManualRefreshDriver {
    inner: Rc<RefCell<DriverState>>,
}

impl ManualRefreshDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending handle, as one display refresh would.
    pub fn fire(&self) -> Vec<FrameHandle> {
        let mut state = self.inner.borrow_mut();
        std::mem::take(&mut state.pending).into_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn scheduled_count(&self) -> u64 {
        self.inner.borrow().scheduled
    }

    pub fn revoked_count(&self) -> u64 {
        self.inner.borrow().revoked
    }
}

impl RefreshScheduler for ManualRefreshDriver {
    fn schedule(&mut self) -> FrameHandle {
        let mut state = self.inner.borrow_mut();
        let handle = FrameHandle(state.next);
        state.next += 1;
        state.scheduled += 1;
        state.pending.insert(handle);
        handle
    }

    fn revoke(&mut self, handle: FrameHandle) {
        let mut state = self.inner.borrow_mut();
        if state.pending.remove(&handle) {
            state.revoked += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_schedules_exactly_one_frame() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        assert_eq!(rl.state(), LoopState::Idle);
        rl.start(&mut driver).unwrap();
        assert!(matches!(rl.state(), LoopState::Scheduled(_)));
        assert_eq!(driver.pending(), 1);
        assert_eq!(rl.start(&mut driver), Err(LoopError::AlreadyStarted));
    }

    #[test]
    fn each_refresh_draws_once_and_reschedules() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        rl.start(&mut driver).unwrap();

        let mut draws = 0;
        for _ in 0..5 {
            let due = driver.fire();
            assert_eq!(due.len(), 1);
            for handle in due {
                let outcome = rl.tick(handle, &mut driver, || {
                    draws += 1;
                    Ok(())
                });
                assert_eq!(outcome, FrameOutcome::Rendered);
            }
        }
        assert_eq!(draws, 5);
        assert_eq!(rl.frames_rendered(), 5);
        assert_eq!(driver.pending(), 1);
    }

    #[test]
    fn stale_handle_is_ignored() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        rl.start(&mut driver).unwrap();
        let handle = driver.fire()[0];
        rl.tick(handle, &mut driver, || Ok(()));
        // Replaying the same handle must not draw again.
        let outcome = rl.tick(handle, &mut driver, || panic!("stale frame drew"));
        assert_eq!(outcome, FrameOutcome::Ignored);
    }

    #[test]
    fn transient_error_drops_frame_and_keeps_going() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        rl.start(&mut driver).unwrap();
        let handle = driver.fire()[0];
        let outcome = rl.tick(handle, &mut driver, || {
            Err(FrameError::Transient("surface outdated".into()))
        });
        assert_eq!(outcome, FrameOutcome::Dropped);
        assert_eq!(rl.frames_dropped(), 1);
        assert!(matches!(rl.state(), LoopState::Scheduled(_)));
    }

    #[test]
    fn fatal_error_stops_rescheduling() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        rl.start(&mut driver).unwrap();
        let handle = driver.fire()[0];
        let outcome = rl.tick(handle, &mut driver, || Err(FrameError::Fatal("device lost".into())));
        assert_eq!(outcome, FrameOutcome::Halted);
        assert_eq!(rl.state(), LoopState::Cancelled);
        assert_eq!(driver.pending(), 0);
        assert_eq!(driver.scheduled_count(), 1);
    }

    #[test]
    fn stop_revokes_pending_frame() {
        let mut driver = ManualRefreshDriver::new();
        let mut rl = RenderLoop::new();
        rl.start(&mut driver).unwrap();
        rl.stop(&mut driver);
        assert_eq!(rl.state(), LoopState::Cancelled);
        assert_eq!(driver.pending(), 0);
        assert_eq!(driver.revoked_count(), 1);
        assert_eq!(rl.start(&mut driver), Err(LoopError::Cancelled));
        // Stopping twice is harmless.
        rl.stop(&mut driver);
        assert_eq!(driver.revoked_count(), 1);
    }
}
