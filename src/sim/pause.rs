//! Cooperative pause/resume/shutdown signalling for worker threads.
//!
//! Workers call [`PauseGate::checkpoint`] at loop boundaries and inside
//! long operations. A paused gate blocks the caller until resumed; a
//! shut-down gate makes `checkpoint` return `false` so the worker can
//! unwind. Shutdown always wins over pause, so a paused worker still
//! exits promptly.

use std::sync::{Condvar, Mutex};

#[derive(Debug)]
struct GateState {
    paused: bool,
    running: bool,
}

#[derive(Debug)]
pub struct PauseGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                paused: false,
                running: true,
            }),
            cond: Condvar::new(),
        }
    }

    /// Ask workers to hold at their next checkpoint
    pub fn pause(&self) {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state.paused = true;
    }

    /// Release paused workers
    pub fn resume(&self) {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state.paused = false;
        self.cond.notify_all();
    }

    /// Ask workers to unwind; wakes any worker blocked on a pause
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("gate lock poisoned");
        state.running = false;
        self.cond.notify_all();
    }

    /// Block while paused; returns `true` while the gate is running and
    /// `false` once shutdown has been requested.
    pub fn checkpoint(&self) -> bool {
        let mut state = self.state.lock().expect("gate lock poisoned");
        while state.paused && state.running {
            state = self
                .cond
                .wait(state)
                .expect("gate lock poisoned");
        }
        state.running
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().expect("gate lock poisoned").running
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().expect("gate lock poisoned").paused
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}
