//! Self-expanding work queue with distributed termination detection.
//!
//! Workers pop tasks and, while processing a task, may push new ones. The
//! queue knows how many workers share it. When a worker finds the queue empty
//! and every other worker is already blocked waiting, no task exists anywhere
//! that could still produce more work: the queue switches to `Done` and every
//! waiter returns `None`.
//!
//! Soundness depends on one precondition: `push` is only called by a worker
//! that is currently processing a popped task (or before any worker started,
//! to seed the queue). Such a worker is never counted as waiting, so
//! `waiting == total_workers` can only be observed once nobody is producing.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Done,
}

#[derive(Debug)]
struct State<T> {
    tasks: VecDeque<T>,
    /// Workers currently blocked in `pop_blocking`.
    waiting: usize,
    phase: Phase,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
    total_workers: usize,
}

impl<T> WorkQueue<T> {
    pub fn new(total_workers: NonZeroUsize) -> Self {
        WorkQueue {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                waiting: 0,
                phase: Phase::Running,
            }),
            ready: Condvar::new(),
            total_workers: total_workers.get(),
        }
    }

    /// Appends a task and wakes one blocked worker. Never blocks.
    ///
    /// A push can still arrive after `Done`: `retire_worker` may declare
    /// quiescence while a woken worker has yet to take the task it was
    /// woken for. That worker drains whatever it pushes itself, because
    /// `pop_blocking` hands out queued tasks before checking the phase.
    pub fn push(&self, task: T) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        if state.waiting > 0 {
            self.ready.notify_one();
        }
    }

    /// Returns the next task, blocking while the queue is empty and other
    /// workers may still produce work.
    ///
    /// Returns `None` once quiescence has been reached. After the first
    /// `None` every subsequent call returns `None` immediately.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.phase == Phase::Done {
                return None;
            }

            state.waiting += 1;
            if state.waiting == self.total_workers {
                state.phase = Phase::Done;
                self.ready.notify_all();
                return None;
            }

            self.ready.wait(&mut state);
            state.waiting -= 1;
        }
    }

    /// Counts a worker that will never pop again (its thread failed to start
    /// or unwound) as permanently idle, so the remaining workers can still
    /// reach quiescence.
    pub fn retire_worker(&self) {
        let mut state = self.state.lock();
        if state.phase == Phase::Done {
            return;
        }
        state.waiting += 1;
        if state.waiting == self.total_workers {
            state.phase = Phase::Done;
            self.ready.notify_all();
        }
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().phase == Phase::Done
    }

    #[cfg(test)]
    fn waiting(&self) -> usize {
        self.state.lock().waiting
    }
}
