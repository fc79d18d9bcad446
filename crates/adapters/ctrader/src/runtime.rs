// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! The single execution context all session state lives on.
//!
//! Sessions, timers and transport callbacks all run as local tasks of one [`EventLoop`], so
//! session state is plain `Rc<RefCell<..>>` and no callback ever observes a concurrent
//! mutation. Network I/O may run elsewhere, it only reaches the sessions through channels
//! drained by local tasks.

use std::{cell::Cell, future::Future, rc::Rc, time::Duration};

use tokio::{task::LocalSet, time::Instant};
use tokio_util::sync::CancellationToken;

/// Owns the local task set and the shutdown signal for every task spawned through it.
#[derive(Debug)]
pub struct EventLoop {
    local: LocalSet,
    handle: LoopHandle,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Creates a new [`EventLoop`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: LocalSet::new(),
            handle: LoopHandle::new(),
        }
    }

    /// Returns a handle for scheduling work on this loop.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Drives `future` to completion while running the loop's local tasks.
    ///
    /// Must be awaited from within a current-thread tokio runtime.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.local.run_until(future).await
    }

    /// Cancels every task and timer spawned through this loop.
    pub fn shutdown(&self) {
        tracing::debug!("Shutting down event loop");
        self.handle.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.handle.shutdown.is_cancelled()
    }
}

/// Cheap, cloneable handle used to spawn tasks and timers on an [`EventLoop`].
#[derive(Clone, Debug)]
pub struct LoopHandle {
    shutdown: CancellationToken,
}

impl Default for LoopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopHandle {
    /// Creates a handle not tied to any [`EventLoop`]'s shutdown.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns the current loop time.
    #[must_use]
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Spawns `future` as a local task.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`LocalSet`].
    pub fn spawn<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + 'static,
    {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();

        tokio::task::spawn_local(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = future => {}
            }
        });

        TaskHandle { token }
    }

    /// Runs `callback` once after `delay`, unless the returned handle is cancelled first.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`LocalSet`].
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + 'static,
    {
        let pending = Rc::new(Cell::new(true));
        let flag = pending.clone();

        let task = self.spawn(async move {
            tokio::time::sleep(delay).await;
            if flag.replace(false) {
                callback();
            }
        });

        TimerHandle { pending, task }
    }

    /// Runs `callback` every `period`, first after one full period.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`LocalSet`].
    pub fn interval<F>(&self, period: Duration, mut callback: F) -> TimerHandle
    where
        F: FnMut() + 'static,
    {
        let pending = Rc::new(Cell::new(true));
        let flag = pending.clone();
        let period = period.max(Duration::from_millis(1));

        let task = self.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !flag.get() {
                    break;
                }
                callback();
            }
        });

        TimerHandle { pending, task }
    }
}

/// Cancels a spawned task when asked to.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Handle to a pending one-shot or interval timer. Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    pending: Rc<Cell<bool>>,
    task: TaskHandle,
}

impl TimerHandle {
    /// Cancels the timer. A callback already running is not interrupted.
    pub fn cancel(&self) {
        self.pending.set(false);
        self.task.cancel();
    }

    /// Returns `true` while a one-shot timer has not fired, or an interval is still active.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_once_after_delay() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let fired = Rc::new(Cell::new(0));
                let counter = fired.clone();
                let timer = event_loop
                    .handle()
                    .schedule(Duration::from_secs(5), move || counter.set(counter.get() + 1));

                tokio::time::sleep(Duration::from_secs(4)).await;
                assert_eq!(fired.get(), 0);
                assert!(timer.is_pending());

                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(fired.get(), 1);
                assert!(!timer.is_pending());
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();
                let timer = event_loop
                    .handle()
                    .schedule(Duration::from_secs(1), move || flag.set(true));

                timer.cancel();
                tokio::time::sleep(Duration::from_secs(2)).await;
                assert!(!fired.get());
                assert!(!timer.is_pending());
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_dropped_timer_never_fires() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();
                drop(
                    event_loop
                        .handle()
                        .schedule(Duration::from_secs(1), move || flag.set(true)),
                );

                tokio::time::sleep(Duration::from_secs(2)).await;
                assert!(!fired.get());
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_cancelled() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let ticks = Rc::new(RefCell::new(Vec::new()));
                let recorded = ticks.clone();
                let start = Instant::now();
                let timer = event_loop
                    .handle()
                    .interval(Duration::from_secs(10), move || {
                        recorded.borrow_mut().push(start.elapsed().as_secs());
                    });

                tokio::time::sleep(Duration::from_secs(35)).await;
                assert_eq!(*ticks.borrow(), vec![10, 20, 30]);

                timer.cancel();
                tokio::time::sleep(Duration::from_secs(30)).await;
                assert_eq!(ticks.borrow().len(), 3);
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_spawned_tasks() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();
                let _timer = event_loop
                    .handle()
                    .schedule(Duration::from_secs(1), move || flag.set(true));

                event_loop.shutdown();
                tokio::time::sleep(Duration::from_secs(2)).await;
                assert!(!fired.get());
                assert!(event_loop.is_shutdown());
            })
            .await;
    }
}
