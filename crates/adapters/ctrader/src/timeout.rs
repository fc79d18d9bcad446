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

//! Single-operation deadline timer with optional bounded retries.

use std::{cell::RefCell, rc::Rc, time::Duration};

use crate::{
    config::RetryPolicy,
    runtime::{LoopHandle, TimerHandle},
};

/// Invoked with the 1-based retry attempt number when a deadline passes and a retry remains.
pub type RetryCallback = Rc<dyn Fn(u32)>;

/// Invoked once when the deadline passes with no retry remaining.
pub type TimeoutCallback = Rc<dyn Fn()>;

#[derive(Default)]
struct TrackerState {
    timer: Option<TimerHandle>,
    timeout: Duration,
    policy: Option<RetryPolicy>,
    on_retry: Option<RetryCallback>,
    attempt: u32,
    generation: u64,
}

/// Deadline timer owned by one service.
///
/// [`TimeoutTracker::start`] arms the timer. When it fires with a retry policy that still has
/// attempts left, the retry callback runs and the timer re-arms after the policy backoff
/// (falling back to the original timeout when the backoff is zero). Otherwise the timeout
/// callback runs exactly once.
#[derive(Clone)]
pub struct TimeoutTracker {
    state: Rc<RefCell<TrackerState>>,
    on_timeout: TimeoutCallback,
    loop_handle: LoopHandle,
}

impl std::fmt::Debug for TimeoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct(stringify!(TimeoutTracker))
            .field("armed", &state.timer.as_ref().is_some_and(TimerHandle::is_pending))
            .field("timeout", &state.timeout)
            .field("attempt", &state.attempt)
            .finish()
    }
}

impl TimeoutTracker {
    /// Creates a new [`TimeoutTracker`] invoking `on_timeout` on final expiry.
    pub fn new(loop_handle: LoopHandle, on_timeout: impl Fn() + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(TrackerState::default())),
            on_timeout: Rc::new(on_timeout),
            loop_handle,
        }
    }

    /// Sets (or clears) the retry policy and callback used by the next [`TimeoutTracker::start`].
    pub fn configure_retry(&self, policy: Option<RetryPolicy>, on_retry: Option<RetryCallback>) {
        let mut state = self.state.borrow_mut();
        state.policy = policy;
        state.on_retry = on_retry;
    }

    /// Arms the deadline, replacing any pending one. `None` or zero leaves the tracker disarmed.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a [`tokio::task::LocalSet`].
    pub fn start(&self, timeout: Option<Duration>) {
        let Some(timeout) = timeout.filter(|t| !t.is_zero()) else {
            return;
        };

        self.cancel();
        self.state.borrow_mut().timeout = timeout;
        self.arm(timeout);
    }

    /// Disarms the tracker and resets the attempt counter.
    pub fn cancel(&self) {
        let timer = {
            let mut state = self.state.borrow_mut();
            state.attempt = 0;
            state.generation = state.generation.wrapping_add(1);
            state.timer.take()
        };

        if let Some(timer) = timer {
            timer.cancel();
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state
            .borrow()
            .timer
            .as_ref()
            .is_some_and(TimerHandle::is_pending)
    }

    /// Returns the number of retries performed since the last start.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.state.borrow().attempt
    }

    fn arm(&self, delay: Duration) {
        let tracker = Rc::downgrade(&self.state);
        let on_timeout = self.on_timeout.clone();
        let loop_handle = self.loop_handle.clone();

        let timer = self.loop_handle.schedule(delay, move || {
            if let Some(state) = tracker.upgrade() {
                Self {
                    state,
                    on_timeout,
                    loop_handle,
                }
                .handle_expiry();
            }
        });

        self.state.borrow_mut().timer = Some(timer);
    }

    fn handle_expiry(&self) {
        let retry = {
            let mut state = self.state.borrow_mut();
            state.timer = None;

            match (state.policy, state.on_retry.clone()) {
                (Some(policy), Some(on_retry)) if state.attempt < policy.max_attempts => {
                    state.attempt += 1;
                    let delay = policy.backoff().unwrap_or(state.timeout);
                    Some((on_retry, state.attempt, delay, state.generation))
                }
                _ => None,
            }
        };

        match retry {
            Some((on_retry, attempt, delay, generation)) => {
                on_retry(attempt);

                // The retry callback may have finished or restarted the operation
                let unchanged = self.state.borrow().generation == generation;
                if unchanged && !delay.is_zero() {
                    self.arm(delay);
                }
            }
            None => {
                self.state.borrow_mut().attempt = 0;
                (self.on_timeout)();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use rstest::rstest;
    use tokio::time::Instant;

    use super::*;
    use crate::runtime::EventLoop;

    fn counting_tracker(event_loop: &EventLoop) -> (TimeoutTracker, Rc<Cell<u32>>) {
        let timeouts = Rc::new(Cell::new(0));
        let counter = timeouts.clone();
        let tracker = TimeoutTracker::new(event_loop.handle(), move || {
            counter.set(counter.get() + 1);
        });
        (tracker, timeouts)
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_without_policy() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                tracker.start(Some(Duration::from_secs(5)));
                assert!(tracker.is_armed());

                tokio::time::sleep(Duration::from_secs(60)).await;

                assert_eq!(timeouts.get(), 1);
                assert!(!tracker.is_armed());
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_retries_then_times_out() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                let retries = Rc::new(RefCell::new(Vec::new()));
                let recorded = retries.clone();
                let start = Instant::now();

                tracker.configure_retry(
                    Some(RetryPolicy::new(2, 1.0)),
                    Some(Rc::new(move |attempt| {
                        recorded
                            .borrow_mut()
                            .push((attempt, start.elapsed().as_secs()));
                    })),
                );
                tracker.start(Some(Duration::from_secs(5)));

                tokio::time::sleep(Duration::from_millis(6_500)).await;
                assert_eq!(*retries.borrow(), vec![(1, 5), (2, 6)]);
                assert_eq!(timeouts.get(), 0);

                tokio::time::sleep(Duration::from_secs(1)).await;
                assert_eq!(timeouts.get(), 1);
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_zero_backoff_falls_back_to_timeout() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                let retries = Rc::new(Cell::new(0));
                let counter = retries.clone();

                tracker.configure_retry(
                    Some(RetryPolicy::new(1, 0.0)),
                    Some(Rc::new(move |_| counter.set(counter.get() + 1))),
                );
                tracker.start(Some(Duration::from_secs(3)));

                tokio::time::sleep(Duration::from_millis(5_500)).await;
                assert_eq!(retries.get(), 1);
                assert_eq!(timeouts.get(), 0);

                tokio::time::sleep(Duration::from_secs(1)).await;
                assert_eq!(timeouts.get(), 1);
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry_and_resets_attempts() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                tracker.configure_retry(Some(RetryPolicy::new(3, 1.0)), Some(Rc::new(|_| {})));
                tracker.start(Some(Duration::from_secs(2)));

                tokio::time::sleep(Duration::from_millis(2_500)).await;
                assert_eq!(tracker.attempt(), 1);

                tracker.cancel();
                assert_eq!(tracker.attempt(), 0);

                tokio::time::sleep(Duration::from_secs(30)).await;
                assert_eq!(timeouts.get(), 0);
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_retry_callback_stops_rearm() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                let handle = tracker.clone();
                tracker.configure_retry(
                    Some(RetryPolicy::new(3, 1.0)),
                    Some(Rc::new(move |_| handle.cancel())),
                );
                tracker.start(Some(Duration::from_secs(1)));

                tokio::time::sleep(Duration::from_secs(30)).await;
                assert_eq!(timeouts.get(), 0);
                assert!(!tracker.is_armed());
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_zero_or_missing_timeout_is_ignored() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let (tracker, timeouts) = counting_tracker(&event_loop);
                tracker.start(None);
                tracker.start(Some(Duration::ZERO));
                assert!(!tracker.is_armed());

                tokio::time::sleep(Duration::from_secs(5)).await;
                assert_eq!(timeouts.get(), 0);
            })
            .await;
    }
}
