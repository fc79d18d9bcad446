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

//! The begin / send / cleanup contract shared by every request-style service.

use std::time::Duration;

use forex_network::ProtoMessage;

use crate::{
    config::RetryPolicy,
    error::BrokerError,
    router::{HandlerId, MessageHandler},
    service::ServiceCore,
    session::TransportSession,
    timeout::{RetryCallback, TimeoutTracker},
};

/// Binds one service's message handler to a [`TransportSession`].
///
/// A service starts an operation with [`RequestLifecycle::begin`] and must call
/// [`RequestLifecycle::cleanup`] on exactly one terminal path. Terminal paths check the
/// service's in-progress flag first, so whichever of success, error or timeout arrives second
/// becomes a no-op.
#[derive(Clone, Debug)]
pub struct RequestLifecycle {
    session: TransportSession,
    handler_id: HandlerId,
}

impl RequestLifecycle {
    /// Creates a new [`RequestLifecycle`] with a freshly allocated handler id.
    #[must_use]
    pub fn new(session: TransportSession) -> Self {
        Self {
            session,
            handler_id: HandlerId::next(),
        }
    }

    #[must_use]
    pub const fn handler_id(&self) -> HandlerId {
        self.handler_id
    }

    #[must_use]
    pub const fn session(&self) -> &TransportSession {
        &self.session
    }

    /// Configures retries on `tracker`, registers `handler`, arms `tracker` and calls `send`.
    pub fn begin(
        &self,
        tracker: &TimeoutTracker,
        timeout: Option<Duration>,
        policy: Option<RetryPolicy>,
        on_retry: RetryCallback,
        handler: MessageHandler,
        send: impl FnOnce(),
    ) {
        tracker.configure_retry(policy, Some(on_retry));
        self.session.add_message_handler(self.handler_id, handler);
        tracker.start(timeout);
        send();
    }

    /// Clears the in-progress flag, unregisters the handler and cancels `tracker`.
    ///
    /// Returns `true` if the operation was still in progress.
    pub fn cleanup(&self, core: &ServiceCore, tracker: &TimeoutTracker) -> bool {
        let was_in_progress = core.in_progress.end();
        self.session.remove_message_handler(self.handler_id);
        tracker.cancel();
        was_in_progress
    }

    /// Sends `message` through the session's current handle.
    ///
    /// If no authenticated handle is available or the send fails, the lifecycle is cleaned up
    /// and the error surfaced before returning `false`.
    pub fn send_with_client(
        &self,
        core: &ServiceCore,
        tracker: &TimeoutTracker,
        message: ProtoMessage,
    ) -> bool {
        let result = self.session.client().and_then(|handle| {
            handle.send(message).map_err(|e| {
                self.session.report_send_failure(&e.to_string());
                BrokerError::from(e)
            })
        });

        match result {
            Ok(()) => true,
            Err(error) => {
                self.cleanup(core, tracker);
                core.emit_error(&error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc, time::Duration};

    use rstest::rstest;

    use super::*;
    use crate::{
        runtime::EventLoop,
        session::SessionHandle,
        stubs::{MockConnector, test_config, test_credentials},
    };

    fn ignore(_: &SessionHandle, _: &ProtoMessage) -> bool {
        false
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_cleanup_reports_in_progress_exactly_once() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let session = TransportSession::new(
                    test_config(),
                    test_credentials(),
                    MockConnector::new(),
                    event_loop.handle(),
                );
                let lifecycle = RequestLifecycle::new(session.clone());
                let core = ServiceCore::new("test");
                let timeouts = Rc::new(Cell::new(0));
                let counter = timeouts.clone();
                let tracker =
                    TimeoutTracker::new(event_loop.handle(), move || counter.set(counter.get() + 1));

                assert!(core.in_progress.try_start());
                let sent = Cell::new(false);
                lifecycle.begin(
                    &tracker,
                    Some(Duration::from_secs(1)),
                    None,
                    Rc::new(|_| {}),
                    Rc::new(ignore),
                    || sent.set(true),
                );

                assert!(sent.get());
                assert!(session.has_message_handler(lifecycle.handler_id()));
                assert!(tracker.is_armed());

                assert!(lifecycle.cleanup(&core, &tracker));
                assert!(!lifecycle.cleanup(&core, &tracker));
                assert!(!session.has_message_handler(lifecycle.handler_id()));

                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(timeouts.get(), 0);
            })
            .await;
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_send_without_client_cleans_up() {
        let event_loop = EventLoop::new();
        event_loop
            .run_until(async {
                let session = TransportSession::new(
                    test_config(),
                    test_credentials(),
                    MockConnector::new(),
                    event_loop.handle(),
                );
                let lifecycle = RequestLifecycle::new(session.clone());
                let core = ServiceCore::new("test");
                let tracker = TimeoutTracker::new(event_loop.handle(), || {});

                assert!(core.in_progress.try_start());
                session.add_message_handler(lifecycle.handler_id(), Rc::new(ignore));

                let message = ProtoMessage::new(2114, Vec::new());
                assert!(!lifecycle.send_with_client(&core, &tracker, message));
                assert!(!core.in_progress());
                assert_eq!(session.message_handler_count(), 0);
                assert_eq!(core.logger.history().len(), 1);
            })
            .await;
    }
}
