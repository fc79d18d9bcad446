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

//! Integration tests for the transport session driven through mock connections.

use std::{cell::RefCell, rc::Rc, time::Duration};

use forex_ctrader::{
    common::{
        consts::{PAYLOAD_APPLICATION_AUTH_REQ, PAYLOAD_HEARTBEAT_EVENT},
        enums::ConnectionStatus,
    },
    config::SessionConfig,
    error::{BrokerError, ErrorCode},
    messages::ApplicationAuthReq,
    metrics::{SessionEvent, SessionMetrics},
    router::HandlerId,
    runtime::EventLoop,
    session::{SessionHandle, TransportCallbacks, TransportSession},
    stubs::{
        MockConnector, app_auth_response, authenticate_transport, oa_error, settle, test_config,
        test_credentials,
    },
};
use forex_network::{Connection, ConnectionEpoch, ProtoMessage, TransportEvent};
use rstest::rstest;

type Recorded<T> = Rc<RefCell<Vec<T>>>;

fn new_transport(
    event_loop: &EventLoop,
    config: SessionConfig,
) -> (TransportSession, Rc<MockConnector>) {
    let connector = MockConnector::new();
    let transport = TransportSession::new(
        config,
        test_credentials(),
        connector.clone(),
        event_loop.handle(),
    );
    (transport, connector)
}

fn record_callbacks(
    transport: &TransportSession,
) -> (Recorded<ConnectionStatus>, Recorded<BrokerError>) {
    let statuses: Recorded<ConnectionStatus> = Rc::default();
    let errors: Recorded<BrokerError> = Rc::default();

    let on_status = statuses.clone();
    let on_error = errors.clone();
    transport.set_callbacks(
        TransportCallbacks::default()
            .with_on_status_changed(move |status| on_status.borrow_mut().push(status))
            .with_on_error(move |error| on_error.borrow_mut().push(error.clone())),
    );

    (statuses, errors)
}

fn count_lines(transport: &TransportSession, line: &str) -> usize {
    transport
        .log_history()
        .iter()
        .filter(|l| l.as_str() == line)
        .count()
}

fn ignore_message(_: &SessionHandle, _: &ProtoMessage) -> bool {
    false
}

async fn sleep_secs(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_connect_reaches_app_authenticated() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());

            let statuses: Recorded<ConnectionStatus> = Rc::default();
            let app_auth_calls = Rc::new(RefCell::new(0));
            let counter = app_auth_calls.clone();
            let on_status = statuses.clone();
            transport.set_callbacks(
                TransportCallbacks::default()
                    .with_on_app_auth_success(move |_| *counter.borrow_mut() += 1)
                    .with_on_status_changed(move |status| on_status.borrow_mut().push(status)),
            );

            transport.connect();
            assert_eq!(transport.status(), ConnectionStatus::Connecting);
            assert!(transport.in_progress());
            assert!(transport.client().is_err());

            let connection = connector.last().unwrap();
            connection.emit(TransportEvent::Connected);
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Connected);
            let request: ApplicationAuthReq = connection.last_sent().unwrap();
            assert_eq!(request.client_id, "client-id");
            assert_eq!(request.client_secret, "client-secret");

            connection.emit_frame(app_auth_response());
            settle().await;

            assert_eq!(
                *statuses.borrow(),
                vec![
                    ConnectionStatus::Connecting,
                    ConnectionStatus::Connected,
                    ConnectionStatus::AppAuthenticated,
                ]
            );
            assert_eq!(*app_auth_calls.borrow(), 1);
            assert!(!transport.in_progress());
            assert!(transport.client().is_ok());
            assert!(transport.is_heartbeat_running());
            assert_eq!(connector.endpoints()[0].host, "demo.ctraderapi.com");
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_second_connect_is_ignored() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());

            transport.connect();
            let epoch = transport.current_epoch();
            transport.connect();

            assert_eq!(connector.connect_count(), 1);
            assert_eq!(transport.current_epoch(), epoch);
            assert_eq!(count_lines(&transport, "Connect already in progress"), 1);

            let connection = connector.last().unwrap();
            connection.emit(TransportEvent::Connected);
            settle().await;
            connection.emit_frame(app_auth_response());
            settle().await;

            transport.connect();
            assert_eq!(connector.connect_count(), 1);
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_events_from_superseded_connection_are_ignored() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());

            transport.connect();
            let first = connector.last().unwrap();
            transport.disconnect();
            transport.connect();
            let second = connector.last().unwrap();
            assert_ne!(first.epoch(), second.epoch());

            first.emit(TransportEvent::Connected);
            first.emit_frame(app_auth_response());
            first.emit(TransportEvent::Disconnected("late".to_string()));
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Connecting);
            assert!(!transport.has_pending_reconnect());

            transport.on_transport_event(ConnectionEpoch::new(999), TransportEvent::Connected);
            assert_eq!(transport.status(), ConnectionStatus::Connecting);

            second.emit(TransportEvent::Connected);
            settle().await;
            assert_eq!(transport.status(), ConnectionStatus::Connected);
            assert_eq!(second.sent_count(PAYLOAD_APPLICATION_AUTH_REQ), 1);
            assert_eq!(first.sent_count(PAYLOAD_APPLICATION_AUTH_REQ), 0);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_reconnect_delays_follow_backoff() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            settle().await;
            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert_eq!(transport.reconnect_attempt(), 1);
            assert!(transport.has_pending_reconnect());

            // First reconnect after 3s
            sleep_secs(2.9).await;
            assert_eq!(connector.connect_count(), 1);
            sleep_secs(0.2).await;
            assert_eq!(connector.connect_count(), 2);
            assert_eq!(transport.status(), ConnectionStatus::Connecting);

            // Watchdog fails the attempt at 13.0s, second reconnect waits 6s
            sleep_secs(15.8).await;
            assert_eq!(connector.connect_count(), 2);
            assert_eq!(transport.reconnect_attempt(), 2);
            sleep_secs(0.2).await;
            assert_eq!(connector.connect_count(), 3);
        })
        .await;
}

#[rstest]
#[case::still_connecting(false)]
#[case::app_authenticated(true)]
#[tokio::test(start_paused = true)]
async fn test_reconnect_timer_after_manual_connect_is_noop(#[case] complete_handshake: bool) {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            settle().await;
            assert!(transport.has_pending_reconnect());

            // Manual connect well before the 3s reconnect deadline
            sleep_secs(1.0).await;
            transport.connect();
            assert_eq!(connector.connect_count(), 2);
            let replacement = connector.last().unwrap();

            if complete_handshake {
                replacement.emit(TransportEvent::Connected);
                settle().await;
                replacement.emit_frame(app_auth_response());
                settle().await;
                assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
            } else {
                assert_eq!(transport.status(), ConnectionStatus::Connecting);
            }
            let attempt = transport.reconnect_attempt();

            sleep_secs(3.0).await;

            assert_eq!(connector.connect_count(), 2);
            assert_eq!(transport.reconnect_attempt(), attempt);
            assert!(!transport.has_pending_reconnect());
            assert!(!replacement.is_closed());
            let expected = if complete_handshake {
                ConnectionStatus::AppAuthenticated
            } else {
                ConnectionStatus::Connecting
            };
            assert_eq!(transport.status(), expected);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_mid_session_disconnect_schedules_one_reconnect() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let (_, errors) = record_callbacks(&transport);
            let connection = authenticate_transport(&transport, &connector).await;

            transport.add_message_handler(HandlerId::next(), Rc::new(ignore_message));
            assert_eq!(transport.message_handler_count(), 1);

            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(!transport.is_heartbeat_running());
            assert_eq!(transport.message_handler_count(), 0);
            assert_eq!(transport.reconnect_attempt(), 1);
            assert!(connection.is_closed());

            let errors = errors.borrow();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ErrorCode::Network);
            assert_eq!(errors[0].detail.as_deref(), Some("reset by peer"));
            drop(errors);

            sleep_secs(4.0).await;
            assert_eq!(connector.connect_count(), 2);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_unhandled_message_logged_once() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit_frame(ProtoMessage::new(9999, Vec::new()));
            connection.emit_frame(ProtoMessage::new(2113, Vec::new()));
            settle().await;

            assert_eq!(count_lines(&transport, "Unhandled message type: 9999"), 1);
            assert_eq!(count_lines(&transport, "Unhandled message type: 2113"), 0);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_registered_handler_sees_message() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            let seen: Recorded<u32> = Rc::default();
            let recorded = seen.clone();
            let id = HandlerId::next();
            transport.add_message_handler(
                id,
                Rc::new(move |_: &SessionHandle, message: &ProtoMessage| {
                    recorded.borrow_mut().push(message.payload_type);
                    true
                }),
            );

            connection.emit_frame(ProtoMessage::new(9999, Vec::new()));
            settle().await;

            assert_eq!(*seen.borrow(), vec![9999]);
            assert_eq!(count_lines(&transport, "Unhandled message type: 9999"), 0);

            assert!(transport.remove_message_handler(id));
            assert!(!transport.has_message_handler(id));
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_silent_connection_is_restarted() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            sleep_secs(31.0).await;
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
            assert_eq!(connection.sent_count(PAYLOAD_HEARTBEAT_EVENT), 3);
            assert!(!transport.is_transport_fresh(None));
            assert!(transport.is_transport_fresh(Some(60.0)));
            assert!(transport.seconds_since_last_message().unwrap() >= 31.0);

            sleep_secs(9.5).await;
            assert!(connection.is_closed());
            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(transport.has_pending_reconnect());
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_inbound_messages_keep_connection_alive() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            for _ in 0..6 {
                sleep_secs(10.0).await;
                connection.emit_frame(ProtoMessage::new(PAYLOAD_HEARTBEAT_EVENT, Vec::new()));
                settle().await;
            }

            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
            assert!(!connection.is_closed());
            assert!(transport.is_transport_fresh(None));
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_connect_watchdog_expires() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let (_, errors) = record_callbacks(&transport);

            transport.connect();
            sleep_secs(10.5).await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(!transport.in_progress());
            assert!(connector.connection(0).unwrap().is_closed());
            assert_eq!(
                count_lines(&transport, "Connection watchdog expired: connect timeout"),
                1
            );
            assert_eq!(errors.borrow()[0].detail.as_deref(), Some("connect timeout"));
            assert!(transport.has_pending_reconnect());
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_app_auth_phase_gets_fresh_watchdog() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());

            transport.connect();
            sleep_secs(6.0).await;
            connector.last().unwrap().emit(TransportEvent::Connected);
            settle().await;

            sleep_secs(4.5).await;
            assert_eq!(transport.status(), ConnectionStatus::Connected);

            sleep_secs(6.0).await;
            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert_eq!(
                count_lines(&transport, "Connection watchdog expired: app-auth timeout"),
                1
            );
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_reconnect_attempts_are_capped() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let config = SessionConfig {
                reconnect_max_attempts: 2,
                ..test_config()
            };
            let (transport, connector) = new_transport(&event_loop, config);

            transport.connect();
            sleep_secs(200.0).await;

            assert_eq!(connector.connect_count(), 3);
            assert!(!transport.has_pending_reconnect());
            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert_eq!(
                count_lines(
                    &transport,
                    "Reconnect attempts exhausted (2), not reconnecting"
                ),
                1
            );
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_no_reconnect_without_auto_reconnect() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let config = SessionConfig {
                auto_reconnect: false,
                ..test_config()
            };
            let (transport, connector) = new_transport(&event_loop, config);
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            settle().await;
            sleep_secs(20.0).await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert_eq!(connector.connect_count(), 1);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_error_before_app_auth_tears_down() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let (_, errors) = record_callbacks(&transport);

            transport.connect();
            let connection = connector.last().unwrap();
            connection.emit(TransportEvent::Connected);
            settle().await;
            connection.emit_frame(oa_error(None, "101", "Invalid client credentials"));
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(!transport.in_progress());
            assert!(connection.is_closed());

            let errors = errors.borrow();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ErrorCode::Auth);
            assert_eq!(
                errors[0].message,
                "Error 101(CH_CLIENT_AUTH_FAILURE): Invalid client credentials"
            );
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_error_after_app_auth_is_passive() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let (_, errors) = record_callbacks(&transport);
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit_frame(oa_error(Some(42), "INVALID_REQUEST", "Order rejected"));
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
            assert!(!connection.is_closed());

            let errors = errors.borrow();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].code, ErrorCode::Provider);
            assert_eq!(errors[0].message, "Error INVALID_REQUEST: Order rejected");
        })
        .await;
}

#[rstest]
#[case("ALREADY_SUBSCRIBED", "Already subscribed to spots")]
#[case("INVALID_REQUEST", "Symbol is not subscribed")]
#[tokio::test(start_paused = true)]
async fn test_benign_subscription_errors_are_swallowed(
    #[case] code: &str,
    #[case] description: &str,
) {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let (_, errors) = record_callbacks(&transport);
            let connection = authenticate_transport(&transport, &connector).await;

            connection.emit_frame(oa_error(Some(42), code, description));
            settle().await;

            assert!(errors.borrow().is_empty());
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_manual_disconnect_stops_everything() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;
            transport.add_message_handler(HandlerId::next(), Rc::new(ignore_message));

            transport.disconnect();
            transport.disconnect();
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(connection.is_closed());
            assert!(!transport.is_heartbeat_running());
            assert!(!transport.has_pending_reconnect());
            assert_eq!(transport.message_handler_count(), 0);

            sleep_secs(120.0).await;
            assert_eq!(connector.connect_count(), 1);

            transport.connect();
            assert_eq!(connector.connect_count(), 2);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_app_auth_send_failure_is_retried() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());

            transport.connect();
            let connection = connector.last().unwrap();
            connection.set_fail_sends(true);
            connection.emit(TransportEvent::Connected);
            settle().await;

            assert_eq!(connection.sent_count(PAYLOAD_APPLICATION_AUTH_REQ), 0);
            connection.set_fail_sends(false);

            sleep_secs(2.5).await;
            assert_eq!(connection.sent_count(PAYLOAD_APPLICATION_AUTH_REQ), 1);

            connection.emit_frame(app_auth_response());
            settle().await;
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_send_failure_streak_restarts_transport() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            for _ in 0..5 {
                transport.report_send_failure("broken pipe");
            }
            assert!(!connection.is_closed());

            transport.report_send_failure("broken pipe");
            assert!(connection.is_closed());

            // The restart starts a new streak
            transport.report_send_failure("broken pipe");
            assert_eq!(count_lines(&transport, "Send failed: broken pipe (streak 1)"), 2);
            settle().await;

            assert_eq!(transport.status(), ConnectionStatus::Disconnected);
            assert!(transport.has_pending_reconnect());
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_send_failure_streak_keeps_connection_without_auto_reconnect() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let config = SessionConfig {
                auto_reconnect: false,
                ..test_config()
            };
            let (transport, connector) = new_transport(&event_loop, config);
            let connection = authenticate_transport(&transport, &connector).await;

            for _ in 0..8 {
                transport.report_send_failure("broken pipe");
            }
            settle().await;

            assert!(!connection.is_closed());
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
            assert_eq!(connector.connect_count(), 1);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_send_failures_outside_window_do_not_accumulate() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let connection = authenticate_transport(&transport, &connector).await;

            for _ in 0..5 {
                transport.report_send_failure("broken pipe");
            }
            // Keep inbound traffic flowing while the streak window lapses
            for _ in 0..3 {
                sleep_secs(7.0).await;
                connection.emit_frame(ProtoMessage::new(PAYLOAD_HEARTBEAT_EVENT, Vec::new()));
                settle().await;
            }
            transport.report_send_failure("broken pipe");

            assert!(!connection.is_closed());
            assert_eq!(transport.status(), ConnectionStatus::AppAuthenticated);
        })
        .await;
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_session_transitions_are_counted() {
    let event_loop = EventLoop::new();
    event_loop
        .run_until(async {
            let (transport, connector) = new_transport(&event_loop, test_config());
            let metrics = SessionMetrics::new().unwrap();
            transport.set_metrics(metrics.clone());

            let connection = authenticate_transport(&transport, &connector).await;
            assert_eq!(metrics.count("transport", SessionEvent::Connected), 1);
            assert_eq!(metrics.count("transport", SessionEvent::Success), 1);
            assert_eq!(metrics.latency_samples("transport"), 1);

            connection.emit_frame(oa_error(None, "INVALID_REQUEST", "Order rejected"));
            settle().await;
            assert_eq!(metrics.count("transport", SessionEvent::PassiveError), 1);
            assert_eq!(metrics.count("transport", SessionEvent::Error), 0);

            connection.emit(TransportEvent::Disconnected("reset by peer".to_string()));
            settle().await;
            assert_eq!(metrics.count("transport", SessionEvent::Disconnected), 1);
        })
        .await;
}
