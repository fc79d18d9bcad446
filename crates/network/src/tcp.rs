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

//! TCP (optionally TLS) transport carrying length-prefixed protobuf frames.
//!
//! Each connection runs as a single task that owns the socket. Writes are queued through an
//! unbounded channel and reads are forwarded to the session's event channel tagged with the
//! connection epoch.

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures_util::{SinkExt, StreamExt};
use rustls::ClientConfig;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::codec::Framed;

use crate::{
    codec::{ProtoFrameCodec, ProtoMessage},
    error::TransportError,
    tls::wrap_stream,
    transport::{Connection, ConnectionEpoch, Connector, Endpoint, EventSender, TransportEvent},
};

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// Commands queued from the session to the connection task.
#[derive(Debug)]
enum WriterCommand {
    Send(ProtoMessage),
    Close,
}

/// Opens [`TcpConnection`]s.
#[derive(Clone, Default)]
pub struct TcpConnector {
    tls_config: Option<Arc<ClientConfig>>,
}

impl Debug for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(TcpConnector))
            .field("custom_tls_config", &self.tls_config.is_some())
            .finish()
    }
}

impl TcpConnector {
    /// Creates a new connector using the default web PKI trust roots for TLS endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` instead of the default TLS client configuration.
    #[must_use]
    pub fn with_tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }
}

impl Connector for TcpConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        epoch: ConnectionEpoch,
        events: EventSender,
    ) -> Rc<dyn Connection> {
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_connection(
            endpoint.clone(),
            self.tls_config.clone(),
            epoch,
            events,
            writer_rx,
            closed.clone(),
        ));

        Rc::new(TcpConnection {
            epoch,
            writer_tx,
            closed,
        })
    }
}

/// Handle to a connection task started by [`TcpConnector`].
#[derive(Debug)]
pub struct TcpConnection {
    epoch: ConnectionEpoch,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    closed: Arc<AtomicBool>,
}

impl Connection for TcpConnection {
    fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    fn send(&self, message: ProtoMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.writer_tx
            .send(WriterCommand::Send(message))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.writer_tx.send(WriterCommand::Close);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

async fn open_stream(
    endpoint: &Endpoint,
    tls_config: Option<Arc<ClientConfig>>,
) -> Result<Box<dyn AsyncStream>, TransportError> {
    let socket = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
    socket.set_nodelay(true)?;

    if endpoint.tls {
        let stream = wrap_stream(socket, &endpoint.host, tls_config).await?;
        Ok(Box::new(stream))
    } else {
        Ok(Box::new(socket))
    }
}

async fn run_connection(
    endpoint: Endpoint,
    tls_config: Option<Arc<ClientConfig>>,
    epoch: ConnectionEpoch,
    events: EventSender,
    mut writer_rx: mpsc::UnboundedReceiver<WriterCommand>,
    closed: Arc<AtomicBool>,
) {
    tracing::debug!("Opening connection to {endpoint} (epoch {epoch})");

    let stream = tokio::select! {
        result = open_stream(&endpoint, tls_config) => result,
        () = wait_for_close(&mut writer_rx) => Err(TransportError::Closed),
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            closed.store(true, Ordering::Release);
            let _ = events.send((epoch, TransportEvent::Disconnected(e.to_string())));
            return;
        }
    };

    if events.send((epoch, TransportEvent::Connected)).is_err() {
        closed.store(true, Ordering::Release);
        return;
    }

    let (mut sink, mut frames) = Framed::new(stream, ProtoFrameCodec::default()).split();

    // Framed yields a single `None` after a decode error before reading on
    let mut resuming = false;

    let reason = loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(message)) => {
                    resuming = false;
                    if events.send((epoch, TransportEvent::Frame(message))).is_err() {
                        break "Event receiver dropped".to_string();
                    }
                }
                Some(Err(e)) if !e.is_fatal() => {
                    tracing::warn!("Dropping undecodable frame from {endpoint}: {e}");
                    resuming = true;
                }
                Some(Err(e)) => break format!("Read failed: {e}"),
                None if resuming => resuming = false,
                None => break "Connection closed by remote".to_string(),
            },
            command = writer_rx.recv() => match command {
                Some(WriterCommand::Send(message)) => {
                    if let Err(e) = sink.send(message).await {
                        let _ = events.send((epoch, TransportEvent::SendFailed(e.to_string())));
                        if e.is_fatal() {
                            break format!("Write failed: {e}");
                        }
                    }
                }
                Some(WriterCommand::Close) | None => {
                    let _ = sink.close().await;
                    break "Connection closed locally".to_string();
                }
            },
        }
    };

    closed.store(true, Ordering::Release);
    tracing::debug!("Connection to {endpoint} ended (epoch {epoch}): {reason}");
    let _ = events.send((epoch, TransportEvent::Disconnected(reason)));
}

async fn wait_for_close(writer_rx: &mut mpsc::UnboundedReceiver<WriterCommand>) {
    // Nothing is written before the stream opens
    loop {
        match writer_rx.recv().await {
            Some(WriterCommand::Close) | None => return,
            Some(WriterCommand::Send(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::time::Duration;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::transport::event_channel;

    #[rstest]
    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::new("127.0.0.1", port, false);
        let (events_tx, mut events_rx) = event_channel();

        let connection = TcpConnector::new().connect(&endpoint, ConnectionEpoch::new(7), events_tx);
        let (socket, _) = listener.accept().await.unwrap();
        let mut server = Framed::new(socket, ProtoFrameCodec::default());

        assert_eq!(
            events_rx.recv().await.unwrap(),
            (ConnectionEpoch::new(7), TransportEvent::Connected)
        );

        connection.send(ProtoMessage::new(2100, vec![9])).unwrap();
        let received = server.next().await.unwrap().unwrap();
        assert_eq!(received.payload_type, 2100);

        server.send(ProtoMessage::new(2101, Vec::new())).await.unwrap();
        let (epoch, event) = events_rx.recv().await.unwrap();
        assert_eq!(epoch.value(), 7);
        assert_eq!(event, TransportEvent::Frame(ProtoMessage::new(2101, Vec::new())));
    }

    #[rstest]
    #[tokio::test]
    async fn test_undecodable_frame_is_dropped_without_disconnecting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::new("127.0.0.1", port, false);
        let (events_tx, mut events_rx) = event_channel();

        let connection = TcpConnector::new().connect(&endpoint, ConnectionEpoch::new(2), events_tx);
        let (mut socket, _) = listener.accept().await.unwrap();
        assert_eq!(events_rx.recv().await.unwrap().1, TransportEvent::Connected);

        // A well-framed body that is not a valid envelope
        let garbage = [0xffu8; 3];
        socket.write_u32(garbage.len() as u32).await.unwrap();
        socket.write_all(&garbage).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut server = Framed::new(socket, ProtoFrameCodec::default());
        server.send(ProtoMessage::new(2101, Vec::new())).await.unwrap();

        let (_, event) = events_rx.recv().await.unwrap();
        assert_eq!(event, TransportEvent::Frame(ProtoMessage::new(2101, Vec::new())));
        assert!(!connection.is_closed());
    }

    #[rstest]
    #[tokio::test]
    async fn test_local_close_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::new("127.0.0.1", port, false);
        let (events_tx, mut events_rx) = event_channel();

        let connection = TcpConnector::new().connect(&endpoint, ConnectionEpoch::new(1), events_tx);
        let (mut socket, _) = listener.accept().await.unwrap();
        assert_eq!(events_rx.recv().await.unwrap().1, TransportEvent::Connected);

        connection.close();
        assert!(connection.is_closed());
        assert!(matches!(
            connection.send(ProtoMessage::new(51, Vec::new())),
            Err(TransportError::Closed)
        ));

        let (_, event) = events_rx.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::Disconnected(_)));

        let mut buf = [0u8; 1];
        assert_eq!(socket.read(&mut buf).await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_refused_connection_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::new("127.0.0.1", port, false);
        let (events_tx, mut events_rx) = event_channel();
        let connection = TcpConnector::new().connect(&endpoint, ConnectionEpoch::new(3), events_tx);

        let (epoch, event) = events_rx.recv().await.unwrap();
        assert_eq!(epoch.value(), 3);
        assert!(matches!(event, TransportEvent::Disconnected(_)));
        assert!(connection.is_closed());
    }
}
