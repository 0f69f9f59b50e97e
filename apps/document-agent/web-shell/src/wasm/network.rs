use super::*;

use document_agent_client_core::login::LoginUrlResponse;
use document_agent_client_core::{ChannelSink, ConnectionId, LoginError, TransportEvent};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::future::poll_fn;
use futures::{FutureExt, SinkExt, StreamExt, pin_mut, select};
use gloo_net::http::Request;
use gloo_net::websocket::{Message as WsMessage, WebSocketError, futures::WebSocket};

    pub(super) async fn fetch_login_url(config: &BackendConfig) -> Result<String, LoginError> {
        let endpoint = config.login_endpoint();
        let response = Request::get(&endpoint).send().await.map_err(|error| {
            tracing::warn!(%endpoint, error = %error, "login url request failed");
            LoginError::ProviderUnavailable
        })?;
        if !response.ok() {
            tracing::warn!(%endpoint, status = response.status(), "login url request rejected");
            return Err(LoginError::ProviderUnavailable);
        }
        let body: LoginUrlResponse = response.json().await.map_err(|error| {
            tracing::warn!(error = %error, "login url response undecodable");
            LoginError::ProviderUnavailable
        })?;
        let login_url = body.login_url.trim().to_string();
        if login_url.is_empty() {
            return Err(LoginError::ProviderUnavailable);
        }
        Ok(login_url)
    }

    /// Outgoing half of a chat socket. Frames are queued to the socket task;
    /// closing the queue makes the task close the socket and exit.
    #[derive(Debug)]
    pub(crate) struct SocketSink {
        outgoing: UnboundedSender<String>,
    }

    impl ChannelSink for SocketSink {
        type Error = String;

        fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
            self.outgoing
                .unbounded_send(text.to_string())
                .map_err(|error| format!("chat socket task is gone: {error}"))
        }

        fn close(&mut self) {
            self.outgoing.close_channel();
        }
    }

    pub(super) fn open_chat_socket(url: &str, connection: ConnectionId) -> Result<SocketSink, String> {
        let socket = WebSocket::open(url).map_err(|error| format!("{error}"))?;
        let (outgoing, queued) = unbounded::<String>();
        spawn_local(run_chat_socket(socket, queued, connection));
        Ok(SocketSink { outgoing })
    }

    async fn run_chat_socket(
        socket: WebSocket,
        mut queued: UnboundedReceiver<String>,
        connection: ConnectionId,
    ) {
        let (mut write, mut read) = socket.split();

        // The sink stays pending until the handshake finishes.
        if let Err(error) = poll_fn(|cx| write.poll_ready_unpin(cx)).await {
            deliver_transport_event(connection, TransportEvent::Errored(error.to_string()));
            return;
        }
        deliver_transport_event(connection, TransportEvent::Opened);

        loop {
            let next_frame = read.next().fuse();
            let next_outgoing = queued.next().fuse();
            pin_mut!(next_frame, next_outgoing);

            select! {
                frame = next_frame => match frame {
                    Some(Ok(message)) => match websocket_text(message) {
                        Ok(text) => deliver_transport_event(connection, TransportEvent::Frame(text)),
                        Err(error) => tracing::warn!(%error, "dropping binary chat frame"),
                    },
                    Some(Err(WebSocketError::ConnectionClose(event))) => {
                        tracing::info!(code = event.code, reason = %event.reason, "chat socket closed by server");
                        deliver_transport_event(connection, TransportEvent::Closed);
                        break;
                    }
                    Some(Err(error)) => {
                        deliver_transport_event(connection, TransportEvent::Errored(error.to_string()));
                        break;
                    }
                    None => {
                        deliver_transport_event(connection, TransportEvent::Closed);
                        break;
                    }
                },
                text = next_outgoing => match text {
                    Some(text) => {
                        if let Err(error) = write.send(WsMessage::Text(text)).await {
                            deliver_transport_event(connection, TransportEvent::Errored(error.to_string()));
                            break;
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        tracing::debug!(?connection, "chat socket released");
                        break;
                    }
                },
            }
        }
    }

    pub(super) fn websocket_text(message: WsMessage) -> Result<String, String> {
        match message {
            WsMessage::Text(text) => Ok(text),
            WsMessage::Bytes(bytes) => String::from_utf8(bytes)
                .map_err(|error| format!("invalid websocket frame encoding: {error}")),
        }
    }

    /// Routes one socket callback into the mounted conversation, if any, and
    /// repaints. Callbacks of a discarded connection are filtered by the
    /// channel manager.
    pub(super) fn deliver_transport_event(connection: ConnectionId, event: TransportEvent) {
        let delivered = CONVERSATION.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|controller| controller.handle_transport_event(connection, event))
        });
        if delivered.is_some() {
            render_chat_dom();
        }
    }
