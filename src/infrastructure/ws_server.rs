//! OCPP 1.6 WebSocket server — the Connection Acceptor.
//!
//! Accepts charge-point connections at `ws://<host>:<port>/ocpp/{cpid}`,
//! instantiates one orchestrator per charge point, registers it in the
//! global registry (evicting any prior session for the same cpid), and
//! tears it down on disconnect.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::application::orchestrator::{handle_inbound_text, Orchestrator, Services};
use crate::application::session::registry::RegisterResult;
use crate::support::shutdown::ShutdownSignal;

const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

pub struct WsServer {
    bind_addr: String,
    services: Services,
    shutdown_signal: Option<ShutdownSignal>,
}

impl WsServer {
    pub fn new(bind_addr: String, services: Services) -> Self {
        Self {
            bind_addr,
            services,
            shutdown_signal: None,
        }
    }

    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("OCPP 1.6 central system listening on ws://{}", self.bind_addr);
        info!(
            "charge points should connect to ws://{}/ocpp/<cpid>",
            self.bind_addr
        );

        if let Some(shutdown) = &self.shutdown_signal {
            self.run_with_shutdown(listener, shutdown.clone()).await
        } else {
            self.run_loop(listener).await
        }
    }

    async fn run_loop(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        while let Ok((stream, addr)) = listener.accept().await {
            self.spawn_connection(stream, addr);
        }
        Ok(())
    }

    async fn run_with_shutdown(
        &self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("WebSocket acceptor received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let services = self.services.clone();
        let shutdown = self.shutdown_signal.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, services, shutdown).await {
                error!(%addr, error = %e, "connection error");
            }
        });
    }
}

fn extract_cpid(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    let id = path.strip_prefix("ocpp/").unwrap_or(path);
    let id = id.trim_start_matches('/');
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id.to_string())
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    services: Services,
    shutdown: Option<ShutdownSignal>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cpid: Option<String> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();
            cpid = extract_cpid(path);

            let requested = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            if requested.split(',').map(str::trim).any(|p| p == OCPP_SUBPROTOCOL) {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
            }

            Ok(response)
        },
    )
    .await?;

    let cpid = cpid.unwrap_or_else(|| format!("CP_{}", addr.port()));
    info!(cpid, %addr, "charge point connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let (evict_tx, mut evict_rx) = oneshot::channel();

    let orchestrator = Orchestrator::new(cpid.clone(), services.clone(), tx.clone());

    if let RegisterResult::Evicted =
        services
            .sessions
            .register(&cpid, tx.clone(), orchestrator.clone(), evict_tx)
    {
        warn!(cpid, "reconnect evicted a prior session");
    }

    let send_cpid = cpid.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(msg)).await {
                error!(cpid = send_cpid, error = %e, "send error, closing connection");
                break;
            }
        }
    });

    let recv_orchestrator = orchestrator.clone();
    let recv_cpid = cpid.clone();
    let recv_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handle_inbound_text(&recv_orchestrator, &text).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(cpid = recv_cpid, ?frame, "close frame received");
                            break;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            warn!(cpid = recv_cpid, bytes = data.len(), "ignoring binary message");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(cpid = recv_cpid, error = %e, "websocket error");
                            break;
                        }
                        None => break,
                    }
                }
                _ = &mut evict_rx => {
                    warn!(cpid = recv_cpid, "connection evicted by a reconnecting charge point");
                    break;
                }
            }
        }
    });

    if let Some(shutdown) = shutdown {
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
            _ = shutdown.notified().wait() => {
                info!(cpid, "connection closing for server shutdown");
            }
        }
    } else {
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }
    }

    orchestrator.teardown();
    services.sessions.unregister_if_current(&cpid, &tx);
    info!(cpid, "charge point disconnected");

    Ok(())
}
