//! Server-Sent Events endpoint
//!
//! A `GET` on the mount path opens a long-lived `text/event-stream`
//! response fed by one hub subscription. Each stream is served from its
//! own thread; everything else gets a 404.

use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use super::session::SubscriberSession;
use crate::actor::hub::HubHandle;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Raw head of an event stream response.
const STREAM_HEAD: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/event-stream\r\n\
    Cache-Control: no-cache\r\n\
    Connection: keep-alive\r\n\
    Access-Control-Allow-Origin: *\r\n\r\n";

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut port = base_port;
    for offset in 0..MAX_PORT_RETRIES {
        port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 binds an ephemeral port; report the real one.
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) if offset + 1 == MAX_PORT_RETRIES => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
            Err(_) => continue,
        }
    }
    Err(anyhow::anyhow!("Failed to bind port {}", port))
}

/// Where and how streams are served
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Path subscribers connect to, e.g. `/heartBeat`
    pub mount: String,
    /// Reconnect delay advertised to clients
    pub retry_ms: u64,
}

/// A bound, not yet accepting, notification server
pub struct NotifyServer {
    server: Arc<Server>,
    addr: SocketAddr,
    options: StreamOptions,
}

impl NotifyServer {
    pub fn bind(interface: IpAddr, port: u16, options: StreamOptions) -> Result<Self> {
        let (server, addr) = bind_with_retry(interface, port)?;
        Ok(Self {
            server: Arc::new(server),
            addr,
            options,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, self.options.mount)
    }

    /// Start the acceptor thread.
    pub fn spawn(self, hub: HubHandle) -> Result<RunningServer> {
        let server = Arc::clone(&self.server);
        let options = self.options;
        let acceptor = thread::Builder::new()
            .name("sse-acceptor".into())
            .spawn(move || {
                for request in server.incoming_requests() {
                    if let Err(e) = handle_request(request, &options, &hub) {
                        log!("serve"; "request error: {e}");
                    }
                }
                debug!("serve"; "acceptor stopped");
            })
            .context("failed to spawn acceptor thread")?;

        Ok(RunningServer {
            server: self.server,
            addr: self.addr,
            acceptor,
        })
    }
}

/// A server accepting subscribers
pub struct RunningServer {
    server: Arc<Server>,
    addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and wait for the acceptor to exit.
    ///
    /// Open streams end once the hub drops their queues.
    pub fn shutdown(self) {
        self.server.unblock();
        if self.acceptor.join().is_err() {
            log!("error"; "acceptor thread panicked");
        }
    }
}

/// Route one request: subscribe on the mount path, 404 elsewhere.
pub fn handle_request(request: Request, options: &StreamOptions, hub: &HubHandle) -> Result<()> {
    let path = request.url().split('?').next().unwrap_or_default();
    if path != options.mount {
        return send_status(request, 404, "404 Not Found");
    }
    if request.method() != &Method::Get {
        return send_status(request, 405, "405 Method Not Allowed");
    }

    let Some(subscription) = hub.subscribe() else {
        return send_status(request, 503, "503 Service Unavailable");
    };

    let peer = request
        .remote_addr()
        .map_or_else(|| "unknown".to_string(), |a| a.to_string());
    let id = subscription.id();

    // Headers are written by hand: a chunked tiny_http response would buffer.
    let mut stream = request.into_writer();
    stream.write_all(STREAM_HEAD.as_bytes())?;
    stream.flush()?;
    debug!("serve"; "subscriber {} connected from {}", id, peer);

    let retry_ms = options.retry_ms;
    thread::Builder::new()
        .name(format!("sse-session-{id}"))
        .spawn(move || {
            let end = SubscriberSession::new(subscription, retry_ms).run(&mut stream);
            debug!("serve"; "subscriber {} finished: {:?}", id, end);
        })
        .context("failed to spawn session thread")?;
    Ok(())
}

fn send_status(request: Request, status: u16, body: &str) -> Result<()> {
    let header = Header::from_bytes("Content-Type", "text/plain; charset=utf-8")
        .map_err(|_| anyhow::anyhow!("invalid header"))?;
    let response = Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(header);
    request.respond(response)?;
    Ok(())
}
