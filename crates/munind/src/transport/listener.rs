//! Listener implementation for the node's TCP socket.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::access::{AccessGuard, peer_text};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to the node's listen address.
///
/// The socket is owned by the accept loop once started and closed when the
/// loop exits, whichever way it exits.
#[derive(Debug)]
pub struct SocketListener {
    address: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Binds `host:port`. Port `0` picks an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] when the host does not resolve or the
    /// address cannot be bound.
    pub fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let address = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self { address, listener })
    }

    /// Address actually bound.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Starts the accept loop on a background thread.
    ///
    /// Each peer is checked against `guard` before a worker thread is
    /// spawned for it; denied peers are closed immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::NonBlocking`] when the socket cannot be put
    /// into non-blocking mode.
    pub fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        guard: Arc<AccessGuard>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let address = self.address;
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler, &guard));
        Ok(ListenerHandle {
            address,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
pub struct ListenerHandle {
    address: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Asks the accept loop to stop. Established sessions are unaffected.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    guard: &Arc<AccessGuard>,
) {
    info!(
        target: LISTENER_TARGET,
        address = %listener.address,
        rules = guard.len(),
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                dispatch(stream, peer, handler, guard);
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: LISTENER_TARGET, address = %listener.address, "socket listener stopped");
}

fn dispatch(
    stream: TcpStream,
    peer: SocketAddr,
    handler: &Arc<dyn ConnectionHandler>,
    guard: &AccessGuard,
) {
    if !guard.allows_peer(peer.ip()) {
        info!(
            target: LISTENER_TARGET,
            peer = %peer_text(peer.ip()),
            "access denied"
        );
        drop(stream);
        return;
    }
    debug!(target: LISTENER_TARGET, %peer, "connection accepted");
    let handler = Arc::clone(handler);
    thread::spawn(move || handler.handle(stream, peer));
}

fn accept_connection(
    listener: &SocketListener,
) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
    match listener.listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    match TcpListener::bind(addr) {
        Ok(listener) => Ok(listener),
        Err(source) if is_ipv6_wildcard(addr) => {
            let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
            debug!(
                target: LISTENER_TARGET,
                %addr,
                %fallback,
                error = %source,
                "IPv6 wildcard unavailable, binding IPv4 only"
            );
            TcpListener::bind(fallback).map_err(|source| ListenerError::BindTcp {
                addr: fallback,
                source,
            })
        }
        Err(source) => Err(ListenerError::BindTcp { addr, source }),
    }
}

fn is_ipv6_wildcard(addr: SocketAddr) -> bool {
    matches!(addr.ip(), IpAddr::V6(ip) if ip.is_unspecified())
}
