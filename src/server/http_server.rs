use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use may::coroutine::JoinHandle;
use may_minihttp::HttpServerWithHeaders;
use tracing::info;

use super::service::RouterService;

/// Maximum request headers accepted per request.
pub const MAX_HEADERS: usize = 32;

/// Handle to a running HTTP server.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listen address until a TCP connection succeeds.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server is not accepting after ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the accept loop and wait for it to exit.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping server");
        // SAFETY: the handle is owned here and the coroutine is only ever
        // cancelled once, during shutdown.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    /// Block until the server coroutine finishes.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

/// Bind `addr` and serve `service` on the `may` runtime.
///
/// # Errors
///
/// Fails if the address does not resolve or cannot be bound.
pub fn start<A: ToSocketAddrs>(service: RouterService, addr: A) -> io::Result<ServerHandle> {
    let addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
    let handle = HttpServerWithHeaders::<_, MAX_HEADERS>(service).start(addr)?;
    info!(addr = %addr, "Server listening");
    Ok(ServerHandle { addr, handle })
}
