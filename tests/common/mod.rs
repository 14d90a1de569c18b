#![allow(dead_code)]

pub mod handlers {
    use arbor::Context;
    use http::StatusCode;

    /// Responds `200 text/plain` with the matched route pattern.
    pub fn echo_pattern(ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let pattern = ctx.route_pattern().to_string();
        ctx.send_text(StatusCode::OK, pattern);
        Ok(())
    }

    pub fn noop(_: &mut Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub mod requests {
    use http::{Method, Request};

    pub fn request(method: Method, uri: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Vec<u8>> {
        request(Method::GET, uri)
    }

    pub fn body_text(response: &arbor::Response) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    pub fn body_json(response: &arbor::Response) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }
}

pub mod test_server {
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Once;

    use arbor::server::{self, RouterService, ServerHandle};
    use arbor::Registry;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Server on a random local port, stopped on drop.
    pub struct TestServer {
        service: RouterService,
        handle: Option<ServerHandle>,
        addr: SocketAddr,
    }

    impl TestServer {
        pub fn start(registry: &Registry) -> Self {
            setup_may_runtime();

            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let service = RouterService::new(registry.build());
            let handle = server::start(service.clone(), addr).unwrap();
            handle.wait_ready().unwrap();

            Self {
                service,
                handle: Some(handle),
                addr,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }

        pub fn service(&self) -> &RouterService {
            &self.service
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod wire {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// A parsed HTTP/1.1 response.
    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .get(&name.to_ascii_lowercase())
                .map(String::as_str)
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Write `request` verbatim and read back one response.
    ///
    /// Reads until the headers and `Content-Length` bytes of body arrive,
    /// the peer closes, or the read times out.
    pub fn send_request(addr: &SocketAddr, request: &str) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream.write_all(request.as_bytes()).unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(total) = expected_len(&buf) {
                if buf.len() >= total {
                    break;
                }
            }
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        parse(&String::from_utf8_lossy(&buf))
    }

    pub fn get(addr: &SocketAddr, path: &str) -> RawResponse {
        send_request(
            addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        )
    }

    fn expected_len(buf: &[u8]) -> Option<usize> {
        let text = std::str::from_utf8(buf).ok()?;
        let head_end = text.find("\r\n\r\n")?;
        let content_length = text[..head_end]
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        Some(head_end + 4 + content_length)
    }

    fn parse(resp: &str) -> RawResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}
