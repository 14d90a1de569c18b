use std::io::{self, Read};

use may_minihttp::Request;
use tracing::debug;

/// Convert a `may_minihttp` request into an owned `http::Request`.
///
/// Header names and values are copied as-is; the body is read to the end.
///
/// # Errors
///
/// `InvalidData` if the method, URI or a header is malformed, or the
/// underlying read error if the body cannot be read.
pub fn into_http_request(req: Request) -> io::Result<http::Request<Vec<u8>>> {
    let mut builder = http::Request::builder()
        .method(req.method())
        .uri(req.path());
    let header_count = req.headers().len();
    for h in req.headers() {
        builder = builder.header(h.name, h.value);
    }

    // body() consumes the request, so it must come last
    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    let request = builder
        .body(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        headers_count = header_count,
        body_size_bytes = request.body().len(),
        "HTTP request parsed"
    );
    Ok(request)
}
