//! Request-echo server used as a call target.
//!
//! `GET /` answers `ok`; any method on `/dump` answers with a plain-text rendering of the request
//! it received (request line, headers, blank line, body), which makes the bearer header the
//! caller sent directly visible.

// std
use std::io;
// crates.io
use axum::{
	Router,
	body::Bytes,
	http::{HeaderMap, Method, Uri, Version},
	routing::any,
};
use tokio::net::TcpListener;

/// Builds the router.
pub fn router() -> Router {
	Router::new().route("/dump", any(dump)).fallback(front)
}

/// Serves [`router`] on `listener` until the process stops.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
	axum::serve(listener, router()).await
}

/// Renders a request the way it appeared on the wire.
pub fn render_request_dump(
	method: &Method,
	uri: &Uri,
	version: Version,
	headers: &HeaderMap,
	body: &[u8],
) -> String {
	let mut dump = format!("{method} {uri} {version:?}\r\n");

	for (name, value) in headers {
		dump.push_str(name.as_str());
		dump.push_str(": ");
		dump.push_str(&String::from_utf8_lossy(value.as_bytes()));
		dump.push_str("\r\n");
	}

	dump.push_str("\r\n");
	dump.push_str(&String::from_utf8_lossy(body));

	dump
}

async fn front() -> &'static str {
	#[cfg(feature = "tracing")]
	tracing::info!("/ called");

	"ok"
}

async fn dump(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> String {
	render_request_dump(&method, &uri, version, &headers, &body)
}
