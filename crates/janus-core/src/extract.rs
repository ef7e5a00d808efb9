//! Client address resolution and transport metadata extractors.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use std::net::SocketAddr;

/// Sentinel JA3 value when the transport carries no ClientHello metadata.
pub const NO_TLS: &str = "no-tls";

/// JA3-style fingerprint string derived from the ClientHello by the
/// transport glue and inserted as a request extension.
#[derive(Debug, Clone)]
pub struct TlsFingerprint(pub Box<str>);

/// Resolve the canonical client address: first `X-Forwarded-For` entry,
/// falling back to the socket peer, stripping ports for both v4 and
/// bracketed v6 forms.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
	if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
		if let Some(first) = forwarded.split(',').next() {
			let ip = strip_port(first.trim());
			if !ip.is_empty() && ip != "unknown" {
				return ip.to_string();
			}
		}
	}
	if let Some(peer) = peer {
		return peer.ip().to_string();
	}
	"unknown".to_string()
}

/// Strip a trailing `:port` from `host:port` / `[v6]:port` forms. A bare
/// IPv6 address (more than one colon, no brackets) is returned untouched.
fn strip_port(addr: &str) -> &str {
	if let Some(rest) = addr.strip_prefix('[') {
		if let Some(end) = rest.find(']') {
			return &rest[..end];
		}
		return addr;
	}
	match (addr.find(':'), addr.rfind(':')) {
		(Some(first), Some(last)) if first == last => &addr[..first],
		_ => addr,
	}
}

// ClientIp //
//**********//
/// Extractor producing the resolver-derived client address for a request.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0);
		Ok(ClientIp(client_ip(&parts.headers, peer)))
	}
}

// OptionalTls //
//*************//
/// Optional TLS metadata extractor that doesn't fail if the transport
/// recorded no ClientHello fingerprint.
#[derive(Debug, Clone)]
pub struct OptionalTls(pub Option<TlsFingerprint>);

impl<S> FromRequestParts<S> for OptionalTls
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(OptionalTls(parts.extensions.get::<TlsFingerprint>().cloned()))
	}
}

impl OptionalTls {
	/// The JA3 string seen on the wire, or the no-TLS sentinel.
	pub fn ja3(&self) -> &str {
		self.0.as_ref().map(|tls| tls.0.as_ref()).unwrap_or(NO_TLS)
	}
}


// vim: ts=4
