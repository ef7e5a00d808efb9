//! HTTP forwarding to the protected origin.
//!
//! Verified traffic is forwarded with method, path, query, and body
//! preserved. `text/html` responses are buffered and pass through the
//! script injector; everything else, and anything compressed, streams
//! through untouched. Upstream error responses are relayed verbatim.

pub mod inject;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response};
use http_body_util::BodyExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::prelude::*;

/// Headers that should not be forwarded between client and backend (hop-by-hop)
const HOP_BY_HOP_HEADERS: &[&str] = &[
	"connection",
	"keep-alive",
	"proxy-authenticate",
	"proxy-authorization",
	"te",
	"trailers",
	"transfer-encoding",
];

const PROXY_HEADER: &str = "x-janus-proxy";
const PROXY_HEADER_VALUE: &str = "janus/1.0";

fn is_hop_by_hop(name: &HeaderName) -> bool {
	HOP_BY_HOP_HEADERS.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

/// The single configured origin and the pooled client used to reach it.
pub struct Upstream {
	base: Url,
	client: Client<HttpConnector, Body>,
}

impl Upstream {
	pub fn new(backend: &str) -> JnResult<Self> {
		let base = Url::parse(backend)
			.map_err(|e| Error::ConfigError(format!("invalid backend URL: {}", e)))?;
		if base.scheme() != "http" {
			return Err(Error::ConfigError(format!(
				"unsupported backend scheme: {}",
				base.scheme()
			)));
		}
		let client = Client::builder(TokioExecutor::new())
			.pool_idle_timeout(Duration::from_secs(30))
			.build(HttpConnector::new());
		Ok(Self { base, client })
	}
}

/// Build the backend URI from the configured origin and the request URI
fn build_backend_uri(base: &Url, original: &axum::http::Uri) -> JnResult<axum::http::Uri> {
	let mut backend = base.clone();
	let combined_path = format!("{}{}", backend.path().trim_end_matches('/'), original.path());
	backend.set_path(&combined_path);
	backend.set_query(original.query());
	backend
		.as_str()
		.parse()
		.map_err(|e| Error::Internal(format!("failed to build backend URI: {}", e)))
}

/// Copy non-hop-by-hop headers from source to destination
fn copy_headers(src: &HeaderMap, dst: &mut HeaderMap) {
	for (name, value) in src.iter() {
		if is_hop_by_hop(name) {
			continue;
		}
		dst.append(name.clone(), value.clone());
	}
}

/// Forward a verified request to the origin. `text/html` responses are
/// routed through the injector; the rest stream through.
pub async fn forward(app: &App, req: Request<Body>, client_ip: &str) -> JnResult<Response<Body>> {
	let backend_uri = build_backend_uri(&app.upstream.base, req.uri())?;

	let (parts, body) = req.into_parts();
	let mut backend_headers = HeaderMap::new();
	copy_headers(&parts.headers, &mut backend_headers);
	backend_headers
		.insert(HeaderName::from_static(PROXY_HEADER), HeaderValue::from_static(PROXY_HEADER_VALUE));

	let mut backend_req = Request::builder().method(parts.method).uri(backend_uri);
	if let Some(headers) = backend_req.headers_mut() {
		*headers = backend_headers;
	}
	let backend_req = backend_req
		.body(body)
		.map_err(|e| Error::Internal(format!("failed to build backend request: {}", e)))?;

	let round_trip = Duration::from_secs(app.config.write_timeout_seconds);
	let backend_resp =
		match tokio::time::timeout(round_trip, app.upstream.client.request(backend_req)).await {
			Ok(Ok(resp)) => resp,
			Ok(Err(e)) => {
				warn!("Proxy backend error for {}: {}", client_ip, e);
				return Err(Error::NetworkError("bad gateway".into()));
			}
			Err(_) => {
				warn!("Proxy backend timeout for {}", client_ip);
				return Err(Error::Timeout);
			}
		};

	let (mut parts, body) = backend_resp.into_parts();
	let hop: Vec<HeaderName> =
		parts.headers.keys().filter(|name| is_hop_by_hop(name)).cloned().collect();
	for name in hop {
		parts.headers.remove(&name);
	}

	if !should_inject(&parts.headers) {
		return Ok(Response::from_parts(parts, Body::new(body)));
	}

	// Fully buffer the HTML body; the injected tag changes its length
	let bytes = body
		.collect()
		.await
		.map_err(|e| Error::NetworkError(format!("upstream body error: {}", e)))?
		.to_bytes();

	let nonce = app.nonces.mint(client_ip, Timestamp::now());
	let tag = inject::script_tag(&app.config.inject_script_path, &nonce);
	let rewritten = inject::inject(&bytes, &tag);

	parts.headers.remove(header::CONTENT_ENCODING);
	if let Ok(len) = HeaderValue::from_str(&rewritten.len().to_string()) {
		parts.headers.insert(header::CONTENT_LENGTH, len);
	}
	debug!("Injected sensor script for {} ({} bytes)", client_ip, rewritten.len());
	Ok(Response::from_parts(parts, Body::from(rewritten)))
}

/// Only uncompressed HTML is rewritten; compressed bodies pass through.
fn should_inject(headers: &HeaderMap) -> bool {
	let is_html = headers
		.get(header::CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
	let encoded = headers
		.get(header::CONTENT_ENCODING)
		.and_then(|v| v.to_str().ok())
		.is_some_and(|enc| !enc.is_empty());
	is_html && !encoded
}


// vim: ts=4
