//! The gate pipeline: every request that is not a challenge-API or static
//! asset call lands here. Verified callers flow through to the origin;
//! everyone else is scored and served the sensor bootstrap page.

pub mod geo;
pub mod risk;
pub mod token;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::response::{Html, IntoResponse, Response};

use crate::prelude::*;
use crate::proxy;
use janus_core::extract::{ClientIp, OptionalTls};

/// Gate entry point, mounted as the router fallback.
pub async fn handle(
	State(app): State<App>,
	ClientIp(client_ip): ClientIp,
	tls: OptionalTls,
	req: Request<Body>,
) -> Response {
	debug!(
		"Request: {} {} ip={} ua={:?}",
		req.method(),
		req.uri().path(),
		client_ip,
		req.headers().get(header::USER_AGENT)
	);

	if let Err(err) = check_rate_limit(&app, &req, &client_ip) {
		return err.into_response();
	}

	if token::is_verified(&app, req.headers(), &client_ip).is_some() {
		debug!("Serving proxied content for verified client {}", client_ip);
		return match proxy::forward(&app, req, &client_ip).await {
			Ok(resp) => resp,
			Err(err) => err.into_response(),
		};
	}

	let fingerprint = app.fingerprints.get(&client_ip);
	let input = risk::RiskInput::from_request(req.headers(), req.uri().path(), tls.ja3(), &client_ip);
	let (suspicious, score) = app.scorer.score(&input, fingerprint.as_ref());
	info!(
		"Unverified client {} (suspicious: {}, score: {}), serving bootstrap",
		client_ip, suspicious, score
	);
	bootstrap_page(&app, &client_ip)
}

/// Privileged callers are keyed by API key, everyone else by address.
fn check_rate_limit(app: &App, req: &Request<Body>, client_ip: &str) -> JnResult<()> {
	let is_api = req
		.headers()
		.get("x-janus-user-type")
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| v.eq_ignore_ascii_case("api"));
	if is_api {
		if let Some(key) = req.headers().get("x-janus-api-key").and_then(|v| v.to_str().ok()) {
			if !key.is_empty() {
				return app.rate_limiter.check_api(key);
			}
		}
	}
	app.rate_limiter.check(client_ip)
}

/// Minimal HTML that loads the sensor script. The embedded nonce is stored
/// against the caller's address and consumed by the verification flow.
fn bootstrap_page(app: &App, client_ip: &str) -> Response {
	let nonce = app.nonces.mint(client_ip, Timestamp::now());
	let body = format!(
		concat!(
			"<!DOCTYPE html>\n",
			"<html>\n<head>\n",
			"<meta charset=\"utf-8\">\n",
			"<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
			"<title>Checking your browser</title>\n",
			"</head>\n<body>\n",
			"<noscript>This site requires JavaScript.</noscript>\n",
			"<p>Checking your browser&hellip;</p>\n",
			"<script src=\"{src}\" data-nonce=\"{nonce}\"></script>\n",
			"</body>\n</html>\n",
		),
		src = app.config.inject_script_path,
		nonce = nonce,
	);
	Html(body).into_response()
}


// vim: ts=4
