//! HMAC-signed session token: minting, validation, and cookie plumbing.
//!
//! The cookie value is an HS256 token carrying `{ip, exp, sid}`. The `ip`
//! claim binds the credential to the resolver-derived originator address;
//! `sid` keys the server-side session record used by telemetry. Any parse,
//! signature, expiry, or binding failure means "not verified" and the gate
//! silently falls back to the bootstrap flow.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

pub const COOKIE_NAME: &str = "janus_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
	pub ip: String,
	pub exp: i64,
	pub sid: String,
}

pub struct SessionKeys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
}

impl SessionKeys {
	pub fn new(secret: &[u8]) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		// exp must be strictly in the future
		validation.leeway = 0;
		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
		}
	}

	pub fn mint(&self, client_ip: &str, sid: &str, ttl_secs: i64) -> JnResult<String> {
		let claims = SessionClaims {
			ip: client_ip.to_string(),
			exp: Timestamp::from_now(ttl_secs).0,
			sid: sid.to_string(),
		};
		encode(&Header::default(), &claims, &self.encoding)
			.map_err(|e| Error::Internal(format!("token signing failed: {}", e)))
	}

	/// Validate a token and its address binding.
	pub fn validate(&self, token: &str, client_ip: &str) -> Option<SessionClaims> {
		let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).ok()?;
		if data.claims.ip != client_ip {
			debug!("Session token address mismatch for {}", client_ip);
			return None;
		}
		Some(data.claims)
	}
}

/// Read a cookie value from the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	for cookie_header in headers.get_all(header::COOKIE) {
		let raw = cookie_header.to_str().ok()?;
		for pair in raw.split(';') {
			if let Some((key, value)) = pair.trim().split_once('=') {
				if key == name {
					return Some(value);
				}
			}
		}
	}
	None
}

/// Build the `Set-Cookie` value for a freshly minted session token.
pub fn build_cookie(token: &str, max_age_secs: u64) -> String {
	format!(
		"{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Strict",
		COOKIE_NAME, token, max_age_secs
	)
}

/// The verification check of the gate: present, signed, unexpired, and
/// bound to the caller's address.
pub fn is_verified(app: &AppState, headers: &HeaderMap, client_ip: &str) -> Option<SessionClaims> {
	let token = cookie_value(headers, COOKIE_NAME)?;
	app.session_keys.validate(token, client_ip)
}


// vim: ts=4
