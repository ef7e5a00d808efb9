//! Deterministic additive risk scoring over transport, header, and device
//! fingerprint signals.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use ipnet::IpNet;

use super::geo::GeoLookup;
use crate::prelude::*;
use janus_core::config::{Config, SuspicionWeights};
use janus_core::store::Fingerprint;

/// Paths probed by well-known machinery are excused from header checks.
const PROBE_PATH_MARKER: &str = ".well-known";

/// Per-request signal inputs, borrowed from the request.
#[derive(Debug, Clone)]
pub struct RiskInput<'a> {
	pub client_ip: &'a str,
	pub user_agent: &'a str,
	pub path: &'a str,
	pub ja3: &'a str,
	pub accept: &'a str,
	pub has_accept_language: bool,
	pub has_accept_encoding: bool,
}

impl<'a> RiskInput<'a> {
	pub fn from_request(headers: &'a HeaderMap, path: &'a str, ja3: &'a str, client_ip: &'a str) -> Self {
		Self {
			client_ip,
			user_agent: headers
				.get(header::USER_AGENT)
				.and_then(|v| v.to_str().ok())
				.unwrap_or(""),
			path,
			ja3,
			accept: headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or(""),
			has_accept_language: headers.contains_key(header::ACCEPT_LANGUAGE),
			has_accept_encoding: headers.contains_key(header::ACCEPT_ENCODING),
		}
	}
}

pub struct RiskScorer {
	weights: SuspicionWeights,
	threshold: i32,
	whitelist_ua: Vec<String>,
	whitelist_ips: Vec<String>,
	blacklist_exact: Vec<String>,
	blacklist_nets: Vec<IpNet>,
	banned_geo: Vec<String>,
	known_ja3: HashSet<String>,
	geo: Option<Arc<dyn GeoLookup>>,
}

impl RiskScorer {
	pub fn new(config: &Config, geo: Option<Arc<dyn GeoLookup>>) -> JnResult<Self> {
		let mut blacklist_exact = Vec::new();
		let mut blacklist_nets = Vec::new();
		for entry in &config.blacklist_ips {
			if entry.contains('/') {
				let net: IpNet = entry.parse().map_err(|_| {
					Error::ValidationError(format!("invalid blacklist CIDR: {}", entry))
				})?;
				blacklist_nets.push(net);
			} else {
				blacklist_exact.push(entry.clone());
			}
		}

		Ok(Self {
			weights: config.suspicion_weights.clone(),
			threshold: config.suspicion_threshold,
			whitelist_ua: config.whitelist_ua.iter().map(|ua| ua.to_lowercase()).collect(),
			whitelist_ips: config.whitelist_ips.clone(),
			blacklist_exact,
			blacklist_nets,
			banned_geo: config.banned_geo.clone(),
			known_ja3: config.known_browser_ja3.iter().cloned().collect(),
			geo,
		})
	}

	/// Score a request. Returns `(suspicious, score)` with
	/// `suspicious = score >= threshold`.
	pub fn score(&self, input: &RiskInput, fingerprint: Option<&Fingerprint>) -> (bool, i32) {
		let ua_lower = input.user_agent.to_lowercase();

		// Whitelisted UA from a whitelisted address bypasses all checks
		let ua_whitelisted = self.whitelist_ua.iter().any(|allowed| ua_lower.contains(allowed));
		let ip_whitelisted = self.whitelist_ips.iter().any(|ip| ip == input.client_ip);
		if ua_whitelisted && ip_whitelisted {
			return (false, 0);
		}

		// Blacklisted address, exact or CIDR
		if self.is_blacklisted(input.client_ip) {
			debug!("Blacklisted address {}", input.client_ip);
			return (true, self.weights.blacklisted_ip);
		}

		// Banned origin country; absence of the GeoIP reader skips the signal
		if let Some(code) = self.country_of(input.client_ip) {
			if self.banned_geo.iter().any(|banned| *banned == code) {
				debug!("Banned geo {} for {}", code, input.client_ip);
				return (true, self.weights.banned_geo);
			}
		}

		let mut score = 0;

		// TLS stack not recognized as a mainstream browser
		if !input.ja3.is_empty() && !self.known_ja3.contains(input.ja3) {
			score += self.weights.tls_mismatch;
		}

		// UA claims a browser whose canonical JA3 shape disagrees
		if !input.ja3.is_empty()
			&& input.ja3 != janus_core::extract::NO_TLS
			&& ua_lower.contains("firefox")
			&& !input.ja3.contains("49195")
		{
			score += self.weights.ua_ja3_mismatch;
		}

		// Empty or obvious tool UA
		if input.user_agent.is_empty() || ua_lower.contains("curl") || ua_lower.contains("python") {
			score += self.weights.no_user_agent;
		}

		if ua_lower.contains("headless") {
			score += self.weights.headless_browser;
		}

		// Common request headers, except on well-known probe paths
		let probe_path = input.path.contains(PROBE_PATH_MARKER);
		if input.accept.is_empty() && !probe_path {
			score += self.weights.missing_headers;
		}
		let common_headers_present =
			!input.user_agent.is_empty() && input.has_accept_language && input.has_accept_encoding;
		if !common_headers_present && !probe_path {
			score += self.weights.missing_headers;
		}

		// Device fingerprint signals
		match fingerprint {
			None => score += self.weights.no_fingerprint,
			Some(fp) => {
				if fp.webdriver {
					score += self.weights.headless_browser;
				}
				if !fp.chrome_exists && ua_lower.contains("chrome") {
					score += self.weights.headless_browser;
				}
				if fp.canvas_hash.is_empty() || &*fp.canvas_hash == "error" {
					score += self.weights.invalid_fingerprint;
				}
				if matches!(&*fp.webgl_renderer, "no-webgl" | "error") {
					score += self.weights.invalid_fingerprint;
				}
			}
		}

		(score >= self.threshold, score)
	}

	fn is_blacklisted(&self, client_ip: &str) -> bool {
		if self.blacklist_exact.iter().any(|ip| ip == client_ip) {
			return true;
		}
		if self.blacklist_nets.is_empty() {
			return false;
		}
		match client_ip.parse::<IpAddr>() {
			Ok(addr) => self.blacklist_nets.iter().any(|net| net.contains(&addr)),
			Err(_) => false,
		}
	}

	fn country_of(&self, client_ip: &str) -> Option<String> {
		let geo = self.geo.as_ref()?;
		let addr: IpAddr = client_ip.parse().ok()?;
		geo.country(addr)
	}
}


// vim: ts=4
