//! Configuration loading, env overrides, and startup validation.
//!
//! All keys are optional in the JSON file; missing fields receive defaults.
//! Environment variables prefixed `JANUS_` override file values. Validation
//! failures are fatal at startup.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::prelude::*;

/// Additive weights for the risk scorer signals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuspicionWeights {
	pub blacklisted_ip: i32,
	pub banned_geo: i32,
	pub tls_mismatch: i32,
	pub ua_ja3_mismatch: i32,
	pub no_user_agent: i32,
	pub headless_browser: i32,
	pub missing_headers: i32,
	pub no_fingerprint: i32,
	pub invalid_fingerprint: i32,
}

impl Default for SuspicionWeights {
	fn default() -> Self {
		Self {
			blacklisted_ip: 100,
			banned_geo: 100,
			tls_mismatch: 25,
			ua_ja3_mismatch: 25,
			no_user_agent: 30,
			headless_browser: 50,
			missing_headers: 15,
			no_fingerprint: 20,
			invalid_fingerprint: 20,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	// Network
	pub listen_addr: String,
	/// Target origin to proxy to
	pub backend: String,
	/// Static assets (sensor.js)
	pub static_dir: String,

	// Challenge API & telemetry endpoints
	pub telemetry_path: String,
	pub verify_path: String,
	pub fingerprint_path: String,
	pub challenge_path: String,
	/// src= value of the injected script tag
	pub inject_script_path: String,

	// Session / nonce
	pub session_timeout_seconds: u64,
	pub nonce_ttl_seconds: u64,
	/// HMAC key for the session token. Must be at least 32 bytes when set;
	/// a random key is generated when unset (sessions then do not survive
	/// a restart).
	pub session_secret: Option<String>,

	// Rate limiting (fixed window, per minute)
	pub rate_limit_rpm: u32,
	pub api_rate_limit_rpm: u32,

	// Challenge difficulty per channel
	pub desktop_iterations: u32,
	pub desktop_difficulty: u32,
	pub mobile_iterations: u32,
	pub mobile_difficulty: u32,

	// Risk scoring
	pub suspicion_threshold: i32,
	pub suspicion_weights: SuspicionWeights,
	pub whitelist_ua: Vec<String>,
	pub whitelist_ips: Vec<String>,
	/// Exact addresses or CIDR ranges
	pub blacklist_ips: Vec<String>,
	/// ISO 3166-1 alpha-2 codes
	pub banned_geo: Vec<String>,
	/// JA3 hashes and shapes of known browser stacks
	pub known_browser_ja3: Vec<String>,

	// Transport timeouts
	pub read_timeout_seconds: u64,
	pub write_timeout_seconds: u64,
	pub idle_timeout_seconds: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			listen_addr: "0.0.0.0:8080".into(),
			backend: "http://localhost:3000".into(),
			static_dir: "static".into(),
			telemetry_path: "/telemetry".into(),
			verify_path: "/verify".into(),
			fingerprint_path: "/fingerprint".into(),
			challenge_path: "/challenge".into(),
			inject_script_path: "/static/sensor.js".into(),
			session_timeout_seconds: 900,
			nonce_ttl_seconds: 30,
			session_secret: None,
			rate_limit_rpm: 60,
			api_rate_limit_rpm: 1000,
			desktop_iterations: 5000,
			desktop_difficulty: 8,
			mobile_iterations: 5000,
			mobile_difficulty: 6,
			suspicion_threshold: 50,
			suspicion_weights: SuspicionWeights::default(),
			whitelist_ua: vec![
				"chrome".into(),
				"firefox".into(),
				"safari".into(),
				"edge".into(),
			],
			whitelist_ips: vec!["127.0.0.1".into(), "::1".into()],
			blacklist_ips: Vec::new(),
			banned_geo: Vec::new(),
			known_browser_ja3: default_known_browser_ja3(),
			read_timeout_seconds: 15,
			write_timeout_seconds: 30,
			idle_timeout_seconds: 120,
		}
	}
}

/// JA3 hashes and raw shapes observed from mainstream browser TLS stacks.
fn default_known_browser_ja3() -> Vec<String> {
	vec![
		"b2fa5d224d65e7c692fd46a0f52fce6b".into(),
		"771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0".into(),
		"771,49195-49199-52393-52392-49196-49200-49161-49162-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27,29-23-24,0".into(),
		"771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-34-13-18-51-45-43-27-17513,29-23-24,0".into(),
		"771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-21,29-23-24-25,0".into(),
	]
}

impl Config {
	/// Load config from an optional JSON file, apply `JANUS_` env overrides,
	/// then validate. A missing path loads pure defaults.
	pub fn load(path: Option<&Path>) -> JnResult<Config> {
		let mut cfg = match path {
			Some(path) => {
				let raw = std::fs::read_to_string(path).map_err(|e| {
					Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
				})?;
				serde_json::from_str(&raw).map_err(|e| {
					Error::ConfigError(format!("cannot parse {}: {}", path.display(), e))
				})?
			}
			None => Config::default(),
		};

		cfg.apply_env_overrides();
		cfg.validate()?;
		Ok(cfg)
	}

	fn apply_env_overrides(&mut self) {
		override_str("JANUS_LISTEN", &mut self.listen_addr);
		override_str("JANUS_BACKEND", &mut self.backend);
		override_str("JANUS_STATIC_DIR", &mut self.static_dir);
		override_str("JANUS_TELEMETRY_PATH", &mut self.telemetry_path);
		override_str("JANUS_VERIFY_PATH", &mut self.verify_path);
		override_str("JANUS_FINGERPRINT_PATH", &mut self.fingerprint_path);
		override_str("JANUS_CHALLENGE_PATH", &mut self.challenge_path);
		override_str("JANUS_INJECT_SCRIPT", &mut self.inject_script_path);
		override_num("JANUS_SESSION_TIMEOUT", &mut self.session_timeout_seconds);
		override_num("JANUS_NONCE_TTL", &mut self.nonce_ttl_seconds);
		override_num("JANUS_RATE_RPM", &mut self.rate_limit_rpm);
		override_num("JANUS_API_RATE_RPM", &mut self.api_rate_limit_rpm);
		override_num("JANUS_SUSPICION_THRESHOLD", &mut self.suspicion_threshold);
		if let Ok(v) = std::env::var("JANUS_SESSION_SECRET") {
			if !v.is_empty() {
				self.session_secret = Some(v);
			}
		}
	}

	pub fn validate(&self) -> JnResult<()> {
		if self.listen_addr.is_empty() {
			return Err(Error::ValidationError("listen_addr must be set".into()));
		}
		if self.backend.is_empty() {
			return Err(Error::ValidationError("backend must be set".into()));
		}
		if self.nonce_ttl_seconds < 1 || self.nonce_ttl_seconds > 600 {
			return Err(Error::ValidationError(
				"nonce_ttl_seconds must be between 1 and 600".into(),
			));
		}
		if self.session_timeout_seconds < 60 {
			return Err(Error::ValidationError(
				"session_timeout_seconds must be >= 60".into(),
			));
		}
		if let Some(secret) = &self.session_secret {
			if secret.len() < 32 {
				return Err(Error::ValidationError(
					"session_secret must be at least 32 bytes".into(),
				));
			}
		}
		Ok(())
	}

	// Duration helpers used by other modules
	pub fn session_timeout(&self) -> Duration {
		Duration::from_secs(self.session_timeout_seconds)
	}

	pub fn nonce_ttl(&self) -> Duration {
		Duration::from_secs(self.nonce_ttl_seconds)
	}
}

fn override_str(key: &str, target: &mut String) {
	if let Ok(v) = std::env::var(key) {
		if !v.is_empty() {
			*target = v;
		}
	}
}

fn override_num<T: std::str::FromStr>(key: &str, target: &mut T) {
	if let Ok(v) = std::env::var(key) {
		if let Ok(n) = v.parse() {
			*target = n;
		}
	}
}


// vim: ts=4
