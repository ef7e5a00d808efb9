use std::time::Duration;

use axum::{
	routing::{get, post},
	Router,
};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::challenge::handler;
use crate::prelude::*;
use crate::{gate, telemetry};

/// Assemble the router: static sensor assets, the challenge API under its
/// configured paths, the telemetry channel, and the gate as the catch-all.
pub fn init(app: App) -> Router {
	let cfg = &app.config;
	Router::new()
		.route(&cfg.fingerprint_path, post(handler::post_fingerprint))
		.route(&cfg.challenge_path, get(handler::get_challenge))
		.route(&cfg.verify_path, post(handler::post_verify))
		.route(&cfg.telemetry_path, post(telemetry::post_telemetry))
		.nest_service("/static", ServeDir::new(&cfg.static_dir))
		.fallback(gate::handle)
		.layer(TimeoutLayer::new(Duration::from_secs(cfg.write_timeout_seconds)))
		.with_state(app.clone())
}

// vim: ts=4
