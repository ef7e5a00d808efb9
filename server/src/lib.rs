//! Janus is a reverse-proxy bot gate. Unverified clients are diverted
//! through a challenge flow (passive risk scoring, adaptive hash-work proof,
//! behavioural telemetry); verified clients carry an HMAC-bound cookie and
//! flow through to the protected origin.

#![forbid(unsafe_code)]

pub mod challenge;
pub mod gate;
pub mod prelude;
pub mod proxy;
pub mod routes;
pub mod sweeper;
pub mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use rand::RngCore;
use tokio::sync::watch;

use crate::gate::geo::GeoLookup;
use crate::gate::risk::RiskScorer;
use crate::gate::token::SessionKeys;
use crate::prelude::*;
use janus_core::store::{ChallengeStore, FingerprintStore, NonceStore, SessionStore};
use janus_core::{Config, RateLimiter};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub config: Config,
	pub fingerprints: FingerprintStore,
	pub challenges: ChallengeStore,
	pub sessions: SessionStore,
	pub nonces: NonceStore,
	pub rate_limiter: RateLimiter,
	pub scorer: RiskScorer,
	pub session_keys: SessionKeys,
	pub upstream: proxy::Upstream,
}

pub type App = Arc<AppState>;

pub struct AppBuilder {
	config: Config,
	geo: Option<Arc<dyn GeoLookup>>,
}

impl AppBuilder {
	pub fn new(config: Config) -> Self {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder { config, geo: None }
	}

	/// Plug in a GeoIP lookup. Absence is non-fatal: the geo signal simply
	/// contributes nothing to the risk score.
	pub fn geo_lookup(&mut self, geo: Arc<dyn GeoLookup>) -> &mut Self {
		self.geo = Some(geo);
		self
	}

	/// Construct the shared application state without serving.
	pub fn build(self) -> JnResult<App> {
		self.config.validate()?;
		let secret = session_secret(&self.config);
		let scorer = RiskScorer::new(&self.config, self.geo)?;
		let upstream = proxy::Upstream::new(&self.config.backend)?;

		Ok(Arc::new(AppState {
			fingerprints: FingerprintStore::new(),
			challenges: ChallengeStore::new(),
			sessions: SessionStore::new(self.config.session_timeout_seconds),
			nonces: NonceStore::new(self.config.nonce_ttl_seconds),
			rate_limiter: RateLimiter::new(
				self.config.rate_limit_rpm,
				self.config.api_rate_limit_rpm,
			),
			scorer,
			session_keys: SessionKeys::new(&secret),
			upstream,
			config: self.config,
		}))
	}

	pub async fn run(self) -> JnResult<()> {
		let app = self.build()?;
		let router = routes::init(app.clone());

		let listener =
			tokio::net::TcpListener::bind(app.config.listen_addr.as_str()).await.map_err(|e| {
				error!("FATAL: cannot bind {}: {}", app.config.listen_addr, e);
				Error::ConfigError(format!("cannot bind {}: {}", app.config.listen_addr, e))
			})?;

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let sweeper = sweeper::spawn(app.clone(), shutdown_rx);

		info!(
			"Janus v{} listening on {}, proxying to {}",
			VERSION, app.config.listen_addr, app.config.backend
		);

		axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
			.with_graceful_shutdown(shutdown_signal())
			.await?;

		// Drain order: stop taking requests, then cancel the sweeper
		let _ = shutdown_tx.send(true);
		let _ = sweeper.await;
		info!("Shut down cleanly");
		Ok(())
	}
}

fn session_secret(config: &Config) -> Vec<u8> {
	match &config.session_secret {
		Some(secret) => secret.as_bytes().to_vec(),
		None => {
			warn!("No session secret configured; sessions will not survive a restart");
			let mut secret = vec![0u8; 32];
			rand::thread_rng().fill_bytes(&mut secret);
			secret
		}
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = tokio::signal::ctrl_c().await;
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => error!("Cannot install SIGTERM handler: {}", e),
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("Received interrupt, draining..."),
		() = terminate => info!("Received termination signal, draining..."),
	}
}

// vim: ts=4
