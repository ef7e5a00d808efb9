//! Background expiry sweeper.
//!
//! Wakes once per minute and deletes expired challenge, session, and nonce
//! records. Races the shutdown signal so an orderly exit never waits for
//! the next tick.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::prelude::*;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn(app: App, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			tokio::select! {
				_ = ticker.tick() => {
					let now = Timestamp::now();
					let challenges = app.challenges.sweep(now);
					let sessions = app.sessions.sweep(now);
					let nonces = app.nonces.sweep(now);
					if challenges + sessions + nonces > 0 {
						debug!(
							"Swept {} challenges, {} sessions, {} nonces",
							challenges, sessions, nonces
						);
					}
				}
				_ = shutdown.changed() => {
					debug!("Sweeper stopped");
					break;
				}
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AppBuilder;
	use janus_core::store::{Challenge, ChallengeKind};
	use janus_core::Config;

	#[tokio::test]
	async fn test_sweeper_stops_on_shutdown() {
		let app = AppBuilder::new(Config::default()).build().unwrap();
		let (tx, rx) = watch::channel(false);
		let handle = spawn(app, rx);
		tx.send(true).unwrap();
		tokio::time::timeout(Duration::from_secs(1), handle)
			.await
			.expect("sweeper should stop promptly")
			.unwrap();
	}

	#[tokio::test]
	async fn test_sweeper_first_tick_clears_expired() {
		let app = AppBuilder::new(Config::default()).build().unwrap();
		app.challenges.insert(
			"1.2.3.4",
			Challenge {
				nonce: "n".into(),
				seed: "s".into(),
				iterations: 1,
				kind: ChallengeKind::Pow,
				difficulty: 0,
				expires_at: Timestamp(1),
			},
		);
		let (tx, rx) = watch::channel(false);
		let handle = spawn(app.clone(), rx);
		// the interval fires immediately on start
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert!(app.challenges.is_empty());
		tx.send(true).unwrap();
		let _ = handle.await;
	}
}

// vim: ts=4
