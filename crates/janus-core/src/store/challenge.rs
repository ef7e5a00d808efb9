//! One-shot proof-of-work challenge records.
//!
//! A record lives under `(client_ip, nonce)` from issuance until it is
//! taken for verification or swept at expiry. `take` removes the record
//! before any proof checking happens, so every outcome of a verification
//! attempt (verified, rejected, expired) is terminal.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::prelude::*;

/// Challenge flavor issued to the client. Only `Pow` has a verification
/// path; the other two are generated for high-risk callers but cannot mint
/// a session until their checks exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
	Pow,
	Image,
	Logic,
}

impl ChallengeKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ChallengeKind::Pow => "pow",
			ChallengeKind::Image => "image",
			ChallengeKind::Logic => "logic",
		}
	}
}

#[derive(Debug, Clone)]
pub struct Challenge {
	pub nonce: Box<str>,
	pub seed: Box<str>,
	pub iterations: u32,
	pub kind: ChallengeKind,
	/// Required leading zero bits of the proof hash
	pub difficulty: u32,
	pub expires_at: Timestamp,
}

impl Challenge {
	pub fn is_expired(&self, now: Timestamp) -> bool {
		now > self.expires_at
	}
}

pub struct ChallengeStore {
	data: RwLock<HashMap<(Box<str>, Box<str>), Challenge>>,
}

impl ChallengeStore {
	pub fn new() -> Self {
		Self { data: RwLock::new(HashMap::new()) }
	}

	pub fn insert(&self, client_ip: &str, challenge: Challenge) {
		let key = (client_ip.into(), challenge.nonce.clone());
		self.data.write().insert(key, challenge);
	}

	/// Atomically remove and return the live record for `(client_ip, nonce)`.
	/// An expired record is removed but not returned, so it can never
	/// satisfy verification, and a second take observes absence.
	pub fn take(&self, client_ip: &str, nonce: &str, now: Timestamp) -> Option<Challenge> {
		let key = (Box::from(client_ip), Box::from(nonce));
		let challenge = self.data.write().remove(&key)?;
		if challenge.is_expired(now) {
			debug!("Challenge for {} expired before verification", client_ip);
			return None;
		}
		Some(challenge)
	}

	/// Delete every record whose expiry has passed. Returns the number of
	/// records removed.
	pub fn sweep(&self, now: Timestamp) -> usize {
		let mut data = self.data.write();
		let before = data.len();
		data.retain(|_, challenge| !challenge.is_expired(now));
		before - data.len()
	}

	pub fn len(&self) -> usize {
		self.data.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.read().is_empty()
	}
}

impl Default for ChallengeStore {
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
