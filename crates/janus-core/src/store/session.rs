//! Server-side session records with a sliding idle expiry.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::prelude::*;

/// Navigation history is capped so long-lived sessions stay bounded.
const NAVIGATION_PATH_CAP: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	pub verified_at: Timestamp,
	pub last_seen: Timestamp,
	pub has_scrolled: bool,
	pub has_natural_mouse_movement: bool,
	pub pages_viewed: u32,
	pub navigation_path: Vec<Box<str>>,
	#[serde(skip)]
	expires_at: Timestamp,
}

impl Session {
	pub fn new(now: Timestamp, first_page: &str) -> Self {
		Self {
			verified_at: now,
			last_seen: now,
			has_scrolled: false,
			has_natural_mouse_movement: false,
			pages_viewed: 1,
			navigation_path: vec![first_page.into()],
			expires_at: Timestamp(0),
		}
	}

	pub fn record_page(&mut self, page: &str) {
		// pages_viewed only ever moves forward
		self.pages_viewed = self.pages_viewed.saturating_add(1);
		if self.navigation_path.len() >= NAVIGATION_PATH_CAP {
			self.navigation_path.remove(0);
		}
		self.navigation_path.push(page.into());
	}

	fn is_expired(&self, now: Timestamp) -> bool {
		now > self.expires_at
	}
}

/// Sessions keyed by their 128-bit token id. Updates run under the write
/// lock, so monotonic fields never go backwards; every touch re-arms the
/// sliding TTL so an active user never expires.
pub struct SessionStore {
	data: RwLock<HashMap<Box<str>, Session>>,
	timeout_secs: i64,
}

impl SessionStore {
	pub fn new(timeout_secs: u64) -> Self {
		Self { data: RwLock::new(HashMap::new()), timeout_secs: timeout_secs as i64 }
	}

	pub fn create(&self, token: &str, mut session: Session) {
		let now = Timestamp::now();
		session.expires_at = now.add_seconds(self.timeout_secs);
		self.data.write().insert(token.into(), session);
	}

	pub fn get(&self, token: &str) -> Option<Session> {
		let now = Timestamp::now();
		let data = self.data.read();
		data.get(token).filter(|session| !session.is_expired(now)).cloned()
	}

	/// Apply a mutation to a live session and re-arm its TTL. Returns false
	/// when no live record exists.
	pub fn update(&self, token: &str, mutate: impl FnOnce(&mut Session)) -> bool {
		let now = Timestamp::now();
		let mut data = self.data.write();
		match data.get_mut(token) {
			Some(session) if !session.is_expired(now) => {
				mutate(session);
				session.last_seen = now;
				session.expires_at = now.add_seconds(self.timeout_secs);
				true
			}
			_ => false,
		}
	}

	pub fn remove(&self, token: &str) {
		self.data.write().remove(token);
	}

	pub fn sweep(&self, now: Timestamp) -> usize {
		let mut data = self.data.write();
		let before = data.len();
		data.retain(|_, session| !session.is_expired(now));
		before - data.len()
	}

	pub fn len(&self) -> usize {
		self.data.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.read().is_empty()
	}
}


// vim: ts=4
