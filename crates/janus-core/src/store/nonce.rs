//! Single-use injection nonces.
//!
//! A nonce is minted when the sensor script tag is injected into an HTML
//! response (or a bootstrap page), stored against the requester's address
//! with a short TTL, and consumed at most once by an atomic get-and-delete.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::RwLock;
use rand::RngCore;

use crate::prelude::*;

pub struct NonceStore {
	data: RwLock<HashMap<Box<str>, (Box<str>, Timestamp)>>,
	ttl_secs: i64,
}

impl NonceStore {
	pub fn new(ttl_secs: u64) -> Self {
		Self { data: RwLock::new(HashMap::new()), ttl_secs: ttl_secs as i64 }
	}

	/// Mint a fresh 128-bit nonce for an address, replacing any live one.
	pub fn mint(&self, client_ip: &str, now: Timestamp) -> String {
		let mut bytes = [0u8; 16];
		rand::thread_rng().fill_bytes(&mut bytes);
		let nonce = URL_SAFE_NO_PAD.encode(bytes);
		self.data
			.write()
			.insert(client_ip.into(), (nonce.as_str().into(), now.add_seconds(self.ttl_secs)));
		nonce
	}

	/// Atomic get-and-delete of the live nonce for an address. Expired and
	/// absent are indistinguishable to callers.
	pub fn consume(&self, client_ip: &str, now: Timestamp) -> Option<Box<str>> {
		let (nonce, expires_at) = self.data.write().remove(client_ip)?;
		if now > expires_at {
			return None;
		}
		Some(nonce)
	}

	pub fn sweep(&self, now: Timestamp) -> usize {
		let mut data = self.data.write();
		let before = data.len();
		data.retain(|_, (_, expires_at)| now <= *expires_at);
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
