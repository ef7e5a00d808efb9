//! Device fingerprint records posted by the sensor script.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// One sampled pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MousePoint {
	pub x: i64,
	pub y: i64,
	pub t: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScreenSize {
	pub width: u32,
	pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerometerReading {
	pub x: Option<f64>,
	pub y: Option<f64>,
	pub z: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelerometerData {
	pub reading1: Option<AccelerometerReading>,
	pub reading2: Option<AccelerometerReading>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryData {
	pub charging: bool,
	pub level: f64,
}

/// Device fingerprint as posted by the sensor script. The `client_ip` field
/// is always the resolver-derived address, never a client-supplied value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fingerprint {
	#[serde(skip_deserializing)]
	pub client_ip: Box<str>,
	pub user_agent: Box<str>,
	pub canvas_hash: Box<str>,
	pub webgl_vendor: Box<str>,
	pub webgl_renderer: Box<str>,
	pub screen: ScreenSize,
	pub timezone: Box<str>,
	pub platform: Box<str>,
	pub plugins: Vec<Box<str>>,
	pub webdriver: bool,
	pub chrome_exists: bool,
	pub js_enabled: bool,
	pub is_mobile: bool,
	pub accelerometer: Option<AccelerometerData>,
	pub battery: Option<BatteryData>,
	pub mouse_signature: Vec<MousePoint>,

	/// Successful verifications observed for this address, maintained
	/// server-side for the invisible-challenge rule.
	#[serde(skip)]
	pub verified_count: u32,
	#[serde(skip)]
	pub stored_at: Timestamp,
}

/// Fingerprints keyed by client address, LRU-bounded. An entry is evicted
/// with its owning session or under capacity pressure.
pub struct FingerprintStore {
	data: RwLock<LruCache<Box<str>, Fingerprint>>,
}

impl FingerprintStore {
	pub fn new() -> Self {
		// SAFETY: This is a non-zero constant
		const TEN_THOUSAND: NonZeroUsize = match NonZeroUsize::new(10_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		Self { data: RwLock::new(LruCache::new(TEN_THOUSAND)) }
	}

	pub fn put(&self, client_ip: &str, mut fingerprint: Fingerprint) {
		fingerprint.client_ip = client_ip.into();
		fingerprint.stored_at = Timestamp::now();
		let mut data = self.data.write();
		// A re-posted fingerprint keeps its verification history
		if let Some(existing) = data.peek(client_ip) {
			fingerprint.verified_count = existing.verified_count;
		}
		data.put(client_ip.into(), fingerprint);
	}

	pub fn get(&self, client_ip: &str) -> Option<Fingerprint> {
		self.data.read().peek(client_ip).cloned()
	}

	pub fn contains(&self, client_ip: &str) -> bool {
		self.data.read().contains(client_ip)
	}

	/// Bump the successful-verification counter for an address.
	pub fn record_verification(&self, client_ip: &str) {
		let mut data = self.data.write();
		if let Some(fingerprint) = data.get_mut(client_ip) {
			fingerprint.verified_count = fingerprint.verified_count.saturating_add(1);
		}
	}

	pub fn remove(&self, client_ip: &str) {
		self.data.write().pop(client_ip);
	}

	pub fn len(&self) -> usize {
		self.data.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.read().is_empty()
	}
}

impl Default for FingerprintStore {
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
