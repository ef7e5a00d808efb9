//! Fixed-window request rate limiting.
//!
//! Buckets are keyed by client address, or by API key for privileged
//! callers. A bucket's window starts at its first request; the increment
//! that creates a bucket also arms its one-minute expiry, and a lapsed
//! bucket is replaced wholesale on the next request. Capacity is bounded
//! by an LRU so hostile address churn cannot grow memory without bound.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::prelude::*;

const WINDOW_SECS: i64 = 60;

/// Per-identifier fixed-window counter.
#[derive(Debug, Clone)]
struct RateBucket {
	count: u32,
	window_end: Timestamp,
}

pub struct RateLimiter {
	buckets: Mutex<LruCache<Box<str>, RateBucket>>,
	limit: u32,
	api_limit: u32,
}

impl RateLimiter {
	pub fn new(limit: u32, api_limit: u32) -> Self {
		// SAFETY: This is a non-zero constant
		const FIFTY_THOUSAND: NonZeroUsize = match NonZeroUsize::new(50_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		Self { buckets: Mutex::new(LruCache::new(FIFTY_THOUSAND)), limit, api_limit }
	}

	/// Check the per-IP limit for an identifier. The check fails closed:
	/// any failure to account for a request is reported as limited.
	pub fn check(&self, identifier: &str) -> JnResult<()> {
		self.check_at(identifier, self.limit, Timestamp::now())
	}

	/// Check the privileged per-API-key limit.
	pub fn check_api(&self, api_key: &str) -> JnResult<()> {
		self.check_at(api_key, self.api_limit, Timestamp::now())
	}

	fn check_at(&self, identifier: &str, limit: u32, now: Timestamp) -> JnResult<()> {
		let mut buckets = self.buckets.lock();
		// Increment and TTL-arm happen under one lock acquisition
		let count = match buckets.get_mut(identifier) {
			Some(bucket) if now < bucket.window_end => {
				bucket.count = bucket.count.saturating_add(1);
				bucket.count
			}
			_ => {
				buckets.put(
					identifier.into(),
					RateBucket { count: 1, window_end: now.add_seconds(WINDOW_SECS) },
				);
				1
			}
		};
		if count > limit {
			warn!("Rate limit exceeded for {}", identifier);
			return Err(Error::TooManyRequests);
		}
		Ok(())
	}

	/// Number of live buckets, for diagnostics.
	pub fn tracked(&self) -> usize {
		self.buckets.lock().len()
	}
}


// vim: ts=4
