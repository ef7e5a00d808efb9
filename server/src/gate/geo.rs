//! Pluggable GeoIP lookup.
//!
//! The reader is opened once at startup and read concurrently thereafter.
//! When no database is available the gate runs without the geo signal.

use std::net::IpAddr;

pub trait GeoLookup: Send + Sync {
	/// ISO 3166-1 alpha-2 country code for the address, if known.
	fn country(&self, addr: IpAddr) -> Option<String>;
}

/// Fixed-table lookup, useful for tests and small deployments.
pub struct StaticGeoLookup {
	entries: Vec<(IpAddr, String)>,
}

impl StaticGeoLookup {
	pub fn new(entries: Vec<(IpAddr, String)>) -> Self {
		Self { entries }
	}
}

impl GeoLookup for StaticGeoLookup {
	fn country(&self, addr: IpAddr) -> Option<String> {
		self.entries.iter().find(|(ip, _)| *ip == addr).map(|(_, code)| code.clone())
	}
}


// vim: ts=4
