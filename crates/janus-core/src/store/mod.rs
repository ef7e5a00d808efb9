//! In-memory stores for fingerprints, challenges, sessions, and injection
//! nonces.
//!
//! The stores exclusively own all persistent records; request handlers hold
//! only short-lived clones. Each store wraps its map in a readers/writer
//! lock so concurrent readers proceed while writers are exclusive. A shared
//! key-value backend could replace these behind the same interfaces.

pub mod challenge;
pub mod fingerprint;
pub mod nonce;
pub mod session;

pub use challenge::{Challenge, ChallengeKind, ChallengeStore};
pub use fingerprint::{
	AccelerometerData, AccelerometerReading, BatteryData, Fingerprint, FingerprintStore,
	MousePoint, ScreenSize,
};
pub use nonce::NonceStore;
pub use session::{Session, SessionStore};

// vim: ts=4
