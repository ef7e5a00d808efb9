//! Challenge generation and proof verification.
//!
//! Challenges bind a hash-work proof to the caller's address, the issued
//! nonce and seed, and (on desktop) the canvas fingerprint, making the work
//! a proof of render rather than bare proof of work.

pub mod handler;
pub mod mobile;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::prelude::*;
use janus_core::store::{Challenge, ChallengeKind};
use janus_core::Config;

/// Issued challenges expire after five minutes.
const CHALLENGE_TTL_SECS: i64 = 300;
/// Proof timestamps may be at most this old.
const PROOF_MAX_AGE: i64 = 300;
/// Clock skew allowance for proof timestamps.
const PROOF_MAX_SKEW: i64 = 60;

/// Everything a proof is checked against.
#[derive(Debug, Clone)]
pub struct ProofContext<'a> {
	pub nonce: &'a str,
	pub client_ip: &'a str,
	pub seed: &'a str,
	pub is_mobile: bool,
	pub canvas_hash: &'a str,
	pub max_iterations: u32,
	pub difficulty: u32,
}

/// Mint a challenge with adaptive difficulty and type.
///
/// `risk_score` comes from the gate's scorer; `history` is the number of
/// successful verifications already observed for the address.
pub fn generate(config: &Config, is_mobile: bool, risk_score: i32, history: u32) -> Challenge {
	let (iterations, base_difficulty) = if is_mobile {
		(config.mobile_iterations, config.mobile_difficulty)
	} else {
		(config.desktop_iterations, config.desktop_difficulty)
	};

	// Trusted repeat visitors get an invisible challenge, hostile callers
	// get extra work
	let difficulty = if risk_score < 20 && history > 2 {
		0
	} else if risk_score > 80 {
		base_difficulty + 2
	} else {
		base_difficulty
	};

	let kind = if risk_score > 60 {
		if risk_score % 2 == 0 {
			ChallengeKind::Image
		} else {
			ChallengeKind::Logic
		}
	} else {
		ChallengeKind::Pow
	};

	Challenge {
		nonce: random_b64(16).into(),
		seed: random_b64(8).into(),
		iterations,
		kind,
		difficulty,
		expires_at: Timestamp::from_now(CHALLENGE_TTL_SECS),
	}
}

fn random_b64(len: usize) -> String {
	let mut bytes = vec![0u8; len];
	rand::thread_rng().fill_bytes(&mut bytes);
	STANDARD.encode(bytes)
}

/// Dispatch verification for a challenge kind. Only `pow` proofs can
/// succeed; `image` and `logic` are generated but have no verification
/// path yet, so they never mint a session.
pub fn verify(kind: ChallengeKind, proof: &str, ctx: &ProofContext) -> bool {
	match kind {
		ChallengeKind::Pow => verify_proof(proof, ctx),
		ChallengeKind::Image | ChallengeKind::Logic => {
			warn!("Rejecting unverifiable {} challenge", kind.as_str());
			false
		}
	}
}

/// Validate a hash-work proof against its expected components.
///
/// Proof format: `nonce|iter|timestamp|clientIP|seed` for mobile, with a
/// trailing `|canvasHash` on desktop.
pub fn verify_proof(proof: &str, ctx: &ProofContext) -> bool {
	verify_proof_at(proof, ctx, Utc::now())
}

fn verify_proof_at(proof: &str, ctx: &ProofContext, now: DateTime<Utc>) -> bool {
	let parts: Vec<&str> = proof.split('|').collect();
	let expected_parts = if ctx.is_mobile { 5 } else { 6 };
	if parts.len() != expected_parts {
		debug!("Proof has {} parts, expected {}", parts.len(), expected_parts);
		return false;
	}
	if !ctx.is_mobile && parts[5] != ctx.canvas_hash {
		debug!("Proof canvas hash mismatch");
		return false;
	}

	let (nonce, iteration, timestamp, client_ip, seed) =
		(parts[0], parts[1], parts[2], parts[3], parts[4]);
	if nonce != ctx.nonce || client_ip != ctx.client_ip || seed != ctx.seed {
		debug!("Proof component mismatch");
		return false;
	}

	match iteration.parse::<u32>() {
		Ok(iter) if iter <= ctx.max_iterations => {}
		_ => {
			debug!("Proof iteration invalid: {}", iteration);
			return false;
		}
	}

	let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) else {
		debug!("Proof timestamp unparseable: {}", timestamp);
		return false;
	};
	let age = now.signed_duration_since(ts.with_timezone(&Utc));
	if age > Duration::seconds(PROOF_MAX_AGE) || age < Duration::seconds(-PROOF_MAX_SKEW) {
		debug!("Proof timestamp out of window: {}", timestamp);
		return false;
	}

	let hash = Sha256::digest(proof.as_bytes());
	if !has_leading_zero_bits(&hash, ctx.difficulty) {
		debug!("Proof hash lacks {} leading zero bits", ctx.difficulty);
		return false;
	}

	true
}

/// True when `hash` starts with at least `zero_bits` zero bits:
/// `zero_bits / 8` whole zero bytes plus the top `zero_bits % 8` bits of
/// the next byte.
pub fn has_leading_zero_bits(hash: &[u8], zero_bits: u32) -> bool {
	let full_bytes = (zero_bits / 8) as usize;
	let extra_bits = zero_bits % 8;
	if hash.len() < full_bytes + usize::from(extra_bits > 0) {
		return false;
	}
	if hash[..full_bytes].iter().any(|b| *b != 0) {
		return false;
	}
	if extra_bits > 0 {
		let mask = 0xFFu8 << (8 - extra_bits);
		return hash[full_bytes] & mask == 0;
	}
	true
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx<'a>(is_mobile: bool, difficulty: u32) -> ProofContext<'a> {
		ProofContext {
			nonce: "Tk9OQ0U=",
			client_ip: "1.2.3.4",
			seed: "U0VFRA==",
			is_mobile,
			canvas_hash: "abc",
			max_iterations: 5000,
			difficulty,
		}
	}

	fn proof_for(ctx: &ProofContext, iter: u32, ts: &str) -> String {
		if ctx.is_mobile {
			format!("{}|{}|{}|{}|{}", ctx.nonce, iter, ts, ctx.client_ip, ctx.seed)
		} else {
			format!(
				"{}|{}|{}|{}|{}|{}",
				ctx.nonce, iter, ts, ctx.client_ip, ctx.seed, ctx.canvas_hash
			)
		}
	}

	/// Search the iteration counter for a proof whose hash clears the bits.
	fn mine(ctx: &ProofContext, ts: &str) -> String {
		for iter in 0..=ctx.max_iterations {
			let proof = proof_for(ctx, iter, ts);
			let hash = Sha256::digest(proof.as_bytes());
			if has_leading_zero_bits(&hash, ctx.difficulty) {
				return proof;
			}
		}
		panic!("no proof found within max iterations");
	}

	fn now_rfc3339() -> String {
		Utc::now().to_rfc3339()
	}

	#[test]
	fn test_valid_desktop_proof() {
		let ctx = ctx(false, 4);
		let proof = mine(&ctx, &now_rfc3339());
		assert!(verify_proof(&proof, &ctx));
	}

	#[test]
	fn test_valid_mobile_proof() {
		let ctx = ctx(true, 4);
		let proof = mine(&ctx, &now_rfc3339());
		assert!(verify_proof(&proof, &ctx));
	}

	#[test]
	fn test_part_count_boundaries() {
		let ts = now_rfc3339();
		let desktop = ctx(false, 0);
		let mobile = ctx(true, 0);

		let four = format!("a|b|{}|d", ts);
		let five = proof_for(&mobile, 1, &ts);
		let six = proof_for(&desktop, 1, &ts);
		let seven = format!("{}|extra", six);

		assert!(!verify_proof(&four, &desktop));
		assert!(!verify_proof(&four, &mobile));
		assert!(!verify_proof(&five, &desktop));
		assert!(verify_proof(&five, &mobile));
		assert!(verify_proof(&six, &desktop));
		assert!(!verify_proof(&six, &mobile));
		assert!(!verify_proof(&seven, &desktop));
		assert!(!verify_proof(&seven, &mobile));
	}

	#[test]
	fn test_component_binding() {
		let ctx = ctx(false, 0);
		let ts = now_rfc3339();

		let wrong_nonce = format!("XXX|1|{}|1.2.3.4|U0VFRA==|abc", ts);
		assert!(!verify_proof(&wrong_nonce, &ctx));

		let wrong_ip = format!("Tk9OQ0U=|1|{}|5.6.7.8|U0VFRA==|abc", ts);
		assert!(!verify_proof(&wrong_ip, &ctx));

		let wrong_seed = format!("Tk9OQ0U=|1|{}|1.2.3.4|WRONG|abc", ts);
		assert!(!verify_proof(&wrong_seed, &ctx));

		let wrong_canvas = format!("Tk9OQ0U=|1|{}|1.2.3.4|U0VFRA==|zzz", ts);
		assert!(!verify_proof(&wrong_canvas, &ctx));
	}

	#[test]
	fn test_iteration_bounds() {
		let ctx = ctx(false, 0);
		let ts = now_rfc3339();
		assert!(verify_proof(&proof_for(&ctx, 0, &ts), &ctx));
		assert!(verify_proof(&proof_for(&ctx, 5000, &ts), &ctx));
		assert!(!verify_proof(&proof_for(&ctx, 5001, &ts), &ctx));

		let negative = format!("Tk9OQ0U=|-1|{}|1.2.3.4|U0VFRA==|abc", ts);
		assert!(!verify_proof(&negative, &ctx));
		let non_numeric = format!("Tk9OQ0U=|abc|{}|1.2.3.4|U0VFRA==|abc", ts);
		assert!(!verify_proof(&non_numeric, &ctx));
	}

	#[test]
	fn test_timestamp_window_boundaries() {
		let ctx = ctx(false, 0);
		let now = Utc::now();

		// exactly five minutes old is still acceptable
		let at_age_limit = (now - Duration::seconds(PROOF_MAX_AGE)).to_rfc3339();
		assert!(verify_proof_at(&proof_for(&ctx, 1, &at_age_limit), &ctx, now));
		let too_old = (now - Duration::seconds(PROOF_MAX_AGE + 1)).to_rfc3339();
		assert!(!verify_proof_at(&proof_for(&ctx, 1, &too_old), &ctx, now));

		// exactly one minute in the future accommodates skew
		let at_skew_limit = (now + Duration::seconds(PROOF_MAX_SKEW)).to_rfc3339();
		assert!(verify_proof_at(&proof_for(&ctx, 1, &at_skew_limit), &ctx, now));
		let too_future = (now + Duration::seconds(PROOF_MAX_SKEW + 1)).to_rfc3339();
		assert!(!verify_proof_at(&proof_for(&ctx, 1, &too_future), &ctx, now));

		let garbage = proof_for(&ctx, 1, "yesterday at noon");
		assert!(!verify_proof_at(&garbage, &ctx, now));
	}

	#[test]
	fn test_leading_zero_bits_byte_and_partial_paths() {
		let h = |bytes: &[u8]| bytes.to_vec();

		// difficulty 0 always passes
		assert!(has_leading_zero_bits(&h(&[0xFF; 32]), 0));
		// 1 bit: top bit of first byte
		assert!(has_leading_zero_bits(&h(&[0x7F, 0xFF]), 1));
		assert!(!has_leading_zero_bits(&h(&[0x80, 0x00]), 1));
		// 7 bits
		assert!(has_leading_zero_bits(&h(&[0x01, 0xFF]), 7));
		assert!(!has_leading_zero_bits(&h(&[0x02, 0x00]), 7));
		// 8 bits: exactly one zero byte
		assert!(has_leading_zero_bits(&h(&[0x00, 0xFF]), 8));
		assert!(!has_leading_zero_bits(&h(&[0x01, 0x00]), 8));
		// 9 bits: zero byte plus top bit of next
		assert!(has_leading_zero_bits(&h(&[0x00, 0x7F]), 9));
		assert!(!has_leading_zero_bits(&h(&[0x00, 0x80]), 9));
		// 16 bits: two zero bytes
		assert!(has_leading_zero_bits(&h(&[0x00, 0x00, 0xFF]), 16));
		assert!(!has_leading_zero_bits(&h(&[0x00, 0x01, 0x00]), 16));
	}

	#[test]
	fn test_generate_base_parameters() {
		let config = Config::default();
		let desktop = generate(&config, false, 0, 0);
		assert_eq!(desktop.iterations, 5000);
		assert_eq!(desktop.difficulty, 8);
		assert_eq!(desktop.kind, ChallengeKind::Pow);

		let mobile = generate(&config, true, 0, 0);
		assert_eq!(mobile.difficulty, 6);
	}

	#[test]
	fn test_generate_invisible_for_trusted_history() {
		let config = Config::default();
		let challenge = generate(&config, false, 10, 3);
		assert_eq!(challenge.difficulty, 0);
		// history alone is not enough
		assert_eq!(generate(&config, false, 30, 3).difficulty, 8);
		assert_eq!(generate(&config, false, 10, 2).difficulty, 8);
	}

	#[test]
	fn test_generate_escalates_for_high_risk() {
		let config = Config::default();
		assert_eq!(generate(&config, false, 81, 0).difficulty, 10);
		assert_eq!(generate(&config, true, 81, 0).difficulty, 8);
	}

	#[test]
	fn test_generate_alternate_kinds_by_parity() {
		let config = Config::default();
		assert_eq!(generate(&config, false, 62, 0).kind, ChallengeKind::Image);
		assert_eq!(generate(&config, false, 61, 0).kind, ChallengeKind::Logic);
		assert_eq!(generate(&config, false, 60, 0).kind, ChallengeKind::Pow);
	}

	#[test]
	fn test_unverifiable_kinds_never_pass() {
		let ctx = ctx(false, 0);
		let proof = proof_for(&ctx, 1, &now_rfc3339());
		assert!(verify(ChallengeKind::Pow, &proof, &ctx));
		assert!(!verify(ChallengeKind::Image, &proof, &ctx));
		assert!(!verify(ChallengeKind::Logic, &proof, &ctx));
	}

	#[test]
	fn test_nonce_and_seed_sizes() {
		let config = Config::default();
		let challenge = generate(&config, false, 0, 0);
		// 16 and 8 bytes, standard base64
		assert_eq!(challenge.nonce.len(), 24);
		assert_eq!(challenge.seed.len(), 12);
	}
}

// vim: ts=4
