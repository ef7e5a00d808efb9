//! The challenge API: `/fingerprint`, `/challenge`, `/verify`.

use axum::extract::State;
use axum::http::{header, HeaderMap, Uri};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{mobile, ProofContext};
use crate::gate::risk::RiskInput;
use crate::gate::token;
use crate::prelude::*;
use janus_core::extract::{ClientIp, OptionalTls};
use janus_core::store::{Fingerprint, Session};

#[derive(Debug, Serialize)]
struct StatusResponse {
	status: &'static str,
}

const SUCCESS: StatusResponse = StatusResponse { status: "success" };

/// Store the device fingerprint posted by the sensor script. The client
/// address is always the resolver's value; anything the client claims is
/// discarded.
pub async fn post_fingerprint(
	State(app): State<App>,
	ClientIp(client_ip): ClientIp,
	Json(fingerprint): Json<Fingerprint>,
) -> JnResult<impl IntoResponse> {
	if fingerprint.canvas_hash.is_empty() || fingerprint.timezone.is_empty() {
		return Err(Error::BadRequest("missing required fingerprint fields"));
	}
	debug!("Stored fingerprint for {} (mobile: {})", client_ip, fingerprint.is_mobile);
	app.fingerprints.put(&client_ip, fingerprint);
	Ok(Json(SUCCESS))
}

#[derive(Debug, Serialize)]
struct ChallengeResponse {
	nonce: Box<str>,
	iterations: u32,
	seed: Box<str>,
	#[serde(rename = "clientIP")]
	client_ip: String,
	#[serde(rename = "type")]
	kind: &'static str,
	difficulty: u32,
}

/// Mint a challenge for a caller with a stored fingerprint. The risk score
/// is recomputed here so difficulty adapts to what the gate saw.
pub async fn get_challenge(
	State(app): State<App>,
	ClientIp(client_ip): ClientIp,
	tls: OptionalTls,
	uri: Uri,
	headers: HeaderMap,
) -> JnResult<impl IntoResponse> {
	let Some(fingerprint) = app.fingerprints.get(&client_ip) else {
		return Err(Error::BadRequest("no fingerprint"));
	};

	let input = RiskInput::from_request(&headers, uri.path(), tls.ja3(), &client_ip);
	let (suspicious, risk_score) = app.scorer.score(&input, Some(&fingerprint));
	if suspicious {
		debug!("Challenge for suspicious caller {} (score {})", client_ip, risk_score);
	}

	let challenge = super::generate(
		&app.config,
		fingerprint.is_mobile,
		risk_score,
		fingerprint.verified_count,
	);
	let response = ChallengeResponse {
		nonce: challenge.nonce.clone(),
		iterations: challenge.iterations,
		seed: challenge.seed.clone(),
		client_ip: client_ip.clone(),
		kind: challenge.kind.as_str(),
		difficulty: challenge.difficulty,
	};
	info!(
		"Issued {} challenge for {} (difficulty {})",
		response.kind, client_ip, response.difficulty
	);
	app.challenges.insert(&client_ip, challenge);
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
	pub nonce: String,
	pub proof: String,
}

/// Verify a submitted proof and mint the session credential.
pub async fn post_verify(
	State(app): State<App>,
	ClientIp(client_ip): ClientIp,
	Json(request): Json<VerifyRequest>,
) -> JnResult<impl IntoResponse> {
	let Some(fingerprint) = app.fingerprints.get(&client_ip) else {
		return Err(Error::BadRequest("no fingerprint"));
	};

	let now = Timestamp::now();
	// One-shot: the record is gone after this regardless of the outcome.
	// Absent and expired are indistinguishable to the caller.
	let Some(challenge) = app.challenges.take(&client_ip, &request.nonce, now) else {
		return Err(Error::BadRequest("no valid challenge"));
	};

	if !device_plausible(&fingerprint) {
		info!("Rejected implausible device for {}", client_ip);
		return Err(Error::Unauthorized);
	}

	let max_iterations = if fingerprint.is_mobile {
		app.config.mobile_iterations
	} else {
		app.config.desktop_iterations
	};
	let ctx = ProofContext {
		nonce: &challenge.nonce,
		client_ip: &client_ip,
		seed: &challenge.seed,
		is_mobile: fingerprint.is_mobile,
		canvas_hash: &fingerprint.canvas_hash,
		max_iterations,
		difficulty: challenge.difficulty,
	};
	if !super::verify(challenge.kind, &request.proof, &ctx) {
		info!("Proof verification failed for {}", client_ip);
		return Err(Error::Unauthorized);
	}

	// The injection nonce, when still live, is consumed by this verify
	let _ = app.nonces.consume(&client_ip, now);
	app.fingerprints.record_verification(&client_ip);

	let sid = Uuid::new_v4().to_string();
	app.sessions.create(&sid, Session::new(now, "/"));
	let token =
		app.session_keys
			.mint(&client_ip, &sid, app.config.session_timeout_seconds as i64)?;
	let cookie = token::build_cookie(&token, app.config.session_timeout_seconds);

	info!("Verification passed for {}, session {} minted", client_ip, sid);
	Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(SUCCESS)))
}

fn device_plausible(fingerprint: &Fingerprint) -> bool {
	if fingerprint.is_mobile {
		mobile::screen_mobile(fingerprint)
	} else {
		mobile::screen_desktop(fingerprint)
	}
}

// vim: ts=4
