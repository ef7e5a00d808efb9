//! Continuous behavioural telemetry posted by the sensor after a session
//! exists. Events refresh the sliding session TTL and accumulate the flags
//! that distinguish a human from a replayed script.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::gate::token;
use crate::prelude::*;
use janus_core::extract::ClientIp;
use janus_core::store::{MousePoint, Session};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPackage {
	pub activity: String,
	#[serde(default)]
	pub mouse_signature: Vec<MousePoint>,
	#[serde(default)]
	pub page: Option<String>,
}

pub async fn post_telemetry(
	State(app): State<App>,
	ClientIp(client_ip): ClientIp,
	headers: HeaderMap,
	Json(package): Json<ActivityPackage>,
) -> JnResult<impl IntoResponse> {
	let Some(claims) = token::is_verified(&app, &headers, &client_ip) else {
		return Err(Error::Forbidden);
	};

	let updated = app.sessions.update(&claims.sid, |session| {
		apply_activity(session, &package);
	});
	if !updated {
		// Valid credential whose record was swept; telemetry state restarts
		let mut session = Session::new(Timestamp::now(), package.page.as_deref().unwrap_or("/"));
		apply_activity(&mut session, &package);
		app.sessions.create(&claims.sid, session);
	}

	Ok((StatusCode::OK, Json(serde_json::json!({ "status": "success" }))))
}

fn apply_activity(session: &mut Session, package: &ActivityPackage) {
	match package.activity.as_str() {
		"scroll" => {
			session.has_scrolled = true;
		}
		"mousemove" => {
			if !is_linear(&package.mouse_signature) {
				session.has_natural_mouse_movement = true;
			}
		}
		"pageview" => {
			if let Some(page) = &package.page {
				session.record_page(page);
			}
		}
		other => debug!("Ignoring unknown telemetry activity {:?}", other),
	}
}

/// A path is linear when every segment repeats the slope of the first:
/// `dx1 * (y[i] - y[i-1]) == dy1 * (x[i] - x[i-1])` for all `i >= 2`.
/// Fewer than three points is inconclusive and treated as linear.
pub fn is_linear(points: &[MousePoint]) -> bool {
	if points.len() < 3 {
		return true;
	}
	let dx1 = points[1].x - points[0].x;
	let dy1 = points[1].y - points[0].y;
	for pair in points.windows(2).skip(1) {
		let dx = pair[1].x - pair[0].x;
		let dy = pair[1].y - pair[0].y;
		if dx1 * dy != dy1 * dx {
			return false;
		}
	}
	true
}


// vim: ts=4
