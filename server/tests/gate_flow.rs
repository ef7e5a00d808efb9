//! End-to-end scenarios over the assembled router: bootstrap flow, the
//! fingerprint → challenge → verify happy path, nonce one-shot semantics,
//! probe handling, and the rate-limit storm.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use janus_core::{Config, Timestamp};
use janus_server::challenge::has_leading_zero_bits;
use janus_server::{routes, App, AppBuilder};

const CLIENT_IP: &str = "1.2.3.4";
const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn test_config(backend: &str) -> Config {
	let mut config = Config::default();
	config.backend = backend.into();
	config.session_secret = Some(SECRET.into());
	config
}

fn build_app(backend: &str) -> App {
	AppBuilder::new(test_config(backend)).build().unwrap()
}

/// Requests that look like a real browser, attributed via X-Forwarded-For.
fn browser_request(method: &str, path: &str, ip: &str) -> axum::http::request::Builder {
	Request::builder()
		.method(method)
		.uri(path)
		.header("x-forwarded-for", ip)
		.header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64) Chrome/140.0")
		.header(header::ACCEPT, "text/html,application/json")
		.header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
		.header(header::ACCEPT_ENCODING, "identity")
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
	router.clone().oneshot(request).await.unwrap()
}

async fn body_string(response: Response<Body>) -> String {
	let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
	String::from_utf8(bytes.to_vec()).unwrap()
}

/// A tiny origin server standing in for the protected backend.
async fn spawn_origin() -> String {
	let origin = Router::new()
		.route(
			"/",
			get(|| async {
				Html("<html><head><title>o</title></head><body>origin page</body></html>")
			}),
		)
		.route("/plain", get(|| async { "no html here" }));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, origin).await.unwrap();
	});
	format!("http://{}", addr)
}

fn desktop_fingerprint_json() -> String {
	serde_json::json!({
		"canvasHash": "abc",
		"timezone": "UTC",
		"webdriver": false,
		"chromeExists": true,
		"isMobile": false
	})
	.to_string()
}

fn mine_proof(nonce: &str, seed: &str, canvas_hash: &str, difficulty: u32) -> String {
	let ts = chrono::Utc::now().to_rfc3339();
	for iter in 0..=5000u32 {
		let proof = format!("{}|{}|{}|{}|{}|{}", nonce, iter, ts, CLIENT_IP, seed, canvas_hash);
		if has_leading_zero_bits(&Sha256::digest(proof.as_bytes()), difficulty) {
			return proof;
		}
	}
	panic!("no proof found within max iterations");
}

#[tokio::test]
async fn test_first_visit_serves_bootstrap_with_stored_nonce() {
	let app = build_app("http://127.0.0.1:9");
	let router = routes::init(app.clone());

	let response =
		send(&router, browser_request("GET", "/", CLIENT_IP).body(Body::empty()).unwrap()).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("<script src=\"/static/sensor.js\" data-nonce=\""));

	let nonce = app.nonces.consume(CLIENT_IP, Timestamp::now()).expect("nonce must be stored");
	assert!(body.contains(&*nonce));
}

#[tokio::test]
async fn test_desktop_client_verifies_and_is_proxied() {
	let origin = spawn_origin().await;
	let app = build_app(&origin);
	let router = routes::init(app.clone());

	// 1. post the device fingerprint
	let response = send(
		&router,
		browser_request("POST", "/fingerprint", CLIENT_IP)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(desktop_fingerprint_json()))
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);

	// 2. fetch the challenge
	let response =
		send(&router, browser_request("GET", "/challenge", CLIENT_IP).body(Body::empty()).unwrap())
			.await;
	assert_eq!(response.status(), StatusCode::OK);
	let challenge: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
	assert_eq!(challenge["iterations"], 5000);
	assert_eq!(challenge["difficulty"], 8);
	assert_eq!(challenge["type"], "pow");
	assert_eq!(challenge["clientIP"], CLIENT_IP);
	let nonce = challenge["nonce"].as_str().unwrap().to_string();
	let seed = challenge["seed"].as_str().unwrap().to_string();

	// 3. mine and submit the proof
	let proof = mine_proof(&nonce, &seed, "abc", 8);
	let verify_body = serde_json::json!({ "nonce": nonce, "proof": proof }).to_string();
	let response = send(
		&router,
		browser_request("POST", "/verify", CLIENT_IP)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(verify_body.clone()))
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);
	let set_cookie =
		response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
	assert!(set_cookie.starts_with("janus_token="));
	assert!(set_cookie.contains("HttpOnly"));
	let cookie = set_cookie.split(';').next().unwrap().to_string();

	// 4. the same (nonce, proof) can never verify twice
	let response = send(
		&router,
		browser_request("POST", "/verify", CLIENT_IP)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(verify_body))
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	// 5. verified traffic reaches the origin, with the sensor injected
	let response = send(
		&router,
		browser_request("GET", "/", CLIENT_IP)
			.header(header::COOKIE, &cookie)
			.body(Body::empty())
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("origin page"));
	let script_at = body.find("<script src=\"/static/sensor.js\"").unwrap();
	let head_at = body.find("</head>").unwrap();
	assert!(script_at < head_at, "script tag must sit before </head>");

	// 6. non-HTML responses pass through untouched
	let response = send(
		&router,
		browser_request("GET", "/plain", CLIENT_IP)
			.header(header::COOKIE, &cookie)
			.body(Body::empty())
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert_eq!(body, "no html here");
}

#[tokio::test]
async fn test_tampered_cookie_gets_bootstrap_not_origin() {
	let origin = spawn_origin().await;
	let app = build_app(&origin);
	let router = routes::init(app);

	let response = send(
		&router,
		browser_request("GET", "/", CLIENT_IP)
			.header(header::COOKIE, "janus_token=evil.forged.token")
			.body(Body::empty())
			.unwrap(),
	)
	.await;
	// silently back to the bootstrap flow
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("data-nonce"));
	assert!(!body.contains("origin page"));
}

#[tokio::test]
async fn test_curl_probe_never_reaches_origin() {
	let origin = spawn_origin().await;
	let app = build_app(&origin);
	let router = routes::init(app);

	let response = send(
		&router,
		Request::builder()
			.method("GET")
			.uri("/")
			.header("x-forwarded-for", "4.4.4.4")
			.header(header::USER_AGENT, "curl/8.0")
			.body(Body::empty())
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_string(response).await;
	assert!(body.contains("data-nonce"));
	assert!(!body.contains("origin page"));
}

#[tokio::test]
async fn test_rate_limit_storm_returns_429() {
	let app = build_app("http://127.0.0.1:9");
	let router = routes::init(app);

	for _ in 0..60 {
		let response =
			send(&router, browser_request("GET", "/", "9.9.9.9").body(Body::empty()).unwrap())
				.await;
		assert_eq!(response.status(), StatusCode::OK);
	}
	let response =
		send(&router, browser_request("GET", "/", "9.9.9.9").body(Body::empty()).unwrap()).await;
	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

	// other addresses are unaffected
	let response =
		send(&router, browser_request("GET", "/", "9.9.9.8").body(Body::empty()).unwrap()).await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_telemetry_requires_session_cookie() {
	let app = build_app("http://127.0.0.1:9");
	let router = routes::init(app.clone());

	let scroll = serde_json::json!({ "activity": "scroll" }).to_string();
	let response = send(
		&router,
		browser_request("POST", "/telemetry", CLIENT_IP)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(scroll.clone()))
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	// with a minted session the event lands on the record
	let sid = "test-session-id";
	app.sessions.create(sid, janus_core::store::Session::new(Timestamp::now(), "/"));
	let token = app.session_keys.mint(CLIENT_IP, sid, 900).unwrap();
	let response = send(
		&router,
		browser_request("POST", "/telemetry", CLIENT_IP)
			.header(header::CONTENT_TYPE, "application/json")
			.header(header::COOKIE, format!("janus_token={}", token))
			.body(Body::from(scroll))
			.unwrap(),
	)
	.await;
	assert_eq!(response.status(), StatusCode::OK);
	assert!(app.sessions.get(sid).unwrap().has_scrolled);
}

#[tokio::test]
async fn test_forwarded_for_variants_key_the_stores() {
	let app = build_app("http://127.0.0.1:9");
	let router = routes::init(app.clone());

	for (xff, expected) in
		[("1.2.3.4", "1.2.3.4"), ("1.2.3.4, 5.6.7.8", "1.2.3.4"), ("[::1]", "::1")]
	{
		let response = send(
			&router,
			Request::builder()
				.method("GET")
				.uri("/")
				.header("x-forwarded-for", xff)
				.header(header::USER_AGENT, "Mozilla/5.0 Chrome/140.0")
				.body(Body::empty())
				.unwrap(),
		)
		.await;
		assert_eq!(response.status(), StatusCode::OK);
		assert!(
			app.nonces.consume(expected, Timestamp::now()).is_some(),
			"nonce should be keyed under {}",
			expected
		);
	}
}

// vim: ts=4
