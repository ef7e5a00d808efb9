use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::prelude::*;

pub type JnResult<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the gate. Client-visible variants map to short
/// fixed bodies; internal detail stays in the log.
#[derive(Debug)]
pub enum Error {
	BadRequest(&'static str),
	Unauthorized,
	Forbidden,
	NotFound,
	TooManyRequests,
	ValidationError(String),
	ConfigError(String),
	NetworkError(String),
	Timeout,
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		warn!("io error: {}", err);
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		warn!("json error: {}", err);
		Error::BadRequest("invalid json")
	}
}

impl From<axum::Error> for Error {
	fn from(err: axum::Error) -> Self {
		warn!("axum error: {}", err);
		Error::Internal(err.to_string())
	}
}

impl From<axum::http::Error> for Error {
	fn from(err: axum::http::Error) -> Self {
		warn!("http error: {}", err);
		Error::Internal(err.to_string())
	}
}

impl From<axum::http::header::ToStrError> for Error {
	fn from(err: axum::http::header::ToStrError) -> Self {
		warn!("header to str error: {}", err);
		Error::BadRequest("invalid header value")
	}
}

impl From<std::num::ParseIntError> for Error {
	fn from(err: std::num::ParseIntError) -> Self {
		warn!("parse int error: {}", err);
		Error::BadRequest("invalid number")
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::BadRequest(msg) => write!(f, "bad request: {}", msg),
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::Forbidden => write!(f, "forbidden"),
			Error::NotFound => write!(f, "not found"),
			Error::TooManyRequests => write!(f, "too many requests"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Timeout => write!(f, "timeout"),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

fn error_body(code: &str, message: &str) -> Json<serde_json::Value> {
	Json(serde_json::json!({ "error": { "code": code, "message": message } }))
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		// Internal detail never reaches the client
		match self {
			Error::BadRequest(msg) => {
				(StatusCode::BAD_REQUEST, error_body("E-BAD-REQUEST", msg)).into_response()
			}
			Error::Unauthorized => (
				StatusCode::UNAUTHORIZED,
				error_body("E-UNAUTHORIZED", "verification failed"),
			)
				.into_response(),
			Error::Forbidden => {
				(StatusCode::FORBIDDEN, error_body("E-FORBIDDEN", "session required")).into_response()
			}
			Error::NotFound => {
				(StatusCode::NOT_FOUND, error_body("E-NOT-FOUND", "not found")).into_response()
			}
			Error::TooManyRequests => {
				(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
			}
			Error::NetworkError(_) => {
				(StatusCode::BAD_GATEWAY, error_body("E-UPSTREAM", "bad gateway")).into_response()
			}
			Error::Timeout => (
				StatusCode::GATEWAY_TIMEOUT,
				error_body("E-UPSTREAM-TIMEOUT", "upstream timeout"),
			)
				.into_response(),
			_ => (
				StatusCode::INTERNAL_SERVER_ERROR,
				error_body("E-INTERNAL", "internal error"),
			)
				.into_response(),
		}
	}
}


// vim: ts=4
