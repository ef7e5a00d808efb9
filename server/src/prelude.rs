pub use crate::{App, AppState};
pub use janus_core::error::{Error, JnResult};
pub use janus_core::types::Timestamp;

pub use tracing::{
	debug_span, info_span, warn_span, error_span,
	debug, info, warn, error,
};

// vim: ts=4
