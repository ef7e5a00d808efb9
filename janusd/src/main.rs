use std::path::PathBuf;

use janus_core::Config;
use janus_server::AppBuilder;

#[tokio::main]
async fn main() {
	// Config file path from the first argument or JANUS_CONFIG; pure
	// defaults plus env overrides otherwise.
	let config_path = std::env::args()
		.nth(1)
		.or_else(|| std::env::var("JANUS_CONFIG").ok())
		.map(PathBuf::from);

	let config = match Config::load(config_path.as_deref()) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("FATAL: could not load config: {}", err);
			std::process::exit(1);
		}
	};

	if let Err(err) = AppBuilder::new(config).run().await {
		eprintln!("FATAL: {}", err);
		std::process::exit(1);
	}
}

// vim: ts=4
