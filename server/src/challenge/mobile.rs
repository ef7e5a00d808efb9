//! Device plausibility screening applied before proof checks.
//!
//! Emulated mobile devices tend to report frozen sensors: identical
//! accelerometer readings, or a battery pinned at 100% while charging.

use crate::prelude::*;
use janus_core::store::Fingerprint;

/// Screen a mobile fingerprint. Returns false when the device looks like
/// an emulator.
pub fn screen_mobile(fingerprint: &Fingerprint) -> bool {
	let Some(accel) = &fingerprint.accelerometer else {
		debug!("Mobile screening: accelerometer data not available");
		return false;
	};
	let (Some(r1), Some(r2)) = (&accel.reading1, &accel.reading2) else {
		debug!("Mobile screening: accelerometer readings missing");
		return false;
	};
	if r1 == r2 {
		debug!("Mobile screening: static accelerometer readings");
		return false;
	}

	let Some(battery) = &fingerprint.battery else {
		debug!("Mobile screening: battery data not available");
		return false;
	};
	if battery.level >= 1.0 && battery.charging {
		debug!("Mobile screening: battery full and charging");
		return false;
	}

	true
}

/// Screen a desktop fingerprint: the canvas hash must be a real rendering.
pub fn screen_desktop(fingerprint: &Fingerprint) -> bool {
	!matches!(&*fingerprint.canvas_hash, "" | "error" | "CanvasError")
}


// vim: ts=4
