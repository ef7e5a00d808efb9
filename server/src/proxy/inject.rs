//! Sensor-script injection into buffered HTML bodies.

/// Build the script tag injected into HTML responses.
pub fn script_tag(src: &str, nonce: &str) -> String {
	format!("<script src=\"{}\" data-nonce=\"{}\"></script>", src, nonce)
}

/// Insert `tag` immediately before the first `</head>` (case-insensitive),
/// falling back to the last `</body>`, falling back to appending. All other
/// bytes pass through untouched.
pub fn inject(body: &[u8], tag: &str) -> Vec<u8> {
	let lower = body.to_ascii_lowercase();
	let at = find(&lower, b"</head>").or_else(|| rfind(&lower, b"</body>"));

	let mut out = Vec::with_capacity(body.len() + tag.len());
	match at {
		Some(idx) => {
			out.extend_from_slice(&body[..idx]);
			out.extend_from_slice(tag.as_bytes());
			out.extend_from_slice(&body[idx..]);
		}
		None => {
			out.extend_from_slice(body);
			out.extend_from_slice(tag.as_bytes());
		}
	}
	out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack.windows(needle.len()).rposition(|window| window == needle)
}


// vim: ts=4
