use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::GeneralPurpose;
use base64::engine::GeneralPurposeConfig;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::Local;
use chrono::TimeZone;

use crate::eval::parse_number;

/// A registered filter: current value plus positional arguments in, new
/// value out.
pub type FilterFn = Box<dyn Fn(&str, &[String]) -> String>;

/// Named string transforms applied in pipelines (`{{ x | trim | upper }}`).
///
/// Custom filters are consulted before built-ins, so registering a
/// built-in's name overrides it. Applying an unknown name is the identity
/// transform — a misspelled filter degrades the template, it does not
/// break the render. This is intentional and matches the engine-wide
/// recovery policy.
#[derive(Default)]
pub struct FilterRegistry {
	custom: HashMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<&String> = self.custom.keys().collect();
		names.sort();
		f.debug_struct("FilterRegistry")
			.field("custom", &names)
			.finish()
	}
}

impl FilterRegistry {
	pub fn register(
		&mut self,
		name: impl Into<String>,
		filter: impl Fn(&str, &[String]) -> String + 'static,
	) {
		self.custom.insert(name.into(), Box::new(filter));
	}

	/// Apply a filter by name, custom filters first. Total: never fails,
	/// unknown names return the value unchanged.
	pub fn apply(&self, value: &str, name: &str, args: &[String]) -> String {
		if let Some(filter) = self.custom.get(name) {
			return filter(value, args);
		}
		apply_builtin(value, name, args)
	}

	/// Whether a filter name takes charge of escaping itself, disabling
	/// the renderer's default HTML escaping for the whole chain.
	pub fn suppresses_escape(name: &str) -> bool {
		matches!(name, "raw" | "escape" | "url_encode" | "js_escape")
	}
}

fn apply_builtin(value: &str, name: &str, args: &[String]) -> String {
	match name {
		// `join` is reserved for list joining, which lives outside the
		// filter layer; both pass the value through.
		"raw" | "join" => value.to_string(),
		"escape" => html_escape(value),
		"url_encode" => url_encode(value),
		"js_escape" => js_escape(value),
		"uppercase" | "upper" => value.to_ascii_uppercase(),
		"lowercase" | "lower" => value.to_ascii_lowercase(),
		"trim" => value.trim_matches([' ', '\t', '\n', '\r']).to_string(),
		"length" => value.len().to_string(),
		"capitalize" => {
			let mut chars = value.chars();
			match chars.next() {
				Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
				None => String::new(),
			}
		}
		"reverse" => value.chars().rev().collect(),
		"truncate" => {
			let limit = args
				.first()
				.and_then(|arg| arg.parse::<usize>().ok())
				.unwrap_or(50);
			if value.chars().count() > limit {
				let mut truncated: String = value.chars().take(limit).collect();
				truncated.push_str("...");
				truncated
			} else {
				value.to_string()
			}
		}
		"replace" => {
			if args.len() >= 2 {
				value.replace(&args[0], &args[1])
			} else {
				value.to_string()
			}
		}
		"default" => {
			if value.is_empty() && !args.is_empty() {
				args[0].clone()
			} else {
				value.to_string()
			}
		}
		"first" => value
			.chars()
			.next()
			.map_or_else(String::new, |ch| ch.to_string()),
		"last" => value
			.chars()
			.next_back()
			.map_or_else(String::new, |ch| ch.to_string()),
		"round" => {
			let Some(number) = parse_number(value) else {
				return value.to_string();
			};
			let precision = args
				.first()
				.and_then(|arg| arg.parse::<usize>().ok())
				.unwrap_or(0);
			format!("{number:.precision$}")
		}
		"date" => format_timestamp(value, args, "%Y-%m-%d"),
		"time" => format_timestamp(value, args, "%H:%M:%S"),
		"datetime" => format_timestamp(value, args, "%Y-%m-%d %H:%M:%S"),
		"base64_encode" => BASE64_STANDARD.encode(value),
		"base64_decode" | "base64" => base64_decode(value),
		"endswith" => predicate(args, |suffix| value.ends_with(suffix)),
		"startswith" => predicate(args, |prefix| value.starts_with(prefix)),
		"contains" => predicate(args, |needle| value.contains(needle)),
		_ => value.to_string(),
	}
}

/// String-predicate filters return the literal strings `"true"`/`"false"`
/// so conditions can compare against `"true"`. No argument means `"false"`.
fn predicate(args: &[String], test: impl Fn(&str) -> bool) -> String {
	match args.first() {
		Some(arg) if test(arg) => "true".to_string(),
		_ => "false".to_string(),
	}
}

/// Escape `& < > " '` for HTML output.
pub(crate) fn html_escape(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(ch),
		}
	}
	escaped
}

/// Percent-encode every byte except ASCII alphanumerics and `- _ . ~`.
fn url_encode(value: &str) -> String {
	let mut encoded = String::with_capacity(value.len());
	for byte in value.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
				encoded.push(byte as char);
			}
			_ => {
				let _ = write!(encoded, "%{byte:02X}");
			}
		}
	}
	encoded
}

/// Escape backslashes, quotes and control whitespace for embedding in a
/// JavaScript string literal.
fn js_escape(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for ch in value.chars() {
		match ch {
			'\\' => escaped.push_str("\\\\"),
			'"' => escaped.push_str("\\\""),
			'\'' => escaped.push_str("\\'"),
			'\n' => escaped.push_str("\\n"),
			'\r' => escaped.push_str("\\r"),
			'\t' => escaped.push_str("\\t"),
			_ => escaped.push(ch),
		}
	}
	escaped
}

/// Parse the value as an integer Unix timestamp and format it in local
/// time with a strftime pattern. Any failure returns the value unchanged.
fn format_timestamp(value: &str, args: &[String], default_format: &str) -> String {
	let Ok(timestamp) = value.trim().parse::<i64>() else {
		return value.to_string();
	};
	let Some(moment) = Local.timestamp_opt(timestamp, 0).single() else {
		return value.to_string();
	};

	let format = args.first().map_or(default_format, String::as_str);
	let mut formatted = String::new();
	if write!(formatted, "{}", moment.format(format)).is_err() {
		return value.to_string();
	}
	formatted
}

/// Lenient Base64 decoding: characters outside the alphabet are ignored
/// and the first `=` ends the payload. A dangling trailing character
/// carries fewer than eight bits and contributes nothing.
fn base64_decode(value: &str) -> String {
	const LENIENT: GeneralPurpose = GeneralPurpose::new(
		&alphabet::STANDARD,
		GeneralPurposeConfig::new()
			.with_decode_allow_trailing_bits(true)
			.with_decode_padding_mode(DecodePaddingMode::Indifferent),
	);

	let mut cleaned = String::with_capacity(value.len());
	for ch in value.chars() {
		if ch == '=' {
			break;
		}
		if ch.is_ascii_alphanumeric() || ch == '+' || ch == '/' {
			cleaned.push(ch);
		}
	}
	if cleaned.len() % 4 == 1 {
		cleaned.pop();
	}

	match LENIENT.decode(cleaned.as_bytes()) {
		Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
		Err(_) => value.to_string(),
	}
}
