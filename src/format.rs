use std::{collections::HashMap, sync::LazyLock};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

/// `%%`, or `%{path}` / `%{path/format}`
static TOKEN: LazyLock<Result<Regex, regex::Error>> =
	LazyLock::new(|| Regex::new(r"%%|%\{([A-Za-z0-9_. ]+?)(?:/([A-Za-z0-9_ ]+))?\}"));

/// Left alone by `url`, the same set as `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

const BUILTIN: &[&str] = &["string", "number", "exp", "EXP", "hex", "HEX", "bin", "json", "url"];

/// A user supplied formatting function
pub type FormatFn = Box<dyn Fn(&Value) -> Result<String, FormatError>>;

/// Why a template couldn't be rendered
#[derive(Debug, Error)]
pub enum FormatError {
	/// A token named a format nobody registered
	#[error("format `{0}` has not been registered")]
	UnknownFormat(String),
	/// A token's path doesn't lead to an argument
	#[error("no argument at `{0}`")]
	MissingArgument(String),
	/// `hex`, `HEX` and `bin` only render whole numbers
	#[error("`{0}` is not an integer")]
	NotAnInteger(String),
	/// Serializing for the `json` format failed
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	/// Built-in format names can't be replaced
	#[error("format `{0}` is built in")]
	Reserved(String),
	/// The token pattern failed to compile
	#[error("invalid token pattern: {0}")]
	Pattern(#[from] regex::Error),
}

/// Interpolates arguments into `%{...}` tokens, rendering each with a named format
#[derive(Default)]
pub struct Formatter {
	user: HashMap<String, FormatFn>,
}

impl Formatter {
	/// A formatter knowing only the built-in formats
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a format usable as `%{path/name}`
	pub fn register<F>(&mut self, name: impl Into<String>, format: F) -> Result<(), FormatError>
	where
		F: Fn(&Value) -> Result<String, FormatError> + 'static,
	{
		let name = name.into();
		if BUILTIN.contains(&name.as_str()) {
			return Err(FormatError::Reserved(name));
		}

		self.user.insert(name, Box::new(format));
		Ok(())
	}

	/// Renders `template`, resolving token paths against `args`.
	///
	/// The first path segment indexes `args`, later ones walk into arrays by index and objects by key.
	pub fn format(&self, template: &str, args: &[Value]) -> Result<String, FormatError> {
		let token = TOKEN.as_ref().map_err(|e| FormatError::Pattern(e.clone()))?;
		let mut out = String::with_capacity(template.len());
		let mut last = 0;

		for captures in token.captures_iter(template) {
			let Some(token) = captures.get(0) else { continue };
			out.push_str(&template[last..token.start()]);
			out.push_str(&self.render(&captures, args)?);
			last = token.end();
		}

		out.push_str(&template[last..]);
		Ok(out)
	}

	fn render(&self, captures: &Captures<'_>, args: &[Value]) -> Result<String, FormatError> {
		let Some(path) = captures.get(1) else {
			return Ok("%".to_owned());
		};
		let format = captures.get(2).map_or("string", |m| m.as_str());

		let value = lookup(args, path.as_str())?;
		self.apply(format, value)
	}

	fn apply(&self, format: &str, value: &Value) -> Result<String, FormatError> {
		match format {
			"string" => Ok(to_string(value)),
			"number" => Ok(number_to_string(to_number(value))),
			"exp" => Ok(to_exponential(to_number(value))),
			"EXP" => Ok(to_exponential(to_number(value)).to_uppercase()),
			"hex" => to_radix(value, 16),
			"HEX" => to_radix(value, 16).map(|s| s.to_uppercase()),
			"bin" => to_radix(value, 2),
			"json" => Ok(serde_json::to_string(value)?),
			"url" => Ok(utf8_percent_encode(&to_string(value), URI_COMPONENT).to_string()),
			other => match self.user.get(other) {
				Some(format) => format(value),
				None => Err(FormatError::UnknownFormat(other.to_owned())),
			},
		}
	}
}

fn lookup<'a>(args: &'a [Value], path: &str) -> Result<&'a Value, FormatError> {
	let missing = || FormatError::MissingArgument(path.to_owned());
	let mut segments = path.split('.');

	let first = segments.next().and_then(|s| s.parse::<usize>().ok()).ok_or_else(missing)?;
	let mut value = args.get(first).ok_or_else(missing)?;

	for segment in segments {
		value = match value {
			Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
			Value::Object(fields) => fields.get(segment),
			_ => None,
		}
		.ok_or_else(missing)?;
	}

	Ok(value)
}

fn to_string(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Array(items) => items.iter().map(element_to_string).collect::<Vec<_>>().join(","),
		other => other.to_string(),
	}
}

/// Array elements render nulls as empty strings
fn element_to_string(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		other => to_string(other),
	}
}

fn to_number(value: &Value) -> f64 {
	match value {
		Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
		Value::Bool(b) => f64::from(u8::from(*b)),
		Value::Null => 0.0,
		Value::String(s) if s.trim().is_empty() => 0.0,
		Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
		Value::Array(_) | Value::Object(_) => f64::NAN,
	}
}

fn non_finite(n: f64) -> Option<String> {
	if n.is_nan() {
		Some("NaN".to_owned())
	} else if n.is_infinite() {
		Some(if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned())
	} else {
		None
	}
}

fn number_to_string(n: f64) -> String {
	if let Some(s) = non_finite(n) {
		return s;
	}

	let magnitude = n.abs();
	if n == 0.0 {
		"0".to_owned()
	} else if !(1e-6..1e21).contains(&magnitude) {
		to_exponential(n)
	} else if n.fract() == 0.0 {
		format!("{n:.0}")
	} else {
		n.to_string()
	}
}

/// Shortest exponential notation with an explicit exponent sign, `1.5e+2`
fn to_exponential(n: f64) -> String {
	if let Some(s) = non_finite(n) {
		return s;
	}

	let formatted = format!("{n:e}");
	match formatted.split_once('e') {
		Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
		_ => formatted,
	}
}

fn to_radix(value: &Value, radix: u32) -> Result<String, FormatError> {
	let n = to_number(value);
	if !n.is_finite() || n.fract() != 0.0 || n.abs() >= i128::MAX as f64 {
		return Err(FormatError::NotAnInteger(to_string(value)));
	}

	let n = n as i128;
	let sign = if n < 0 { "-" } else { "" };
	let digits = match radix {
		16 => format!("{:x}", n.unsigned_abs()),
		_ => format!("{:b}", n.unsigned_abs()),
	};

	Ok(format!("{sign}{digits}"))
}
