use std::collections::HashMap;

use derive_more::Deref;
use derive_more::DerefMut;
use float_cmp::approx_eq;
use serde::Deserialize;
use serde::Serialize;

use crate::filters::FilterRegistry;
use crate::parser::Clause;
use crate::parser::Join;
use crate::parser::Operand;
use crate::parser::OperandKind;

/// A flat string-keyed, string-valued dictionary, reached from templates
/// through dotted identifiers (`{{ user.name }}`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
pub struct Dict(
	#[deref]
	#[deref_mut]
	HashMap<String, String>,
);

impl Dict {
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	/// The value bound to `key`, or the empty string when absent.
	pub fn get(&self, key: &str) -> &str {
		self.0.get(key).map_or("", String::as_str)
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.0.insert(key.into(), value.into());
		self
	}

	pub fn has(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}
}

impl From<HashMap<String, String>> for Dict {
	fn from(values: HashMap<String, String>) -> Self {
		Self(values)
	}
}

impl<K, V> FromIterator<(K, V)> for Dict
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// The bindings visible during one render pass or one loop iteration.
/// Loop iterations swap in a shadow copy of `vars`; lists and dictionaries
/// are shared.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Environment<'a> {
	pub vars: &'a HashMap<String, String>,
	pub lists: &'a HashMap<String, Vec<String>>,
	pub dicts: &'a HashMap<String, Dict>,
}

/// Resolve an identifier: dictionary dot-access first (when the prefix
/// names a known dictionary), then `vars`, then list lengths. `None` when
/// nothing in the environment knows the name.
pub(crate) fn lookup(name: &str, env: &Environment<'_>) -> Option<String> {
	if let Some((dict_name, key)) = name.split_once('.') {
		if let Some(dict) = env.dicts.get(dict_name) {
			return Some(dict.get(key).to_string());
		}
	}

	if let Some(value) = env.vars.get(name) {
		return Some(value.clone());
	}

	if let Some(list) = env.lists.get(name) {
		return Some(list.len().to_string());
	}

	None
}

/// Resolve a condition operand. Literal kinds resolve to their token text
/// verbatim; identifiers resolve through the environment, with unknown
/// names becoming the empty string.
pub(crate) fn resolve(operand: &Operand, env: &Environment<'_>) -> String {
	match operand.kind {
		OperandKind::Str | OperandKind::Number | OperandKind::Bool => operand.text.clone(),
		OperandKind::Ident => lookup(&operand.text, env).unwrap_or_default(),
	}
}

/// Falsy values are the empty string, `"0"` and `"false"`.
pub(crate) fn truthy(value: &str) -> bool {
	!value.is_empty() && value != "0" && value != "false"
}

/// The single numeric parse attempt shared by ordering comparisons,
/// arithmetic conditions and the numeric filters.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
	value.trim().parse::<f64>().ok()
}

pub(crate) fn bool_str(value: bool) -> &'static str {
	if value { "true" } else { "false" }
}

/// Evaluate a clause list left to right. The last-seen `and`/`or`
/// determines how the next clause combines with the running result; there
/// is no precedence climbing.
pub(crate) fn evaluate_clauses(
	clauses: &[Clause],
	env: &Environment<'_>,
	registry: &FilterRegistry,
) -> bool {
	let mut result = true;
	let mut last_join: Option<Join> = None;

	for clause in clauses {
		let mut value = evaluate_clause(clause, env, registry);
		if clause.negated {
			value = !value;
		}

		result = match last_join {
			Some(Join::And) => result && value,
			Some(Join::Or) => result || value,
			None => value,
		};
		last_join = clause.join;
	}

	result
}

fn evaluate_clause(clause: &Clause, env: &Environment<'_>, registry: &FilterRegistry) -> bool {
	let mut left = resolve(&clause.left, env);

	// Filters apply to the resolved value; from here on the operand is a
	// plain string regardless of its original kind.
	for filter in &clause.filters {
		left = registry.apply(&left, &filter.name, &filter.args);
	}

	let Some(op) = clause.op.as_deref() else {
		return truthy(&left);
	};

	let right = clause
		.right
		.as_ref()
		.map_or_else(String::new, |operand| resolve(operand, env));

	compare(&left, op, &right)
}

/// Comparison operators plus the arithmetic-as-condition behavior:
/// `+ - * /` evaluate both sides numerically and the truth value is
/// whether the result is nonzero.
fn compare(left: &str, op: &str, right: &str) -> bool {
	match op {
		"==" => left == right,
		"!=" => left != right,
		">" | "<" | ">=" | "<=" => match (parse_number(left), parse_number(right)) {
			(Some(a), Some(b)) => match op {
				">" => a > b,
				"<" => a < b,
				">=" => a >= b,
				_ => a <= b,
			},
			_ => match op {
				">" => left > right,
				"<" => left < right,
				">=" => left >= right,
				_ => left <= right,
			},
		},
		"+" | "-" | "*" | "/" => {
			let (Some(a), Some(b)) = (parse_number(left), parse_number(right)) else {
				return false;
			};
			let result = match op {
				"+" => a + b,
				"-" => a - b,
				"*" => a * b,
				_ => a / b,
			};
			!approx_eq!(f64, result, 0.0)
		}
		_ => false,
	}
}
