use crate::eval::Environment;
use crate::eval::bool_str;
use crate::eval::evaluate_clauses;
use crate::eval::lookup;
use crate::eval::truthy;
use crate::filters::FilterRegistry;
use crate::filters::html_escape;
use crate::parser::FilterCall;
use crate::parser::Node;
use crate::parser::TernaryPiece;

/// Render a parsed program against an environment, appending to `output`.
/// Rendering never fails: every malformed or unresolvable construct has
/// already been degraded by the parser or contributes nothing here.
pub(crate) fn render_nodes(
	nodes: &[Node],
	env: &Environment<'_>,
	registry: &FilterRegistry,
	output: &mut String,
) {
	for node in nodes {
		match node {
			Node::Text(text) => output.push_str(text),
			Node::Interpolation { name, filters } => {
				render_interpolation(name, filters, env, registry, output);
			}
			Node::Ternary {
				condition,
				when_true,
				when_false,
			} => {
				let value = lookup(condition, env).unwrap_or_default();
				let arm = if truthy(&value) { when_true } else { when_false };
				output.push_str(extract_arm(arm, env).trim());
			}
			Node::If { branches } => {
				for branch in branches {
					if branch.clauses.is_empty()
						|| evaluate_clauses(&branch.clauses, env, registry)
					{
						render_nodes(&branch.body, env, registry, output);
						break;
					}
				}
			}
			Node::For {
				binding,
				list,
				body,
			} => render_for(binding, list, body, env, registry, output),
		}
	}
}

/// A variable block. An identifier the environment knows nothing about
/// contributes nothing at all — no filters run, no empty string is
/// emitted. Resolved values pass through the filter chain and are then
/// HTML-escaped unless a chain member suppresses escaping.
fn render_interpolation(
	name: &str,
	filters: &[FilterCall],
	env: &Environment<'_>,
	registry: &FilterRegistry,
	output: &mut String,
) {
	let Some(mut value) = lookup(name, env) else {
		return;
	};

	let mut escape = true;
	for filter in filters {
		if FilterRegistry::suppresses_escape(&filter.name) {
			escape = false;
		}
		value = registry.apply(&value, &filter.name, &filter.args);
	}

	if escape {
		value = html_escape(&value);
	}
	output.push_str(&value);
}

/// Ternary arms concatenate raw token text. Identifiers look up `vars`
/// only; an unknown identifier contributes nothing.
fn extract_arm(pieces: &[TernaryPiece], env: &Environment<'_>) -> String {
	let mut text = String::new();
	for piece in pieces {
		match piece {
			TernaryPiece::Var(name) => {
				if let Some(value) = env.vars.get(name) {
					text.push_str(value);
				}
			}
			TernaryPiece::Text(value) => text.push_str(value),
		}
	}
	text
}

/// One iteration per list element, each against a shadow copy of `vars`
/// carrying the loop metadata. A name that is not a known list renders
/// nothing.
fn render_for(
	binding: &str,
	list: &str,
	body: &[Node],
	env: &Environment<'_>,
	registry: &FilterRegistry,
	output: &mut String,
) {
	let Some(items) = env.lists.get(list) else {
		return;
	};
	let length = items.len();

	for (index, item) in items.iter().enumerate() {
		let mut shadow = env.vars.clone();
		shadow.insert(binding.to_string(), item.clone());
		shadow.insert("loop_index".to_string(), (index + 1).to_string());
		shadow.insert("loop_index0".to_string(), index.to_string());
		shadow.insert("loop_first".to_string(), bool_str(index == 0).to_string());
		shadow.insert(
			"loop_last".to_string(),
			bool_str(index + 1 == length).to_string(),
		);
		shadow.insert("loop_length".to_string(), length.to_string());
		shadow.insert(
			"loop_even".to_string(),
			bool_str((index + 1) % 2 == 0).to_string(),
		);
		shadow.insert(
			"loop_odd".to_string(),
			bool_str((index + 1) % 2 == 1).to_string(),
		);

		let frame = Environment {
			vars: &shadow,
			lists: env.lists,
			dicts: env.dicts,
		};
		render_nodes(body, &frame, registry, output);
	}
}
