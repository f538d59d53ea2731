use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::lexer::tokenize;
use crate::tokens::Token;

/// A node of a compiled template program.
///
/// The parser walks the flat token sequence once and produces these nodes,
/// recursing into loop bodies and conditional branches through sub-slices
/// of the stream. Malformed constructs never fail the parse; they degrade
/// under a single recovery rule — produce no node for the construct and
/// advance a single token — so the leftover inside-tag tokens fall through
/// to statement level, where identifiers and operators are dropped and
/// whitespace renders verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
	/// Literal text emitted verbatim.
	Text(String),
	/// `{{ name | filter arg ... }}`
	Interpolation {
		name: String,
		filters: Vec<FilterCall>,
	},
	/// `{{ cond ? consequent : alternative }}`
	Ternary {
		condition: String,
		when_true: Vec<TernaryPiece>,
		when_false: Vec<TernaryPiece>,
	},
	/// `{% if ... %} ... {% elsif ... %} ... {% else %} ... {% endif %}`
	If { branches: Vec<Branch> },
	/// `{% for item in list %} ... {% endfor %}`
	For {
		binding: String,
		list: String,
		body: Vec<Node>,
	},
}

/// One filter invocation in a pipeline: a name plus positional arguments
/// captured as literal token text. Arguments are whatever string, number,
/// identifier or boolean tokens follow the name, with `:` accepted as a
/// delimiter between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCall {
	pub name: String,
	pub args: Vec<String>,
}

/// A fragment of a ternary arm. Arms are emitted by raw concatenation, not
/// a recursive render: no filters, no escaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TernaryPiece {
	/// An identifier looked up in `vars` at render time.
	Var(String),
	/// Literal token text.
	Text(String),
}

/// One `if`/`elsif` branch: its condition clauses and body. An `else`
/// branch carries no clauses and always matches when reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
	pub clauses: Vec<Clause>,
	pub body: Vec<Node>,
}

/// A single condition clause of an `if` tag. Clauses combine left to
/// right: `join` names the logic operator between this clause and the
/// next, and `negated` flips this clause's own result after any filters
/// have been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
	pub negated: bool,
	pub left: Operand,
	pub filters: Vec<FilterCall>,
	pub op: Option<String>,
	pub right: Option<Operand>,
	pub join: Option<Join>,
}

/// Logic operator joining two adjacent condition clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Join {
	And,
	Or,
}

/// A condition operand together with its lexical kind. Literal kinds
/// resolve to their text verbatim; identifiers resolve through the
/// environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
	pub text: String,
	pub kind: OperandKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
	Ident,
	Str,
	Number,
	Bool,
}

/// Lex and parse template source into a program. Parsing never fails.
pub fn parse(source: impl AsRef<str>) -> Vec<Node> {
	let tokens = tokenize(source.as_ref());
	parse_tokens(&tokens)
}

pub(crate) fn parse_tokens(tokens: &[Token]) -> Vec<Node> {
	let mut nodes = Vec::new();
	let mut i = 0;

	while i < tokens.len() {
		match &tokens[i] {
			Token::Text(text) => {
				nodes.push(Node::Text(text.clone()));
				i += 1;
			}
			Token::Whitespace(ws) => {
				// Stranded inside-tag whitespace renders verbatim.
				nodes.push(Node::Text(ws.clone()));
				i += 1;
			}
			Token::CommentOpen => {
				i = skip_comment(tokens, i + 1);
			}
			Token::VarOpen => {
				if let Some((node, next)) = parse_variable(tokens, i) {
					nodes.push(node);
					i = next;
				} else {
					trace!(index = i, "malformed variable block, advancing one token");
					i += 1;
				}
			}
			Token::TagOpen => {
				if let Some((node, next)) = parse_tag(tokens, i) {
					nodes.push(node);
					i = next;
				} else {
					trace!(index = i, "malformed tag, advancing one token");
					i += 1;
				}
			}
			_ => i += 1,
		}
	}

	nodes
}

fn skip_comment(tokens: &[Token], mut i: usize) -> usize {
	while i < tokens.len() {
		if matches!(tokens[i], Token::CommentClose) {
			return i + 1;
		}
		i += 1;
	}
	i
}

fn skip_ws(tokens: &[Token], mut i: usize) -> usize {
	while matches!(tokens.get(i), Some(Token::Whitespace(_))) {
		i += 1;
	}
	i
}

/// Parse a `{{ ... }}` block starting at its `VarOpen`.
fn parse_variable(tokens: &[Token], open: usize) -> Option<(Node, usize)> {
	let j = skip_ws(tokens, open + 1);
	let Some(Token::Ident(name)) = tokens.get(j) else {
		return None;
	};
	let name = name.clone();
	let j = skip_ws(tokens, j + 1);

	if matches!(tokens.get(j), Some(Token::Operator(op)) if op == "?") {
		return parse_ternary(tokens, name, j + 1);
	}

	let (filters, j) = parse_filter_chain(tokens, j);

	if matches!(tokens.get(j), Some(Token::VarClose)) {
		Some((Node::Interpolation { name, filters }, j + 1))
	} else {
		None
	}
}

/// Parse the ternary tail of a variable block. `start` is the index just
/// past the `?` operator.
fn parse_ternary(tokens: &[Token], condition: String, start: usize) -> Option<(Node, usize)> {
	let close = find_var_close(tokens, start)?;
	let colon = find_ternary_colon(tokens, start)?;

	if colon >= close {
		return None;
	}

	let when_true = ternary_pieces(&tokens[start..colon]);
	let when_false = ternary_pieces(&tokens[colon + 1..close]);

	Some((
		Node::Ternary {
			condition,
			when_true,
			when_false,
		},
		close + 1,
	))
}

/// Locate the first top-level `:` operator before the closing `}}`. Depth
/// is tracked through parens and brackets appearing in literal text tokens
/// only.
fn find_ternary_colon(tokens: &[Token], mut i: usize) -> Option<usize> {
	let mut paren_depth = 0i32;
	let mut bracket_depth = 0i32;

	while i < tokens.len() {
		match &tokens[i] {
			Token::VarClose => break,
			Token::Operator(op) if op == ":" && paren_depth == 0 && bracket_depth == 0 => {
				return Some(i);
			}
			Token::Text(text) => {
				for ch in text.chars() {
					match ch {
						'(' => paren_depth += 1,
						')' => paren_depth -= 1,
						'[' => bracket_depth += 1,
						']' => bracket_depth -= 1,
						_ => {}
					}
				}
			}
			_ => {}
		}
		i += 1;
	}

	None
}

fn find_var_close(tokens: &[Token], mut i: usize) -> Option<usize> {
	while i < tokens.len() {
		if matches!(tokens[i], Token::VarClose) {
			return Some(i);
		}
		i += 1;
	}
	None
}

fn ternary_pieces(tokens: &[Token]) -> Vec<TernaryPiece> {
	let mut pieces = Vec::new();

	for token in tokens {
		match token {
			Token::Ident(name) => pieces.push(TernaryPiece::Var(name.clone())),
			Token::Str(value)
			| Token::Number(value)
			| Token::Bool(value)
			| Token::Whitespace(value)
			| Token::Text(value) => pieces.push(TernaryPiece::Text(value.clone())),
			_ => {}
		}
	}

	pieces
}

/// Parse a pipeline of filters starting at a possible `|` token.
fn parse_filter_chain(tokens: &[Token], mut j: usize) -> (Vec<FilterCall>, usize) {
	let mut filters = Vec::new();

	while matches!(tokens.get(j), Some(Token::Pipe)) {
		j = skip_ws(tokens, j + 1);
		if let Some(Token::Ident(name)) = tokens.get(j) {
			let name = name.clone();
			j = skip_ws(tokens, j + 1);
			let (args, next) = parse_filter_args(tokens, j);
			j = next;
			filters.push(FilterCall { name, args });
		}
	}

	(filters, j)
}

/// Collect positional filter arguments: consecutive string, number,
/// identifier or boolean tokens, with `:` accepted as a delimiter.
fn parse_filter_args(tokens: &[Token], mut j: usize) -> (Vec<String>, usize) {
	let mut args = Vec::new();

	loop {
		match tokens.get(j) {
			Some(Token::Operator(op)) if op == ":" => {
				j = skip_ws(tokens, j + 1);
			}
			Some(token @ (Token::Str(_) | Token::Number(_) | Token::Ident(_) | Token::Bool(_))) => {
				args.push(token.text().to_string());
				j = skip_ws(tokens, j + 1);
			}
			_ => break,
		}
	}

	(args, j)
}

/// Parse a `{% ... %}` block starting at its `TagOpen`. Only `for` and
/// `if` open a block; every other keyword is malformed here.
fn parse_tag(tokens: &[Token], open: usize) -> Option<(Node, usize)> {
	let j = skip_ws(tokens, open + 1);
	let Some(Token::Ident(keyword)) = tokens.get(j) else {
		return None;
	};

	match keyword.as_str() {
		"for" => parse_for(tokens, j + 1),
		"if" => parse_if(tokens, j + 1),
		_ => None,
	}
}

/// Parse a `for` block. The header grammar is exact: `for <ident> in
/// <ident> %}` — any deviation makes the tag malformed.
fn parse_for(tokens: &[Token], after_keyword: usize) -> Option<(Node, usize)> {
	let j = skip_ws(tokens, after_keyword);
	let Some(Token::Ident(binding)) = tokens.get(j) else {
		return None;
	};
	let binding = binding.clone();

	let j = skip_ws(tokens, j + 1);
	if !matches!(tokens.get(j), Some(Token::Ident(word)) if word == "in") {
		return None;
	}

	let j = skip_ws(tokens, j + 1);
	let Some(Token::Ident(list)) = tokens.get(j) else {
		return None;
	};
	let list = list.clone();

	let j = skip_ws(tokens, j + 1);
	if !matches!(tokens.get(j), Some(Token::TagClose)) {
		return None;
	}

	let body_start = j + 1;
	let end_tag = find_matching_endfor(tokens, body_start)?;
	let body = parse_tokens(&tokens[body_start..end_tag]);
	let next = consume_tag(tokens, end_tag);

	Some((
		Node::For {
			binding,
			list,
			body,
		},
		next,
	))
}

/// Find the `{%` of the `endfor` matching this loop. Nesting counts `for`
/// and `endfor` tags only; `if`/`endif` pairs are invisible to it.
fn find_matching_endfor(tokens: &[Token], mut i: usize) -> Option<usize> {
	let mut nested = 0u32;

	while i < tokens.len() {
		if matches!(tokens[i], Token::TagOpen) {
			let peek = skip_ws(tokens, i + 1);
			if let Some(Token::Ident(word)) = tokens.get(peek) {
				if word == "for" {
					nested += 1;
				} else if word == "endfor" {
					if nested == 0 {
						return Some(i);
					}
					nested -= 1;
				}
			}
		}
		i += 1;
	}

	None
}

/// Advance past a `{% word %}` tag starting at its `{%`, returning the
/// index after its `%}` (or the end of input when the close is missing).
fn consume_tag(tokens: &[Token], open: usize) -> usize {
	let mut i = open + 1;
	while i < tokens.len() {
		if matches!(tokens[i], Token::TagClose) {
			return i + 1;
		}
		i += 1;
	}
	i
}

/// Parse an `if` block: the opening clause list, then the branch bodies
/// split at top-level `elsif`/`elseif`/`else` tags. Nesting counts
/// `if`/`endif` tags, so a nested `if` never triggers a split. A missing
/// `endif` bounds the final branch at end of input.
fn parse_if(tokens: &[Token], after_keyword: usize) -> Option<(Node, usize)> {
	let (first_clauses, body_start) = parse_clauses(tokens, after_keyword)?;
	if first_clauses.is_empty() {
		return None;
	}

	let mut branches: Vec<Branch> = Vec::new();
	let mut clauses = first_clauses;
	let mut start = body_start;
	let mut cursor = body_start;
	let mut nested = 0u32;

	while cursor < tokens.len() {
		if !matches!(tokens[cursor], Token::TagOpen) {
			cursor += 1;
			continue;
		}
		let peek = skip_ws(tokens, cursor + 1);
		let Some(Token::Ident(word)) = tokens.get(peek) else {
			cursor += 1;
			continue;
		};

		match word.as_str() {
			"if" => {
				nested += 1;
				cursor += 1;
			}
			"endif" => {
				if nested == 0 {
					branches.push(Branch {
						clauses: std::mem::take(&mut clauses),
						body: parse_tokens(&tokens[start..cursor]),
					});
					let next = consume_tag(tokens, cursor);
					return Some((Node::If { branches }, next));
				}
				nested -= 1;
				cursor += 1;
			}
			"elsif" | "elseif" if nested == 0 => {
				match parse_clauses(tokens, peek + 1) {
					Some((branch_clauses, after)) if !branch_clauses.is_empty() => {
						branches.push(Branch {
							clauses: std::mem::take(&mut clauses),
							body: parse_tokens(&tokens[start..cursor]),
						});
						clauses = branch_clauses;
						start = after;
						cursor = after;
					}
					_ => {
						// Malformed header: its tokens stay in the current
						// branch body and degrade there.
						cursor += 1;
					}
				}
			}
			"else" if nested == 0 => {
				let after = skip_ws(tokens, peek + 1);
				if matches!(tokens.get(after), Some(Token::TagClose)) {
					branches.push(Branch {
						clauses: std::mem::take(&mut clauses),
						body: parse_tokens(&tokens[start..cursor]),
					});
					clauses = Vec::new();
					start = after + 1;
					cursor = after + 1;
				} else {
					cursor += 1;
				}
			}
			_ => cursor += 1,
		}
	}

	branches.push(Branch {
		clauses,
		body: parse_tokens(&tokens[start..]),
	});

	Some((Node::If { branches }, tokens.len()))
}

/// Parse a condition clause list, returning the clauses and the index just
/// past the closing `%}`. `None` when the list is not terminated by `%}`.
fn parse_clauses(tokens: &[Token], from: usize) -> Option<(Vec<Clause>, usize)> {
	let mut clauses = Vec::new();
	let mut j = skip_ws(tokens, from);

	loop {
		let mut negated = false;
		if matches!(tokens.get(j), Some(Token::Ident(word)) if word == "not") {
			negated = true;
			j = skip_ws(tokens, j + 1);
		}

		let Some(left) = operand_at(tokens, j) else {
			break;
		};
		j = skip_ws(tokens, j + 1);

		let (filters, after_filters) = parse_filter_chain(tokens, j);
		j = after_filters;

		let mut op = None;
		let mut right = None;
		if let Some(Token::Operator(op_text)) = tokens.get(j) {
			op = Some(op_text.clone());
			j = skip_ws(tokens, j + 1);
			if let Some(operand) = operand_at(tokens, j) {
				right = Some(operand);
				j = skip_ws(tokens, j + 1);
			}
		}

		let mut join = None;
		if let Some(Token::Ident(word)) = tokens.get(j) {
			if word == "and" {
				join = Some(Join::And);
				j = skip_ws(tokens, j + 1);
			} else if word == "or" {
				join = Some(Join::Or);
				j = skip_ws(tokens, j + 1);
			}
		}

		clauses.push(Clause {
			negated,
			left,
			filters,
			op,
			right,
			join,
		});

		if j >= tokens.len() || matches!(tokens.get(j), Some(Token::TagClose)) {
			break;
		}
	}

	if matches!(tokens.get(j), Some(Token::TagClose)) {
		Some((clauses, j + 1))
	} else {
		None
	}
}

fn operand_at(tokens: &[Token], i: usize) -> Option<Operand> {
	match tokens.get(i)? {
		Token::Ident(text) => Some(Operand {
			text: text.clone(),
			kind: OperandKind::Ident,
		}),
		Token::Str(text) => Some(Operand {
			text: text.clone(),
			kind: OperandKind::Str,
		}),
		Token::Number(text) => Some(Operand {
			text: text.clone(),
			kind: OperandKind::Number,
		}),
		Token::Bool(text) => Some(Operand {
			text: text.clone(),
			kind: OperandKind::Bool,
		}),
		_ => None,
	}
}
