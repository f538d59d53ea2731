use std::time::Instant;

use logos::Logos;
use tracing::debug;

use crate::tokens::Token;

/// Raw tokens produced by logos for the inside-tag grammar. Delimiters are
/// located by the outer scan, so the spans handed to logos never contain
/// them.
#[derive(Logos, Debug, PartialEq)]
enum RawToken {
	#[token("|")]
	Pipe,
	#[regex(r"[ \t\r\n\x0b\x0c]+")]
	Whitespace,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\.)*'")]
	SingleQuotedString,
	#[regex(r"[0-9]+(\.[0-9]+)?")]
	Number,
	#[token("true", priority = 10)]
	#[token("false", priority = 10)]
	Boolean,
	#[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*")]
	Ident,
	#[regex(r"[><=!+\-*/?:]=?")]
	Operator,
}

/// The five delimiter digraphs. Close delimiters are recognized wherever
/// they appear, even outside a tag; the renderer ignores stray closers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
	CommentOpen,
	TagOpen,
	VarOpen,
	TagClose,
	VarClose,
}

const DELIMITERS: [(&[u8; 2], Delimiter); 5] = [
	(b"{#", Delimiter::CommentOpen),
	(b"{%", Delimiter::TagOpen),
	(b"{{", Delimiter::VarOpen),
	(b"%}", Delimiter::TagClose),
	(b"}}", Delimiter::VarClose),
];

/// Tokenize template source in one pass. Tokenization never fails:
/// unrecognized inside-tag bytes produce no token, and an unmatched open
/// delimiter leaves the tokens already produced intact.
pub(crate) fn tokenize(source: &str) -> Vec<Token> {
	let started = Instant::now();
	let bytes = source.as_bytes();
	let mut tokens = Vec::new();
	let mut pos = 0;
	let mut inside_tag = false;

	while pos < bytes.len() {
		let found = if inside_tag {
			find_delimiter_quote_aware(bytes, pos)
		} else {
			find_delimiter(bytes, pos)
		};

		let Some((at, delimiter)) = found else {
			if inside_tag {
				lex_span(&source[pos..], &mut tokens);
			} else {
				tokens.push(Token::Text(source[pos..].to_string()));
			}
			break;
		};

		if at > pos {
			if inside_tag {
				lex_span(&source[pos..at], &mut tokens);
			} else {
				tokens.push(Token::Text(source[pos..at].to_string()));
			}
		}
		pos = at + 2;

		match delimiter {
			Delimiter::CommentOpen => {
				tokens.push(Token::CommentOpen);
				// The comment body is consumed and discarded at lex time.
				match memstr(bytes, b"#}", pos) {
					Some(close) => {
						tokens.push(Token::CommentClose);
						pos = close + 2;
					}
					None => pos = bytes.len(),
				}
			}
			Delimiter::TagOpen => {
				tokens.push(Token::TagOpen);
				inside_tag = true;
			}
			Delimiter::VarOpen => {
				tokens.push(Token::VarOpen);
				inside_tag = true;
			}
			Delimiter::TagClose => {
				tokens.push(Token::TagClose);
				inside_tag = false;
			}
			Delimiter::VarClose => {
				tokens.push(Token::VarClose);
				inside_tag = false;
			}
		}
	}

	debug!(
		tokens = tokens.len(),
		elapsed_us = started.elapsed().as_micros() as u64,
		"tokenized template source"
	);

	tokens
}

/// Run the logos grammar over an inside-tag span, appending the resulting
/// tokens. Unrecognized bytes are dropped.
fn lex_span(span: &str, tokens: &mut Vec<Token>) {
	for (result, range) in RawToken::lexer(span).spanned() {
		let slice = &span[range];
		let Ok(raw) = result else {
			continue;
		};

		match raw {
			RawToken::Pipe => tokens.push(Token::Pipe),
			RawToken::Whitespace => tokens.push(Token::Whitespace(slice.to_string())),
			RawToken::DoubleQuotedString | RawToken::SingleQuotedString => {
				tokens.push(Token::Str(unescape(&slice[1..slice.len() - 1])));
			}
			RawToken::Number => tokens.push(Token::Number(slice.to_string())),
			RawToken::Boolean => tokens.push(Token::Bool(slice.to_string())),
			RawToken::Ident => tokens.push(Token::Ident(slice.to_string())),
			RawToken::Operator => tokens.push(Token::Operator(slice.to_string())),
		}
	}
}

/// Strip backslash escapes: the backslash is dropped and the following
/// character kept verbatim.
fn unescape(inner: &str) -> String {
	let mut unescaped = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(ch) = chars.next() {
		if ch == '\\' {
			if let Some(escaped) = chars.next() {
				unescaped.push(escaped);
			}
		} else {
			unescaped.push(ch);
		}
	}

	unescaped
}

/// Find `needle` in `haystack` starting at `from`.
pub(crate) fn memstr(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
	if from > haystack.len() {
		return None;
	}

	haystack[from..]
		.windows(needle.len())
		.position(|window| window == needle)
		.map(|position| position + from)
}

/// Earliest delimiter digraph at or after `from`.
fn find_delimiter(src: &[u8], from: usize) -> Option<(usize, Delimiter)> {
	let mut best: Option<(usize, Delimiter)> = None;

	for (pattern, delimiter) in DELIMITERS {
		if let Some(at) = memstr(src, pattern, from) {
			if best.is_none_or(|(current, _)| at < current) {
				best = Some((at, delimiter));
			}
		}
	}

	best
}

/// Earliest delimiter digraph at or after `from`, skipping delimiters that
/// sit inside a quoted string. Inside a tag a quote opens a string literal,
/// so `{{ x | default:"}}" }}` closes at the final digraph.
fn find_delimiter_quote_aware(src: &[u8], from: usize) -> Option<(usize, Delimiter)> {
	let mut i = from;
	let mut quote: Option<u8> = None;

	while i < src.len() {
		let byte = src[i];

		if let Some(open) = quote {
			if byte == b'\\' && i + 1 < src.len() {
				i += 2;
				continue;
			}
			if byte == open {
				quote = None;
			}
			i += 1;
			continue;
		}

		if byte == b'"' || byte == b'\'' {
			quote = Some(byte);
			i += 1;
			continue;
		}

		if i + 1 < src.len() {
			let digraph = [byte, src[i + 1]];
			for (pattern, delimiter) in DELIMITERS {
				if &digraph == pattern {
					return Some((i, delimiter));
				}
			}
		}

		i += 1;
	}

	None
}
