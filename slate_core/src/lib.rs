//! `slate_core` is the engine behind [slate](https://github.com/slate-rs/slate),
//! a small text-templating engine built for resilience: a malformed template
//! fragment degrades to skipped or literal output instead of failing the
//! render.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template source
//!   → Lexer (one pass, flat token sequence, inside-tag grammar via logos)
//!   → Parser (recursive descent over token sub-slices, explicit AST)
//!   → Engine (walks the AST per render call against the environment)
//! ```
//!
//! ## Syntax Surface
//!
//! - `{{ name }}`, `{{ name | filter "arg" }}` — interpolation with filter
//!   pipelines and automatic HTML escaping (suppressed by `raw`, `escape`,
//!   `url_encode` and `js_escape`).
//! - `{{ cond ? "yes" : "no" }}` — inline ternary.
//! - `{% if a > 5 and not b %} ... {% elsif c %} ... {% else %} ... {% endif %}`
//! - `{% for item in items %} ... {% endfor %}` with `loop_index`,
//!   `loop_first`, `loop_last` and friends.
//! - `{# never rendered #}`
//!
//! ## Key Types
//!
//! - [`Template`] — compile once, configure the environment, render many
//!   times.
//! - [`Dict`] — a flat dictionary reached through dotted identifiers.
//! - [`FilterRegistry`] — built-in and caller-registered filters.
//! - [`Node`] — the compiled program, exposed for inspection.
//! - [`SlateError`] — the only fatal errors: template file loading and
//!   rendered-output writing.
//!
//! ## Quick Start
//!
//! ```rust
//! use slate_core::Template;
//!
//! let mut template = Template::new(
//! 	"{% for name in guests %}Hi {{ name }}!{% endfor %}",
//! 	"greetings",
//! );
//! template.set_list("guests", ["Ada", "Grace"]);
//! assert_eq!(template.render(), "Hi Ada!Hi Grace!");
//! ```

pub use error::*;
pub use eval::*;
pub use filters::*;
pub use parser::*;
pub use template::*;

mod engine;
mod error;
mod eval;
mod filters;
pub(crate) mod lexer;
mod parser;
mod template;
pub(crate) mod tokens;

#[cfg(test)]
mod __fixtures;
