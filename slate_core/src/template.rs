use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::engine::render_nodes;
use crate::error::SlateError;
use crate::error::SlateResult;
use crate::eval::Dict;
use crate::eval::Environment;
use crate::filters::FilterRegistry;
use crate::parser::Node;
use crate::parser::parse;

/// A compiled template together with its environment and filter registry.
///
/// The source is lexed and parsed exactly once, at construction; `render`
/// walks the compiled program and can be called any number of times. The
/// environment and the registry are plain mutable state with no internal
/// locking — concurrent mutation of one instance needs external
/// synchronization, while independent instances (or read-only concurrent
/// renders) are safe.
///
/// ```rust
/// use slate_core::Template;
///
/// let mut template = Template::new("Hello {{ name }}!", "greeting");
/// template.set("name", "World");
/// assert_eq!(template.render(), "Hello World!");
/// ```
#[derive(Debug)]
pub struct Template {
	label: String,
	program: Vec<Node>,
	vars: HashMap<String, String>,
	lists: HashMap<String, Vec<String>>,
	dicts: HashMap<String, Dict>,
	filters: FilterRegistry,
}

impl Template {
	/// Compile a template from source text. Compilation never fails;
	/// malformed constructs degrade to skipped or literal output at
	/// render time.
	pub fn new(source: impl AsRef<str>, label: impl Into<String>) -> Self {
		let label = label.into();
		let program = parse(source.as_ref());
		debug!(label = %label, nodes = program.len(), "compiled template");

		Self {
			label,
			program,
			vars: HashMap::new(),
			lists: HashMap::new(),
			dicts: HashMap::new(),
			filters: FilterRegistry::default(),
		}
	}

	/// Read and compile a template file, labeling the template with its
	/// path.
	pub fn from_file(path: impl AsRef<Path>) -> SlateResult<Self> {
		let path = path.as_ref();
		Self::from_file_with_label(path, path.display().to_string())
	}

	/// Read and compile a template file with an explicit label.
	pub fn from_file_with_label(
		path: impl AsRef<Path>,
		label: impl Into<String>,
	) -> SlateResult<Self> {
		let path = path.as_ref();
		let source = fs::read_to_string(path).map_err(|source| {
			SlateError::TemplateLoad {
				path: path.display().to_string(),
				source,
			}
		})?;

		Ok(Self::new(source, label))
	}

	/// The identifying label supplied at construction.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Bind a variable, silently replacing any existing binding.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.vars.insert(key.into(), value.into());
		self
	}

	/// Bind a list. Loops iterate it in order; interpolating its name
	/// yields its length.
	pub fn set_list(
		&mut self,
		key: impl Into<String>,
		values: impl IntoIterator<Item = impl Into<String>>,
	) -> &mut Self {
		self.lists
			.insert(key.into(), values.into_iter().map(Into::into).collect());
		self
	}

	/// Bind a dictionary, reachable through dotted identifiers.
	pub fn set_dict(&mut self, name: impl Into<String>, dict: impl Into<Dict>) -> &mut Self {
		self.dicts.insert(name.into(), dict.into());
		self
	}

	/// Register a custom filter. Custom filters are consulted before
	/// built-ins, so an existing name is overridden.
	pub fn add_filter(
		&mut self,
		name: impl Into<String>,
		filter: impl Fn(&str, &[String]) -> String + 'static,
	) -> &mut Self {
		self.filters.register(name, filter);
		self
	}

	/// Drop all variable, list and dictionary bindings. The compiled
	/// program and the filter registry survive.
	pub fn clear(&mut self) {
		self.vars.clear();
		self.lists.clear();
		self.dicts.clear();
	}

	/// Render against the current environment. Deterministic for a fixed
	/// environment, repeatable, and never fails.
	pub fn render(&self) -> String {
		let started = Instant::now();
		let env = Environment {
			vars: &self.vars,
			lists: &self.lists,
			dicts: &self.dicts,
		};

		let mut output = String::new();
		render_nodes(&self.program, &env, &self.filters, &mut output);

		debug!(
			label = %self.label,
			vars = self.vars.len(),
			lists = self.lists.len(),
			dicts = self.dicts.len(),
			elapsed_us = started.elapsed().as_micros() as u64,
			"rendered template"
		);

		output
	}

	/// Render and write the output to `path`.
	pub fn render_to_file(&self, path: impl AsRef<Path>) -> SlateResult<()> {
		let path = path.as_ref();
		let content = self.render();

		fs::write(path, content).map_err(|source| {
			SlateError::TemplateWrite {
				path: path.display().to_string(),
				source,
			}
		})
	}
}
