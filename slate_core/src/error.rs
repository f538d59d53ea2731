use miette::Diagnostic;
use thiserror::Error;

/// Fatal errors. Only resource access fails loudly: template-syntax
/// irregularities and missing bindings are recovered silently during
/// rendering and never surface here.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SlateError {
	#[error("could not open template file: `{path}`")]
	#[diagnostic(
		code(slate::template_load),
		help("check that the path exists and is readable")
	)]
	TemplateLoad {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("could not write rendered output to: `{path}`")]
	#[diagnostic(
		code(slate::template_write),
		help("check that the destination directory exists and is writable")
	)]
	TemplateWrite {
		path: String,
		#[source]
		source: std::io::Error,
	},
}

pub type SlateResult<T> = Result<T, SlateError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
