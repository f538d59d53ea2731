use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render slate templates from the command line.",
	long_about = "slate is a small, resilient text-templating engine.\n\nTemplates interpolate \
	              variables with filter pipelines ({{ name | upper }}), branch with \
	              {% if %}/{% elsif %}/{% else %}, loop with {% for item in list %}, and comment \
	              with {# ... #}. Malformed template fragments degrade to skipped or literal \
	              output instead of failing the render.\n\nQuick start:\n  slate render page.tpl \
	              --set name=World\n  slate render page.tpl --data site.toml -o page.html"
)]
pub struct SlateCli {
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template file against an environment built from flags.
	///
	/// Variables come from repeated `--set` flags, lists from `--list`,
	/// and a TOML `--data` file contributes variables (top-level scalars),
	/// lists (arrays) and dictionaries (tables). Flags are applied after
	/// the data file, so they override it.
	Render {
		/// Path to the template file.
		template: PathBuf,

		/// Bind a variable: `--set name=World`. Repeatable.
		#[arg(long, value_name = "KEY=VALUE")]
		set: Vec<String>,

		/// Bind a list: `--list items=a,b,c`. Repeatable.
		#[arg(long, value_name = "KEY=A,B,C")]
		list: Vec<String>,

		/// Load variables, lists and dictionaries from a TOML file.
		#[arg(long, value_name = "FILE")]
		data: Option<PathBuf>,

		/// Write the rendered output to a file instead of stdout.
		#[arg(long, short, value_name = "FILE")]
		output: Option<PathBuf>,
	},
}
