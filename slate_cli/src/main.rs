use std::path::Path;
use std::process;

use clap::Parser;
use slate_cli::Commands;
use slate_cli::SlateCli;
use slate_core::AnyEmptyResult;
use slate_core::Dict;
use slate_core::Template;
use tracing_subscriber::EnvFilter;

fn main() {
	let cli = SlateCli::parse();

	// Engine diagnostics go to stderr, opt-in via SLATE_LOG (e.g.
	// SLATE_LOG=slate_core=debug); rendered output stays on stdout.
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_env("SLATE_LOG"))
		.with_writer(std::io::stderr)
		.init();

	let result = match cli.command {
		Some(Commands::Render {
			template,
			set,
			list,
			data,
			output,
		}) => run_render(&template, &set, &list, data.as_deref(), output.as_deref()),
		None => {
			eprintln!("No subcommand specified. Run `slate --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render engine errors through miette for diagnostic codes and
		// help text.
		match e.downcast::<slate_core::SlateError>() {
			Ok(slate_err) => {
				let report: miette::Report = (*slate_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("error: {e}");
			}
		}
		process::exit(2);
	}
}

fn run_render(
	template_path: &Path,
	sets: &[String],
	lists: &[String],
	data: Option<&Path>,
	output: Option<&Path>,
) -> AnyEmptyResult {
	let mut template = Template::from_file(template_path)?;

	if let Some(path) = data {
		load_data_file(&mut template, path)?;
	}

	for binding in sets {
		let Some((key, value)) = binding.split_once('=') else {
			return Err(format!("invalid --set binding `{binding}`, expected KEY=VALUE").into());
		};
		template.set(key, value);
	}

	for binding in lists {
		let Some((key, values)) = binding.split_once('=') else {
			return Err(format!("invalid --list binding `{binding}`, expected KEY=A,B,C").into());
		};
		template.set_list(key, values.split(','));
	}

	match output {
		Some(path) => template.render_to_file(path)?,
		None => print!("{}", template.render()),
	}

	Ok(())
}

/// A TOML data file populates the environment: top-level scalars become
/// variables, arrays become lists, and tables become dictionaries.
fn load_data_file(template: &mut Template, path: &Path) -> AnyEmptyResult {
	let content = std::fs::read_to_string(path)
		.map_err(|e| format!("could not read data file `{}`: {e}", path.display()))?;
	let table: toml::Table = content
		.parse()
		.map_err(|e| format!("could not parse data file `{}`: {e}", path.display()))?;

	for (key, value) in table {
		match value {
			toml::Value::Array(values) => {
				template.set_list(key, values.iter().map(toml_to_string));
			}
			toml::Value::Table(entries) => {
				let dict: Dict = entries
					.iter()
					.map(|(entry_key, entry_value)| {
						(entry_key.clone(), toml_to_string(entry_value))
					})
					.collect();
				template.set_dict(key, dict);
			}
			other => {
				template.set(key, toml_to_string(&other));
			}
		}
	}

	Ok(())
}

/// Strings drop their quotes; every other scalar keeps its TOML display
/// form.
fn toml_to_string(value: &toml::Value) -> String {
	match value {
		toml::Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
