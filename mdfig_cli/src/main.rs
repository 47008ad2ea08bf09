use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use mdfig_cli::ActionArg;
use mdfig_cli::MdfigCli;
use mdfig_cli::OutputFormat;
use mdfig_core::API_KEY_ENV;
use mdfig_core::Action;
use mdfig_core::ArtifactNamer;
use mdfig_core::BlockOutcome;
use mdfig_core::DEFAULT_DST_DIR;
use mdfig_core::Dispatcher;
use mdfig_core::DocumentReport;
use mdfig_core::FileJob;
use mdfig_core::Hosting;
use mdfig_core::MdfigConfig;
use mdfig_core::MdfigError;
use mdfig_core::RenderContext;
use mdfig_core::RenderOptions;
use mdfig_core::RunSummary;
use mdfig_core::find_git_root;
use mdfig_core::inputs::WalkOptions;
use mdfig_core::inputs::read_file_list;
use mdfig_core::inputs::resolve_inputs;
use mdfig_core::namer::absolute;
use mdfig_core::run;
use mdfig_core::viewer::launch_viewer;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = MdfigCli::parse();

	// Respect NO_COLOR env var and --no_color flag.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	match run_cli(&args) {
		Ok(code) => process::exit(code),
		Err(e) => {
			match e.downcast::<MdfigError>() {
				Ok(mdfig_err) => {
					let report: miette::Report = (*mdfig_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_env("MDFIG_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| EnvFilter::new(default_level));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_ansi(use_color)
		.try_init();
}

fn current_dir() -> PathBuf {
	std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn load_config(args: &MdfigCli, root: &Path) -> Result<MdfigConfig, MdfigError> {
	match &args.config {
		Some(path) => MdfigConfig::load_file(path),
		None => Ok(MdfigConfig::load(root)?.unwrap_or_default()),
	}
}

/// Run the command and return the process exit code: `0` when everything
/// rendered, `1` when a block failed and `2` when a document could not be
/// processed at all.
fn run_cli(args: &MdfigCli) -> Result<i32, Box<dyn std::error::Error>> {
	let root = current_dir();
	let config = load_config(args, &root)?;

	let mut requested = args.input.clone();
	if let Some(list) = &args.files_from {
		requested.extend(read_file_list(list)?);
	}
	if requested.is_empty() {
		return Err(MdfigError::NoInputs.into());
	}

	let dst_dir = args.dst_dir.as_deref().map(absolute).or_else(|| config.dst_dir.clone());
	let walk = WalkOptions {
		exclude_patterns: config.exclude.patterns.clone(),
		artifact_dir: Some(
			dst_dir
				.as_deref()
				.and_then(Path::file_name)
				.map_or_else(
					|| DEFAULT_DST_DIR.to_string(),
					|name| name.to_string_lossy().into_owned(),
				),
		),
	};
	let documents = resolve_inputs(&requested, &walk)?;
	if documents.is_empty() {
		return Err(MdfigError::NoInputs.into());
	}
	if args.output.is_some() && documents.len() > 1 {
		return Err(MdfigError::OutputWithMultipleInputs(documents.len()).into());
	}

	let hosting = if args.use_github_hosting {
		let base_url = args
			.hosting_url
			.clone()
			.or_else(|| config.hosting.base_url.clone())
			.ok_or(MdfigError::MissingHostingUrl)?;
		let git_root = find_git_root(&root).unwrap_or_else(|| root.clone());
		Some(Hosting::new(base_url, git_root))
	} else {
		None
	};

	let api_key = args
		.api_key
		.clone()
		.or_else(|| std::env::var(API_KEY_ENV).ok());
	let action = Action::from(args.action);

	let ctx = RenderContext {
		dispatcher: Dispatcher::new(&config, api_key),
		namer: ArtifactNamer::new(dst_dir),
		options: RenderOptions {
			action,
			dry_run: args.dry_run,
			limit: args.limit,
			parallel: args.parallel,
			num_threads: args.num_threads.or(config.num_threads),
			hosting,
		},
	};

	let jobs: Vec<FileJob> = documents
		.into_iter()
		.map(|input| {
			let output = match (&args.output, args.action) {
				(Some(output), _) => Some(output.clone()),
				(None, ActionArg::Open) => Some(viewer_copy_path(&input, &root)),
				(None, _) => None,
			};
			FileJob { input, output }
		})
		.collect();

	let summary = run(&jobs, &ctx)?;

	match args.format {
		OutputFormat::Text => print_text_summary(&summary, &root, args.dry_run),
		OutputFormat::Json => print_json_summary(&summary, &root)?,
	}

	if action == Action::Open && !args.dry_run {
		for report in summary.documents.iter().filter(|report| report.written) {
			if let Err(e) = launch_viewer(config.viewer.as_deref(), &report.output) {
				eprintln!("{} failed to open viewer: {e}", colored!("warning:", yellow));
			}
		}
	}

	let failed = summary.failed();
	let has_errors = !summary.errors.is_empty();
	for file_error in summary.errors {
		let report: miette::Report = file_error.error.into();
		eprintln!("{report:?}");
	}

	Ok(if has_errors {
		2
	} else if failed > 0 {
		1
	} else {
		0
	})
}

/// Where the `open` action writes the rendered copy of `input`. The input's
/// directory is mirrored below `<tmp>/mdfig` so documents sharing a file name
/// get separate copies.
fn viewer_copy_path(input: &Path, root: &Path) -> PathBuf {
	let stem = input
		.file_stem()
		.map_or_else(|| "document".into(), |stem| stem.to_string_lossy());
	let ext = input
		.extension()
		.map_or_else(|| "md".into(), |ext| ext.to_string_lossy());
	let dir = input.parent().unwrap_or_else(|| Path::new(""));
	let mirrored: PathBuf = dir
		.strip_prefix(root)
		.unwrap_or(dir)
		.components()
		.filter(|component| matches!(component, Component::Normal(_)))
		.collect();

	std::env::temp_dir()
		.join("mdfig")
		.join(mirrored)
		.join(format!("{stem}.rendered.{ext}"))
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn print_document(report: &DocumentReport, root: &Path) {
	let input = make_relative(&report.input, root);

	for block in &report.blocks {
		let location = format!("{input}:{} [{} #{}]", block.line, block.language, block.index);
		match &block.outcome {
			BlockOutcome::Rendered { artifacts, .. } => {
				let paths: Vec<String> = artifacts
					.iter()
					.map(|artifact| make_relative(artifact, root))
					.collect();
				println!(
					"{} {location} -> {}",
					colored!("rendered", green),
					paths.join(", ")
				);
			}
			BlockOutcome::Removed { artifacts } => {
				println!(
					"{} {location} ({} image(s) deleted)",
					colored!("removed", green),
					artifacts.len()
				);
			}
			BlockOutcome::Skipped { reason } => {
				let paths: Vec<String> = block
					.targets
					.iter()
					.map(|target| make_relative(target, root))
					.collect();
				if paths.is_empty() {
					println!("{} {location} ({reason})", colored!("skipped", yellow));
				} else {
					println!(
						"{} {location} ({reason}) -> {}",
						colored!("skipped", yellow),
						paths.join(", ")
					);
				}
			}
			BlockOutcome::Failed { error, .. } => {
				println!("{} {location}: {error}", colored!("failed", red));
			}
		}
	}

	if report.written {
		println!("Updated {}", make_relative(&report.output, root));
	}
}

fn print_text_summary(summary: &RunSummary, root: &Path, dry_run: bool) {
	for report in &summary.documents {
		print_document(report, root);
	}

	let line = format!(
		"{} rendered, {} removed, {} skipped, {} failed in {} document(s)",
		summary.rendered(),
		summary.removed(),
		summary.skipped(),
		summary.failed(),
		summary.documents.len(),
	);
	println!();
	if summary.failed() > 0 || !summary.errors.is_empty() {
		println!("{}", colored!(line, red));
	} else {
		println!("{}", colored!(line, bold));
	}

	if dry_run {
		println!("Dry run: no images or documents were written.");
	}
}

fn print_json_summary(summary: &RunSummary, root: &Path) -> Result<(), serde_json::Error> {
	let errors: Vec<serde_json::Value> = summary
		.errors
		.iter()
		.map(|file_error| {
			serde_json::json!({
				"file": make_relative(&file_error.path, root),
				"message": file_error.error.to_string(),
			})
		})
		.collect();

	let output = serde_json::json!({
		"ok": summary.is_ok(),
		"rendered": summary.rendered(),
		"removed": summary.removed(),
		"skipped": summary.skipped(),
		"failed": summary.failed(),
		"documents": summary.documents,
		"errors": errors,
	});
	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}
