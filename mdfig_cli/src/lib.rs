use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use mdfig_core::Action;
use mdfig_core::BlockLimit;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render diagram fences in markdown and LaTeX documents into embedded images.",
	long_about = "mdfig scans documents for fenced blocks written in a diagram language \
	              (plantuml, mermaid, graphviz, tikz, latex or an image prompt), renders each \
	              block with an external tool and embeds the image next to the commented-out \
	              source.\n\nRe-running is idempotent and `--action remove` restores the \
	              original blocks.\n\nExamples:\n  mdfig -i README.md\n  mdfig -i \
	              docs/ --parallel --num_threads 4\n  mdfig -i paper.tex --action remove\n  \
	              mdfig -i notes.md --action open"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct MdfigCli {
	/// Documents to process. Repeat the flag or pass a comma-separated list.
	/// Directories are searched recursively for `.md`, `.markdown`, `.txt`
	/// and `.tex` files.
	#[arg(long, short, value_delimiter = ',')]
	pub input: Vec<PathBuf>,

	/// Read additional document paths from a file, one per line.
	#[arg(long = "files_from", alias = "files-from")]
	pub files_from: Option<PathBuf>,

	/// Write the rewritten document here instead of in place. Only valid
	/// with a single input document.
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// What to do with the blocks of each document.
	#[arg(long, value_enum, default_value_t = ActionArg::Render)]
	pub action: ActionArg,

	/// Report what would happen without running renderers or writing files.
	#[arg(long = "dry_run", alias = "dry-run", default_value_t = false)]
	pub dry_run: bool,

	/// Directory for rendered images. Defaults to `figs/` next to each
	/// document.
	#[arg(long = "dst_dir", alias = "dst-dir")]
	pub dst_dir: Option<PathBuf>,

	/// Render blocks concurrently on a bounded worker pool.
	#[arg(long, default_value_t = false)]
	pub parallel: bool,

	/// Size of the worker pool used with `--parallel`. Defaults to the
	/// number of available cores.
	#[arg(long = "num_threads", alias = "num-threads")]
	pub num_threads: Option<usize>,

	/// Only process blocks whose 1-based index is in `START:END`
	/// (inclusive). Either side may be omitted.
	#[arg(long)]
	pub limit: Option<BlockLimit>,

	/// Embed images by their hosted url instead of a relative path.
	#[arg(long = "use_github_hosting", alias = "use-github-hosting", default_value_t = false)]
	pub use_github_hosting: bool,

	/// Base url that serves the repository root, e.g.
	/// `https://raw.githubusercontent.com/org/repo/main`.
	#[arg(long = "hosting_url", alias = "hosting-url")]
	pub hosting_url: Option<String>,

	/// Api key for image generation. Falls back to `OPENAI_API_KEY`.
	#[arg(long = "api_key", alias = "api-key")]
	pub api_key: Option<String>,

	/// Path to the config file. Defaults to `mdfig.toml` in the current
	/// directory.
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Output format for the run summary.
	#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	/// Enable verbose output.
	#[arg(long, short, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long = "no_color", alias = "no-color", default_value_t = false)]
	pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
	/// Render every block and embed the images.
	Render,
	/// Render into a temporary copy of the document and open it in a
	/// viewer.
	Open,
	/// Restore the original blocks and delete their images.
	Remove,
}

impl From<ActionArg> for Action {
	fn from(value: ActionArg) -> Self {
		match value {
			ActionArg::Render => Self::Render,
			ActionArg::Open => Self::Open,
			ActionArg::Remove => Self::Remove,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
