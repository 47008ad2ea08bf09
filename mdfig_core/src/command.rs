use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;

use crate::Language;
use crate::MdfigConfig;
use crate::RenderError;
use crate::RenderRequest;
use crate::Renderer;
use crate::renderer::ensure_parent;
use crate::renderer::verify_targets;

/// Name of the scratch source and output files inside the work directory.
const SCRATCH_STEM: &str = "block";
/// Longest stderr excerpt kept in a failure message.
const STDERR_LIMIT: usize = 2000;

/// How one language is rendered by external commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
	/// Argv templates run in order inside the work directory.
	pub steps: Vec<Vec<String>>,
	/// Docker image the steps run in when docker mode is on.
	pub image: String,
}

impl CommandSpec {
	/// The built-in command steps and docker image for `language`.
	pub fn default_for(language: Language) -> Self {
		let steps: &[&[&str]] = match language {
			Language::PlantUml => &[&["plantuml", "-tpng", "{input}"]],
			Language::Mermaid => &[&["mmdc", "-i", "{input}", "-o", "{output}"]],
			Language::Graphviz => &[&["dot", "-Tpng", "{input}", "-o", "{output}"]],
			Language::Tikz | Language::Latex => {
				&[
					&[
						"pdflatex",
						"-interaction=nonstopmode",
						"-output-directory",
						"{workdir}",
						"{input}",
					],
					&["pdftoppm", "-png", "-r", "300", "-singlefile", "{stem}.pdf", "{stem}"],
				]
			}
			Language::Image => &[],
		};

		let image = match language {
			Language::PlantUml => "plantuml/plantuml",
			Language::Mermaid => "minlag/mermaid-cli",
			Language::Graphviz => "nshine/dot",
			Language::Tikz | Language::Latex | Language::Image => "texlive/texlive",
		};

		Self {
			steps: steps
				.iter()
				.map(|step| step.iter().map(ToString::to_string).collect())
				.collect(),
			image: image.to_string(),
		}
	}
}

/// Renders a block by running command line tools on a scratch copy of its
/// content, optionally inside docker.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
	specs: HashMap<Language, CommandSpec>,
	docker: bool,
}

impl Default for CommandRenderer {
	fn default() -> Self {
		Self::new(false)
	}
}

impl CommandRenderer {
	/// A renderer using the built-in commands for every language.
	pub fn new(docker: bool) -> Self {
		let specs = Language::ALL
			.into_iter()
			.filter(|language| *language != Language::Image)
			.map(|language| (language, CommandSpec::default_for(language)))
			.collect();

		Self { specs, docker }
	}

	/// Built-in commands with the `[docker]` and `[renderers]` settings of
	/// the config applied on top.
	pub fn from_config(config: &MdfigConfig) -> Self {
		let mut renderer = Self::new(config.docker.enabled);

		for language in Language::ALL {
			let Some(overrides) = config.renderer(language) else {
				continue;
			};
			let spec = renderer
				.specs
				.entry(language)
				.or_insert_with(|| CommandSpec::default_for(language));

			if let Some(command) = &overrides.command {
				spec.steps.clone_from(command);
			}
			if let Some(image) = &overrides.image {
				spec.image.clone_from(image);
			}
		}

		renderer
	}

	pub fn spec(&self, language: Language) -> Option<&CommandSpec> {
		self.specs.get(&language)
	}

	pub fn uses_docker(&self) -> bool {
		self.docker
	}

	/// The argv of every step for a block rendered in `workdir`, with
	/// placeholders filled in and docker wrapping applied.
	pub fn command_lines(&self, language: Language, workdir: &Path) -> Vec<Vec<String>> {
		let Some(spec) = self.spec(language) else {
			return Vec::new();
		};
		let placeholders = Placeholders::new(workdir, language);

		spec.steps
			.iter()
			.filter(|step| !step.is_empty())
			.map(|step| {
				let argv: Vec<String> = step.iter().map(|arg| placeholders.expand(arg)).collect();
				if self.docker {
					docker_wrap(&argv, workdir, &spec.image)
				} else {
					argv
				}
			})
			.collect()
	}
}

impl Renderer for CommandRenderer {
	fn render(&self, request: &RenderRequest) -> Result<Vec<PathBuf>, RenderError> {
		let workdir = tempfile::Builder::new().prefix("mdfig-").tempdir()?;
		let placeholders = Placeholders::new(workdir.path(), request.language);

		std::fs::write(
			&placeholders.input,
			prepare_source(request.language, &request.content),
		)?;

		for argv in self.command_lines(request.language, workdir.path()) {
			run_step(&argv, workdir.path())?;
		}

		if !placeholders.output.is_file() {
			return Err(RenderError::MissingOutput(
				placeholders.output.display().to_string(),
			));
		}

		for target in &request.targets {
			ensure_parent(target)?;
			std::fs::copy(&placeholders.output, target)?;
		}

		verify_targets(&request.targets)
	}
}

/// Scratch paths substituted into command templates.
struct Placeholders {
	input: PathBuf,
	output: PathBuf,
	stem: PathBuf,
	workdir: PathBuf,
}

impl Placeholders {
	fn new(workdir: &Path, language: Language) -> Self {
		let stem = workdir.join(SCRATCH_STEM);

		Self {
			input: stem.with_extension(language.source_extension()),
			output: stem.with_extension("png"),
			stem,
			workdir: workdir.to_path_buf(),
		}
	}

	fn expand(&self, template: &str) -> String {
		template
			.replace("{input}", &self.input.to_string_lossy())
			.replace("{output}", &self.output.to_string_lossy())
			.replace("{stem}", &self.stem.to_string_lossy())
			.replace("{workdir}", &self.workdir.to_string_lossy())
	}
}

/// Run one command step through docker, mounting the work directory at the
/// same path so expanded placeholders stay valid inside the container.
pub fn docker_wrap(argv: &[String], workdir: &Path, image: &str) -> Vec<String> {
	let Some((program, args)) = argv.split_first() else {
		return Vec::new();
	};
	let workdir = workdir.to_string_lossy();

	let mut wrapped = vec![
		"docker".to_string(),
		"run".to_string(),
		"--rm".to_string(),
		"-v".to_string(),
		format!("{workdir}:{workdir}"),
		"-w".to_string(),
		workdir.to_string(),
		"--entrypoint".to_string(),
		program.clone(),
		image.to_string(),
	];
	wrapped.extend(args.iter().cloned());
	wrapped
}

fn run_step(argv: &[String], workdir: &Path) -> Result<(), RenderError> {
	let Some((program, args)) = argv.split_first() else {
		return Ok(());
	};

	debug!(program = %program, ?args, "running render step");

	let output = Command::new(program)
		.args(args)
		.current_dir(workdir)
		.stdin(Stdio::null())
		.output()
		.map_err(|source| {
			RenderError::Spawn {
				program: program.clone(),
				source,
			}
		})?;

	if output.status.success() {
		return Ok(());
	}

	let stderr = String::from_utf8_lossy(&output.stderr);
	let stderr = stderr.trim();
	let excerpt = match stderr.char_indices().rev().nth(STDERR_LIMIT) {
		Some((cut, _)) => format!("...{}", &stderr[cut..]),
		None => stderr.to_string(),
	};

	Err(RenderError::CommandFailed {
		program: program.clone(),
		status: output.status.to_string(),
		stderr: excerpt,
	})
}

/// The text written to the scratch source file. Diagram sources missing
/// their mandatory wrapper get one.
pub fn prepare_source(language: Language, content: &str) -> String {
	match language {
		Language::PlantUml if !content.trim_start().starts_with("@start") => {
			format!("@startuml\n{content}@enduml\n")
		}
		Language::Tikz | Language::Latex if !content.contains("\\documentclass") => {
			let body = if language == Language::Tikz && !content.contains("\\begin{tikzpicture}") {
				format!("\\begin{{tikzpicture}}\n{content}\\end{{tikzpicture}}\n")
			} else {
				content.to_string()
			};
			let options = if language == Language::Tikz {
				"tikz,border=2pt"
			} else {
				"border=2pt"
			};

			format!(
				"\\documentclass[{options}]{{standalone}}\n\\usepackage{{amsmath}}\n\\begin{{document}}\n{body}\\end{{document}}\n"
			)
		}
		_ => content.to_string(),
	}
}
