use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use rayon::prelude::*;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Action;
use crate::ArtifactNamer;
use crate::Block;
use crate::BlockOutcome;
use crate::BlockReport;
use crate::Dispatcher;
use crate::Document;
use crate::DocumentReport;
use crate::FileError;
use crate::MdfigError;
use crate::MdfigResult;
use crate::RenderRequest;
use crate::RunSummary;
use crate::Segment;
use crate::SkipReason;
use crate::blocks;
use crate::namer::absolute;
use crate::namer::relative_path;
use crate::rewrite;

/// An inclusive, 1-based range of block indices, parsed from `START:END`.
/// Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockLimit {
	start: Option<usize>,
	end: Option<usize>,
}

impl BlockLimit {
	pub fn new(start: Option<usize>, end: Option<usize>) -> MdfigResult<Self> {
		let limit = Self { start, end };

		match (start, end) {
			(Some(0), _) | (_, Some(0)) => Err(MdfigError::InvalidLimit(limit.to_string())),
			(Some(start), Some(end)) if start > end => {
				Err(MdfigError::InvalidLimit(limit.to_string()))
			}
			_ => Ok(limit),
		}
	}

	pub fn contains(&self, index: usize) -> bool {
		self.start.is_none_or(|start| index >= start) && self.end.is_none_or(|end| index <= end)
	}
}

impl FromStr for BlockLimit {
	type Err = MdfigError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let invalid = || MdfigError::InvalidLimit(value.to_string());
		let bound = |text: &str| -> MdfigResult<Option<usize>> {
			let text = text.trim();
			if text.is_empty() {
				return Ok(None);
			}
			text.parse::<usize>().map(Some).map_err(|_| invalid())
		};

		let (start, end) = match value.trim().split_once(':') {
			Some((start, end)) => (bound(start)?, bound(end)?),
			None => {
				let index = bound(value)?.ok_or_else(invalid)?;
				(Some(index), Some(index))
			}
		};

		Self::new(start, end).map_err(|_| invalid())
	}
}

impl std::fmt::Display for BlockLimit {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if let Some(start) = self.start {
			write!(f, "{start}")?;
		}
		f.write_str(":")?;
		if let Some(end) = self.end {
			write!(f, "{end}")?;
		}
		Ok(())
	}
}

/// Serve embeds from a hosted copy of the repository instead of relative
/// paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hosting {
	base_url: String,
	root: PathBuf,
}

impl Hosting {
	/// `root` is the directory that `base_url` serves, usually the git root.
	pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			root: root.into(),
		}
	}

	pub fn url_for(&self, artifact: &Path) -> String {
		format!("{}/{}", self.base_url, relative_path(&self.root, artifact))
	}

	/// The local file behind a hosted url, if the url belongs to this host.
	pub fn local_path(&self, url: &str) -> Option<PathBuf> {
		let rest = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
		Some(self.root.join(rest))
	}
}

/// The nearest ancestor of `start` (inclusive) holding a `.git` entry.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
	absolute(start)
		.ancestors()
		.find(|dir| dir.join(".git").exists())
		.map(Path::to_path_buf)
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
	pub action: Action,
	/// Scan and name blocks but never invoke a renderer or write a file.
	pub dry_run: bool,
	pub limit: Option<BlockLimit>,
	/// Render blocks on a bounded worker pool.
	pub parallel: bool,
	/// Worker pool size. Defaults to the available parallelism.
	pub num_threads: Option<usize>,
	pub hosting: Option<Hosting>,
}

impl RenderOptions {
	pub fn threads(&self) -> usize {
		self.num_threads
			.filter(|threads| *threads > 0)
			.unwrap_or_else(default_threads)
	}

	fn in_limit(&self, index: usize) -> bool {
		self.limit.is_none_or(|limit| limit.contains(index))
	}
}

fn default_threads() -> usize {
	std::thread::available_parallelism().map_or(1, std::num::NonZero::get)
}

/// Everything shared by the blocks of a run.
#[derive(Debug)]
pub struct RenderContext {
	pub dispatcher: Dispatcher,
	pub namer: ArtifactNamer,
	pub options: RenderOptions,
}

/// One document of a run and where its rewritten text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
	pub input: PathBuf,
	/// Destination of the rewritten document. `None` rewrites in place.
	pub output: Option<PathBuf>,
}

impl FileJob {
	pub fn in_place(input: impl Into<PathBuf>) -> Self {
		Self {
			input: input.into(),
			output: None,
		}
	}

	pub fn output_path(&self) -> &Path {
		self.output.as_deref().unwrap_or(&self.input)
	}
}

/// The rewritten text of one document and what happened to its blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
	pub text: String,
	pub report: DocumentReport,
}

/// A scanned document waiting for its blocks to be processed.
struct Prepared {
	document: Document,
	segments: Vec<Segment>,
	output: PathBuf,
}

impl Prepared {
	fn output_dir(&self) -> &Path {
		self.output.parent().unwrap_or_else(|| Path::new(""))
	}
}

enum Work {
	Render,
	Remove,
	Skip(SkipReason),
}

/// One block of one document with its planned work.
struct Job<'a> {
	doc: usize,
	block: &'a Block,
	targets: Vec<PathBuf>,
	work: Work,
}

/// Process the blocks of a single document whose rewritten text is meant
/// for `output`. Artifacts are written (or removed) but the document is not.
pub fn render(document: &Document, output: &Path, ctx: &RenderContext) -> MdfigResult<RenderOutput> {
	let prepared = [Prepared {
		segments: document.scan()?,
		document: document.clone(),
		output: output.to_path_buf(),
	}];

	execute(&prepared, ctx)?.pop().ok_or(MdfigError::NoInputs)
}

/// Process several documents and write each rewritten document to its
/// output.
///
/// A document that cannot be read or scanned is recorded in
/// [`RunSummary::errors`] and left untouched while the others continue. A
/// naming collision between any two blocks, or two jobs sharing an output
/// document, aborts the run before a renderer is invoked.
pub fn run(jobs: &[FileJob], ctx: &RenderContext) -> MdfigResult<RunSummary> {
	check_outputs(jobs)?;

	let mut summary = RunSummary::default();
	let mut prepared = Vec::with_capacity(jobs.len());

	for job in jobs {
		let loaded = Document::load(&job.input).and_then(|document| {
			let segments = document.scan()?;
			Ok(Prepared {
				document,
				segments,
				output: job.output_path().to_path_buf(),
			})
		});

		match loaded {
			Ok(item) => prepared.push(item),
			Err(error) => {
				warn!(document = %job.input.display(), %error, "skipping document");
				summary.errors.push(FileError {
					path: job.input.clone(),
					error,
				});
			}
		}
	}

	let outputs = execute(&prepared, ctx)?;

	for (item, RenderOutput { text, mut report }) in prepared.iter().zip(outputs) {
		match write_document(item, &text, ctx) {
			Ok(written) => report.written = written,
			Err(error) => {
				summary.errors.push(FileError {
					path: item.output.clone(),
					error,
				});
			}
		}
		summary.documents.push(report);
	}

	Ok(summary)
}

fn execute(prepared: &[Prepared], ctx: &RenderContext) -> MdfigResult<Vec<RenderOutput>> {
	let jobs = plan(prepared, ctx);

	if ctx.options.action.renders() {
		check_collisions(prepared, &jobs)?;
	}

	let units = jobs
		.iter()
		.filter(|job| matches!(job.work, Work::Render))
		.count();
	let threads = ctx.options.threads();

	let outcomes: Vec<BlockOutcome> = if ctx.options.parallel && units > 1 && threads > 1 {
		let pool = rayon::ThreadPoolBuilder::new()
			.num_threads(threads)
			.build()
			.map_err(|e| MdfigError::ThreadPool(e.to_string()))?;
		debug!(threads, units, "rendering blocks in parallel");

		pool.install(|| {
			jobs.par_iter()
				.map(|job| settle(job, &prepared[job.doc], ctx))
				.collect()
		})
	} else {
		jobs.iter()
			.map(|job| settle(job, &prepared[job.doc], ctx))
			.collect()
	};

	let mut reports: Vec<(BTreeMap<usize, BlockOutcome>, Vec<BlockReport>)> =
		prepared.iter().map(|_| (BTreeMap::new(), Vec::new())).collect();

	for (job, outcome) in jobs.into_iter().zip(outcomes) {
		let (map, blocks) = &mut reports[job.doc];
		map.insert(job.block.index, outcome.clone());
		blocks.push(BlockReport {
			index: job.block.index,
			language: job.block.language,
			line: job.block.line,
			targets: job.targets,
			outcome,
		});
	}

	let outputs = prepared
		.iter()
		.zip(reports)
		.map(|(item, (outcomes, blocks))| {
			RenderOutput {
				text: rewrite(&item.document, &item.segments, &outcomes, item.output_dir()),
				report: DocumentReport {
					input: item.document.path.clone(),
					output: item.output.clone(),
					blocks,
					written: false,
				},
			}
		})
		.collect();

	Ok(outputs)
}

fn plan<'a>(prepared: &'a [Prepared], ctx: &RenderContext) -> Vec<Job<'a>> {
	let options = &ctx.options;
	let mut jobs = Vec::new();

	for (doc, item) in prepared.iter().enumerate() {
		for block in blocks(&item.segments) {
			let (targets, work) = if options.action.renders() {
				let count = ctx.dispatcher.artifact_count(block.language);
				let targets = ctx
					.namer
					.names(&item.document.path, block.index, block.language, count);
				(targets, Work::Render)
			} else if block.is_rendered() {
				let targets = block
					.prior_embeds()
					.iter()
					.filter_map(|embed| {
						resolve_embed(embed, item.document.dir(), options.hosting.as_ref())
					})
					.collect();
				(targets, Work::Remove)
			} else {
				(Vec::new(), Work::Skip(SkipReason::NotRendered))
			};

			let work = match work {
				Work::Skip(reason) => Work::Skip(reason),
				_ if !options.in_limit(block.index) => Work::Skip(SkipReason::OutsideLimit),
				_ if options.dry_run => Work::Skip(SkipReason::DryRun),
				work => work,
			};

			jobs.push(Job {
				doc,
				block,
				targets,
				work,
			});
		}
	}

	jobs
}

/// Fail when two jobs would write the same document.
fn check_outputs(jobs: &[FileJob]) -> MdfigResult<()> {
	let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();

	for job in jobs {
		if let Some(first) = claimed.insert(absolute(job.output_path()), &job.input) {
			return Err(MdfigError::DuplicateOutput {
				path: job.output_path().display().to_string(),
				first: first.display().to_string(),
				second: job.input.display().to_string(),
			});
		}
	}

	Ok(())
}

/// Fail when two blocks would write the same artifact.
fn check_collisions(prepared: &[Prepared], jobs: &[Job<'_>]) -> MdfigResult<()> {
	let mut claimed: HashMap<PathBuf, String> = HashMap::new();

	for job in jobs {
		let owner = format!(
			"block {} of {}",
			job.block.index,
			prepared[job.doc].document.path.display()
		);

		for target in &job.targets {
			if let Some(first) = claimed.insert(absolute(target), owner.clone()) {
				return Err(MdfigError::NamingCollision {
					path: target.display().to_string(),
					first,
					second: owner,
				});
			}
		}
	}

	Ok(())
}

/// Carry out the planned work of one block.
fn settle(job: &Job<'_>, item: &Prepared, ctx: &RenderContext) -> BlockOutcome {
	let block = job.block;
	let document = &item.document.path;

	match &job.work {
		Work::Skip(reason) => BlockOutcome::Skipped { reason: *reason },
		Work::Remove => {
			for artifact in &job.targets {
				remove_artifact(artifact);
			}
			BlockOutcome::Removed {
				artifacts: job.targets.clone(),
			}
		}
		Work::Render => {
			debug!(
				document = %document.display(),
				block = block.index,
				language = %block.language,
				"rendering block"
			);

			let request = RenderRequest {
				language: block.language,
				content: block.content.clone(),
				targets: job.targets.clone(),
				index: block.index,
				document: document.clone(),
			};

			match ctx.dispatcher.dispatch(block.language).render(&request) {
				Ok(artifacts) => {
					for artifact in &artifacts {
						info!(artifact = %artifact.display(), block = block.index, "rendered");
					}
					let embeds = artifacts
						.iter()
						.map(|artifact| {
							embed_reference(artifact, item.output_dir(), ctx.options.hosting.as_ref())
						})
						.collect();

					BlockOutcome::Rendered { artifacts, embeds }
				}
				Err(error) => {
					warn!(
						document = %document.display(),
						block = block.index,
						language = %block.language,
						%error,
						"failed to render block"
					);

					BlockOutcome::Failed {
						error: error.to_string(),
						keep_prior: prior_artifacts_exist(
							block,
							item.document.dir(),
							ctx.options.hosting.as_ref(),
						),
					}
				}
			}
		}
	}
}

/// The reference written into the document for an artifact.
pub fn embed_reference(artifact: &Path, output_dir: &Path, hosting: Option<&Hosting>) -> String {
	match hosting {
		Some(hosting) => hosting.url_for(artifact),
		None => relative_path(output_dir, artifact),
	}
}

/// The local file an embed refers to. Urls that do not belong to `hosting`
/// have no local file.
pub fn resolve_embed(embed: &str, base_dir: &Path, hosting: Option<&Hosting>) -> Option<PathBuf> {
	if embed.contains("://") {
		return hosting.and_then(|hosting| hosting.local_path(embed));
	}

	Some(base_dir.join(embed))
}

/// Whether every local artifact referenced by a rendered block still exists.
/// Always true for a fresh block.
fn prior_artifacts_exist(block: &Block, base_dir: &Path, hosting: Option<&Hosting>) -> bool {
	block.prior_embeds().iter().all(|embed| {
		resolve_embed(embed, base_dir, hosting).is_none_or(|path| path.is_file())
	})
}

fn remove_artifact(artifact: &Path) {
	match std::fs::remove_file(artifact) {
		Ok(()) => info!(artifact = %artifact.display(), "removed"),
		Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
		Err(error) => warn!(artifact = %artifact.display(), %error, "failed to remove artifact"),
	}
}

fn write_document(item: &Prepared, text: &str, ctx: &RenderContext) -> MdfigResult<bool> {
	if ctx.options.dry_run {
		return Ok(false);
	}

	let in_place = absolute(&item.output) == absolute(&item.document.path);
	if in_place && text == item.document.text {
		debug!(document = %item.output.display(), "document unchanged");
		return Ok(false);
	}

	if let Some(parent) = item.output.parent() {
		if !parent.as_os_str().is_empty() {
			std::fs::create_dir_all(parent)?;
		}
	}
	std::fs::write(&item.output, text)?;
	info!(document = %item.output.display(), "wrote document");

	Ok(true)
}
