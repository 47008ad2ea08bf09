use std::path::PathBuf;

use serde::Serialize;

use crate::Language;
use crate::MdfigError;

/// What a run does to the blocks of its documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	/// Render every block and embed the artifacts.
	#[default]
	Render,
	/// Render into a separate output document that is handed to a viewer.
	Open,
	/// Restore the original fenced blocks and delete their artifacts.
	Remove,
}

impl Action {
	pub fn renders(self) -> bool {
		matches!(self, Self::Render | Self::Open)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
	/// The run only reports what it would do.
	DryRun,
	/// The block index is outside the requested `--limit` range.
	OutsideLimit,
	/// `remove` found a block that was never rendered.
	NotRendered,
}

impl std::fmt::Display for SkipReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let reason = match self {
			Self::DryRun => "dry run",
			Self::OutsideLimit => "outside limit",
			Self::NotRendered => "not rendered",
		};
		f.write_str(reason)
	}
}

/// The result of processing one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockOutcome {
	/// Artifacts were produced. `embeds` are the references written into the
	/// document, one per artifact.
	Rendered {
		artifacts: Vec<PathBuf>,
		embeds: Vec<String>,
	},
	/// The rendered region was replaced by the original fenced block.
	Removed { artifacts: Vec<PathBuf> },
	Skipped { reason: SkipReason },
	/// The renderer failed. With `keep_prior` the block text is left exactly
	/// as it was; otherwise the original fenced block is restored.
	Failed { error: String, keep_prior: bool },
}

impl BlockOutcome {
	pub fn is_failed(&self) -> bool {
		matches!(self, Self::Failed { .. })
	}
}

/// Report for one block of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReport {
	pub index: usize,
	pub language: Language,
	/// 1-based line where the block starts.
	pub line: usize,
	/// Artifact paths the block was (or would be) rendered to, or the local
	/// artifacts a removal applies to.
	pub targets: Vec<PathBuf>,
	pub outcome: BlockOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
	Rendered,
	Skipped,
	Failed,
	Removed,
}

/// An artifact touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArtifact {
	pub block_index: usize,
	pub file_path: PathBuf,
	pub status: ArtifactStatus,
}

/// Report for one document of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
	pub input: PathBuf,
	pub output: PathBuf,
	pub blocks: Vec<BlockReport>,
	/// Whether the rewritten document was written to `output`.
	pub written: bool,
}

impl DocumentReport {
	pub fn rendered(&self) -> usize {
		self.count(|outcome| matches!(outcome, BlockOutcome::Rendered { .. }))
	}

	pub fn removed(&self) -> usize {
		self.count(|outcome| matches!(outcome, BlockOutcome::Removed { .. }))
	}

	pub fn skipped(&self) -> usize {
		self.count(|outcome| matches!(outcome, BlockOutcome::Skipped { .. }))
	}

	pub fn failed(&self) -> usize {
		self.count(BlockOutcome::is_failed)
	}

	fn count(&self, predicate: impl Fn(&BlockOutcome) -> bool) -> usize {
		self.blocks
			.iter()
			.filter(|block| predicate(&block.outcome))
			.count()
	}

	/// Every artifact the run rendered, skipped, failed or removed.
	pub fn artifacts(&self) -> Vec<RenderedArtifact> {
		let mut artifacts = Vec::new();

		for block in &self.blocks {
			let (paths, status) = match &block.outcome {
				BlockOutcome::Rendered { artifacts, .. } => (artifacts, ArtifactStatus::Rendered),
				BlockOutcome::Removed { artifacts } => (artifacts, ArtifactStatus::Removed),
				BlockOutcome::Skipped {
					reason: SkipReason::NotRendered,
				} => continue,
				BlockOutcome::Skipped { .. } => (&block.targets, ArtifactStatus::Skipped),
				BlockOutcome::Failed { .. } => (&block.targets, ArtifactStatus::Failed),
			};

			artifacts.extend(paths.iter().map(|path| {
				RenderedArtifact {
					block_index: block.index,
					file_path: path.clone(),
					status,
				}
			}));
		}

		artifacts
	}
}

/// A document that could not be processed at all.
#[derive(Debug)]
pub struct FileError {
	pub path: PathBuf,
	pub error: MdfigError,
}

/// Aggregated result of a multi-document run.
#[derive(Debug, Default)]
pub struct RunSummary {
	pub documents: Vec<DocumentReport>,
	/// Documents aborted by a structural error. Nothing was written for them.
	pub errors: Vec<FileError>,
}

impl RunSummary {
	pub fn rendered(&self) -> usize {
		self.documents.iter().map(DocumentReport::rendered).sum()
	}

	pub fn removed(&self) -> usize {
		self.documents.iter().map(DocumentReport::removed).sum()
	}

	pub fn skipped(&self) -> usize {
		self.documents.iter().map(DocumentReport::skipped).sum()
	}

	pub fn failed(&self) -> usize {
		self.documents.iter().map(DocumentReport::failed).sum()
	}

	/// No structural errors and no failed blocks.
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty() && self.failed() == 0
	}
}
