use std::path::Path;
use std::path::PathBuf;

use crate::Language;
use crate::RenderError;

/// Everything a renderer needs to produce the artifacts of one block.
#[derive(Debug, Clone)]
pub struct RenderRequest {
	pub language: Language,
	/// Raw block content with the fence indent removed.
	pub content: String,
	/// Artifact paths to produce, in order. Only the `image` language asks
	/// for more than one.
	pub targets: Vec<PathBuf>,
	/// 1-based index of the block within its document.
	pub index: usize,
	/// The document the block belongs to, for log context.
	pub document: PathBuf,
}

/// An external collaborator that turns block content into image files.
///
/// On success every path of [`RenderRequest::targets`] must exist, and the
/// returned list holds exactly those paths.
pub trait Renderer: Send + Sync {
	fn render(&self, request: &RenderRequest) -> Result<Vec<PathBuf>, RenderError>;
}

/// Create the parent directory of an artifact path.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), RenderError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			std::fs::create_dir_all(parent)?;
		}
	}

	Ok(())
}

/// Check that every target of a request was produced.
pub(crate) fn verify_targets(targets: &[PathBuf]) -> Result<Vec<PathBuf>, RenderError> {
	if let Some(missing) = targets.iter().find(|target| !target.is_file()) {
		return Err(RenderError::MissingOutput(missing.display().to_string()));
	}

	Ok(targets.to_vec())
}
