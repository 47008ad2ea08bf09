use std::path::Path;
use std::path::PathBuf;

use crate::Block;
use crate::HostKind;
use crate::MdfigError;
use crate::MdfigResult;
use crate::ScanError;
use crate::Segment;
use crate::scan;

/// The text of one input file together with its host kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
	pub path: PathBuf,
	pub text: String,
	pub host: HostKind,
	/// Line terminator used when the rewriter inserts lines.
	pub newline: &'static str,
}

impl Document {
	/// Read a document from disk. The extension is checked before the file is
	/// read.
	pub fn load(path: &Path) -> MdfigResult<Self> {
		let host = HostKind::from_path(path)?;
		let text = std::fs::read_to_string(path).map_err(|source| {
			MdfigError::ReadDocument {
				path: path.display().to_string(),
				source,
			}
		})?;

		Ok(Self::with_host(path, text, host))
	}

	/// Create a document from text, using `path` for the host kind and for
	/// artifact naming.
	pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> MdfigResult<Self> {
		let path = path.into();
		let host = HostKind::from_path(&path)?;

		Ok(Self::with_host(&path, text.into(), host))
	}

	fn with_host(path: &Path, text: String, host: HostKind) -> Self {
		let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

		Self {
			path: path.to_path_buf(),
			text,
			host,
			newline,
		}
	}

	/// Scan the document, attaching the file name to structural errors.
	pub fn scan(&self) -> MdfigResult<Vec<Segment>> {
		scan(&self.text, self.host).map_err(|error| {
			let file = self.path.display().to_string();
			match error {
				ScanError::UnterminatedFence { line } => MdfigError::UnterminatedFence { file, line },
				ScanError::MalformedMarker { line, reason } => {
					MdfigError::MalformedMarker { file, line, reason }
				}
			}
		})
	}

	/// Directory the document lives in, used to resolve relative embeds.
	pub fn dir(&self) -> &Path {
		self.path.parent().unwrap_or_else(|| Path::new(""))
	}
}

/// The blocks of a segment list, in document order.
pub fn blocks(segments: &[Segment]) -> impl Iterator<Item = &Block> {
	segments.iter().filter_map(|segment| {
		match segment {
			Segment::Block(block) => Some(block),
			Segment::Text(_) => None,
		}
	})
}
