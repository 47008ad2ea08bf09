use std::path::Path;

use crate::MdfigError;
use crate::MdfigResult;

const MARKDOWN_BEGIN: &str = "<!-- mdfig:begin -->";
const MARKDOWN_END: &str = "<!-- mdfig:end -->";
const MARKDOWN_COMMENT_PREFIX: &str = "[//]: # (";
const MARKDOWN_COMMENT_SUFFIX: &str = ")";
const LATEX_BEGIN: &str = "% mdfig:begin";
const LATEX_END: &str = "% mdfig:end";
const LATEX_COMMENT_PREFIX: &str = "% ";

/// The kind of document hosting the fenced blocks. It decides the comment
/// syntax, the marker lines and the embed markup written by the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
	/// `.md`, `.markdown` and `.txt` documents.
	Markdown,
	/// `.tex` documents.
	Latex,
}

impl HostKind {
	/// Determine the host kind from a document path.
	pub fn from_path(path: &Path) -> MdfigResult<Self> {
		let ext = path
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		match ext.as_str() {
			"md" | "markdown" | "txt" => Ok(Self::Markdown),
			"tex" => Ok(Self::Latex),
			_ => Err(MdfigError::UnsupportedExtension(path.display().to_string())),
		}
	}

	pub fn begin_marker(self) -> &'static str {
		match self {
			Self::Markdown => MARKDOWN_BEGIN,
			Self::Latex => LATEX_BEGIN,
		}
	}

	pub fn end_marker(self) -> &'static str {
		match self {
			Self::Markdown => MARKDOWN_END,
			Self::Latex => LATEX_END,
		}
	}

	pub fn is_begin_marker(self, line: &str) -> bool {
		line.trim() == self.begin_marker()
	}

	pub fn is_end_marker(self, line: &str) -> bool {
		line.trim() == self.end_marker()
	}

	/// Comment out one line of an original block. The block indent stays in
	/// front of the comment syntax so that list nesting survives.
	pub fn comment(self, line: &str, indent: &str) -> String {
		let (lead, rest) = match line.strip_prefix(indent) {
			Some(rest) => (indent, rest),
			None => ("", line),
		};

		match self {
			Self::Markdown => {
				format!("{lead}{MARKDOWN_COMMENT_PREFIX}{rest}{MARKDOWN_COMMENT_SUFFIX}")
			}
			Self::Latex => format!("{lead}{LATEX_COMMENT_PREFIX}{rest}"),
		}
	}

	/// Reverse [`comment`](Self::comment). Returns `None` when the line is not
	/// a commented line of this host.
	pub fn uncomment(self, line: &str, indent: &str) -> Option<String> {
		let (lead, rest) = match line.strip_prefix(indent) {
			Some(rest) if !indent.is_empty() && self.starts_comment(rest) => (indent, rest),
			_ => ("", line),
		};

		let inner = match self {
			Self::Markdown => {
				rest.strip_prefix(MARKDOWN_COMMENT_PREFIX)?
					.trim_end()
					.strip_suffix(MARKDOWN_COMMENT_SUFFIX)?
			}
			Self::Latex => {
				// Editors strip the trailing space of `% ` on empty lines.
				if rest.trim_end() == LATEX_COMMENT_PREFIX.trim_end() {
					""
				} else {
					rest.strip_prefix(LATEX_COMMENT_PREFIX)?
				}
			}
		};

		Some(format!("{lead}{inner}"))
	}

	fn starts_comment(self, line: &str) -> bool {
		match self {
			Self::Markdown => line.starts_with(MARKDOWN_COMMENT_PREFIX),
			Self::Latex => line.starts_with(LATEX_COMMENT_PREFIX.trim_end()),
		}
	}

	/// Markup that embeds an image at `path`.
	pub fn embed(self, path: &str) -> String {
		match self {
			Self::Markdown => format!("![]({path})"),
			Self::Latex => format!("\\includegraphics{{{path}}}"),
		}
	}

	/// Extract the image path from an embed line written by
	/// [`embed`](Self::embed). Optional LaTeX arguments and a markdown alt
	/// text are accepted.
	pub fn parse_embed(self, line: &str) -> Option<String> {
		let line = line.trim();

		match self {
			Self::Markdown => {
				let rest = line.strip_prefix("![")?;
				let close = rest.find("](")?;
				let path = rest[close + 2..].strip_suffix(')')?;
				(!path.is_empty()).then(|| path.to_string())
			}
			Self::Latex => {
				let rest = line.strip_prefix("\\includegraphics")?;
				let rest = match rest.strip_prefix('[') {
					Some(options) => &options[options.find(']')? + 1..],
					None => rest,
				};
				let path = rest.strip_prefix('{')?.strip_suffix('}')?;
				(!path.is_empty()).then(|| path.to_string())
			}
		}
	}
}
