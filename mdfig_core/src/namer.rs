use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::Language;

/// Default artifact directory, created next to each document.
pub const DEFAULT_DST_DIR: &str = "figs";

/// Derives deterministic artifact paths for blocks.
///
/// The same `(document, index, language)` triple always produces the same
/// path, so re-rendering an unchanged document overwrites its previous
/// artifacts instead of accumulating new ones.
#[derive(Debug, Clone, Default)]
pub struct ArtifactNamer {
	/// Destination directory. Relative paths are resolved against the
	/// directory of each document; `None` means `figs/` next to the document.
	dst_dir: Option<PathBuf>,
}

impl ArtifactNamer {
	pub fn new(dst_dir: Option<PathBuf>) -> Self {
		Self { dst_dir }
	}

	/// The directory artifacts of `document` are written to.
	pub fn dst_dir_for(&self, document: &Path) -> PathBuf {
		let parent = document.parent().unwrap_or_else(|| Path::new(""));

		match &self.dst_dir {
			Some(dir) if dir.is_absolute() => dir.clone(),
			Some(dir) => parent.join(dir),
			None => parent.join(DEFAULT_DST_DIR),
		}
	}

	/// Path of the single artifact for a block.
	pub fn name(&self, document: &Path, index: usize, language: Language) -> PathBuf {
		let stem = document_stem(document);
		self.dst_dir_for(document)
			.join(format!("{stem}.{language}.{index}.png"))
	}

	/// Paths for a block producing `count` artifacts. A single artifact uses
	/// the plain [`name`](Self::name); several are numbered from 1.
	pub fn names(
		&self,
		document: &Path,
		index: usize,
		language: Language,
		count: usize,
	) -> Vec<PathBuf> {
		if count <= 1 {
			return vec![self.name(document, index, language)];
		}

		let stem = document_stem(document);
		let dir = self.dst_dir_for(document);
		(1..=count)
			.map(|k| dir.join(format!("{stem}.{language}.{index}.{k}.png")))
			.collect()
	}
}

fn document_stem(document: &Path) -> String {
	document
		.file_stem()
		.map_or_else(|| "document".to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Express `target` relative to the directory `from`, using `/` separators.
///
/// Both paths are made absolute against the current directory first. When no
/// relative form exists (different drive prefixes), the absolute target is
/// returned.
pub fn relative_path(from: &Path, target: &Path) -> String {
	let from = absolute(from);
	let target = absolute(target);

	let from_parts: Vec<Component<'_>> = from.components().collect();
	let target_parts: Vec<Component<'_>> = target.components().collect();

	if from_parts.first() != target_parts.first() {
		return to_slash(&target);
	}

	let common = from_parts
		.iter()
		.zip(&target_parts)
		.take_while(|(a, b)| a == b)
		.count();

	let mut parts: Vec<String> = Vec::new();
	for _ in common..from_parts.len() {
		parts.push("..".to_string());
	}
	for part in &target_parts[common..] {
		parts.push(part.as_os_str().to_string_lossy().into_owned());
	}

	parts.join("/")
}

/// Make a path absolute and drop `.` / `..` components lexically.
pub fn absolute(path: &Path) -> PathBuf {
	let joined = if path.is_absolute() {
		path.to_path_buf()
	} else {
		std::env::current_dir()
			.unwrap_or_else(|_| PathBuf::from("/"))
			.join(path)
	};

	let mut normalized = PathBuf::new();
	for component in joined.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				normalized.pop();
			}
			other => normalized.push(other.as_os_str()),
		}
	}

	normalized
}

fn to_slash(path: &Path) -> String {
	path.to_string_lossy().replace('\\', "/")
}
