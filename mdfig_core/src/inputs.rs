use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::MdfigError;
use crate::MdfigResult;
use crate::namer::absolute;

/// Rules applied while walking directory inputs.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
	/// Gitignore-style patterns from `[exclude]` in `mdfig.toml`.
	pub exclude_patterns: Vec<String>,
	/// Name of the artifact directory, never descended into.
	pub artifact_dir: Option<String>,
}

/// Read a list of documents, one path per line. Blank lines and lines
/// starting with `#` are ignored. Relative paths are resolved against the
/// directory of the list file.
pub fn read_file_list(path: &Path) -> MdfigResult<Vec<PathBuf>> {
	let content = std::fs::read_to_string(path).map_err(|source| {
		MdfigError::ReadDocument {
			path: path.display().to_string(),
			source,
		}
	})?;
	let base = path.parent().unwrap_or_else(|| Path::new(""));

	Ok(parse_file_list(&content)
		.into_iter()
		.map(|entry| {
			if entry.is_absolute() {
				entry
			} else {
				base.join(entry)
			}
		})
		.collect())
}

/// Parse the lines of a file list.
pub fn parse_file_list(content: &str) -> Vec<PathBuf> {
	content
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(PathBuf::from)
		.collect()
}

/// Expand directories into the documents they contain and drop duplicates,
/// keeping the first occurrence of each document.
pub fn resolve_inputs(inputs: &[PathBuf], options: &WalkOptions) -> MdfigResult<Vec<PathBuf>> {
	let mut seen = HashSet::new();
	let mut resolved = Vec::new();

	for input in inputs {
		let found = if input.is_dir() {
			collect_documents(input, options)?
		} else {
			vec![input.clone()]
		};

		for path in found {
			if seen.insert(absolute(&path)) {
				resolved.push(path);
			}
		}
	}

	Ok(resolved)
}

/// Whether `path` has an extension the scanner accepts.
pub fn is_document_file(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| {
			matches!(
				ext.to_ascii_lowercase().as_str(),
				"md" | "markdown" | "txt" | "tex"
			)
		})
}

/// Collect every document below `root`, sorted for deterministic ordering.
///
/// The directory's `.gitignore` and the exclude patterns both apply.
pub fn collect_documents(root: &Path, options: &WalkOptions) -> MdfigResult<Vec<PathBuf>> {
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	let gitignore = build_gitignore(root);
	let exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	walk_dir(
		root,
		&mut files,
		&gitignore,
		&exclude,
		options.artifact_dir.as_deref(),
		&mut visited_dirs,
	)?;
	files.sort();

	Ok(files)
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> MdfigResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			MdfigError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| MdfigError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	gitignore: &Gitignore,
	exclude: &Gitignore,
	artifact_dir: Option<&str>,
	visited_dirs: &mut HashSet<PathBuf>,
) -> MdfigResult<()> {
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(MdfigError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_dir = path.is_dir();
		let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

		if is_dir && (is_ignored_directory_name(name) || artifact_dir == Some(name)) {
			continue;
		}

		if gitignore.matched(&path, is_dir).is_ignore() || exclude.matched(&path, is_dir).is_ignore()
		{
			continue;
		}

		if is_dir {
			walk_dir(&path, files, gitignore, exclude, artifact_dir, visited_dirs)?;
		} else if is_document_file(&path) {
			files.push(path);
		}
	}

	Ok(())
}
