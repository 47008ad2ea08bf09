use serde::Deserialize;
use serde::Serialize;

/// The diagram languages that can be rendered into an image.
///
/// This is the closed set of fence tags the dispatch table knows about. A
/// fence tagged with anything else is left in the document as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	/// `plantuml` / `puml` fences.
	PlantUml,
	/// `mermaid` fences.
	Mermaid,
	/// `graphviz` / `dot` fences.
	Graphviz,
	/// `tikz` fences, compiled as a standalone LaTeX picture.
	Tikz,
	/// `latex` fences, compiled as a standalone LaTeX document.
	Latex,
	/// `image` / `dalle` fences. The content is a prompt for a text-to-image
	/// model.
	Image,
}

impl Language {
	pub const ALL: [Self; 6] = [
		Self::PlantUml,
		Self::Mermaid,
		Self::Graphviz,
		Self::Tikz,
		Self::Latex,
		Self::Image,
	];

	/// Parse a language from the tag of a fence info string.
	///
	/// Returns `None` for tags that have no renderer.
	#[must_use]
	pub fn parse(tag: &str) -> Option<Self> {
		let tag = tag.trim().trim_start_matches('{').trim_end_matches('}');

		match tag.to_ascii_lowercase().as_str() {
			"plantuml" | "puml" => Some(Self::PlantUml),
			"mermaid" => Some(Self::Mermaid),
			"graphviz" | "dot" => Some(Self::Graphviz),
			"tikz" => Some(Self::Tikz),
			"latex" => Some(Self::Latex),
			"image" | "dalle" => Some(Self::Image),
			_ => None,
		}
	}

	/// Canonical tag, also used in artifact file names.
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::PlantUml => "plantuml",
			Self::Mermaid => "mermaid",
			Self::Graphviz => "graphviz",
			Self::Tikz => "tikz",
			Self::Latex => "latex",
			Self::Image => "image",
		}
	}

	/// Extension of the scratch source file handed to a command renderer.
	#[must_use]
	pub fn source_extension(self) -> &'static str {
		match self {
			Self::PlantUml => "puml",
			Self::Mermaid => "mmd",
			Self::Graphviz => "dot",
			Self::Tikz | Self::Latex => "tex",
			Self::Image => "txt",
		}
	}

	/// Whether the block is compiled through a LaTeX toolchain.
	#[must_use]
	pub fn is_latex(self) -> bool {
		matches!(self, Self::Tikz | Self::Latex)
	}
}

impl std::fmt::Display for Language {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
