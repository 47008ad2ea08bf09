use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::Language;
use crate::MdfigError;
use crate::MdfigResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["mdfig.toml", ".mdfig.toml", ".config/mdfig.toml"];

/// Default OpenAI-compatible image generation endpoint.
pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://api.openai.com/v1/images/generations";

/// Configuration loaded from an `mdfig.toml` file.
///
/// ```toml
/// dst_dir = "figs"
/// num_threads = 4
/// viewer = "xdg-open"
///
/// [exclude]
/// patterns = ["drafts/"]
///
/// [hosting]
/// base_url = "https://raw.githubusercontent.com/org/repo/main"
///
/// [docker]
/// enabled = true
///
/// [image]
/// model = "dall-e-3"
/// size = "1024x1024"
/// count = 2
///
/// [renderers.mermaid]
/// command = [["mmdc", "-i", "{input}", "-o", "{output}"]]
/// image = "minlag/mermaid-cli"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct MdfigConfig {
	/// Artifact directory. Relative paths are resolved against each
	/// document's directory.
	#[serde(default)]
	pub dst_dir: Option<PathBuf>,
	/// Worker pool size used with `--parallel`.
	#[serde(default)]
	pub num_threads: Option<usize>,
	/// Command used by the `open` action to display a rendered document.
	#[serde(default)]
	pub viewer: Option<String>,
	/// Exclusion rules applied when walking directory inputs.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	#[serde(default)]
	pub hosting: HostingConfig,
	#[serde(default)]
	pub docker: DockerConfig,
	#[serde(default)]
	pub image: ImageConfig,
	/// Per-language command and docker image overrides, keyed by fence tag.
	#[serde(default)]
	pub renderers: HashMap<String, RendererConfig>,
}

/// Configuration for excluding files and directories when a directory is
/// given as input. Patterns follow gitignore syntax.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Where artifacts are served from when `--use_github_hosting` is set.
#[derive(Debug, Default, Deserialize)]
pub struct HostingConfig {
	/// Base url that artifact paths (relative to the git root) are appended
	/// to, e.g. `https://raw.githubusercontent.com/org/repo/main`.
	#[serde(default)]
	pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DockerConfig {
	/// Run every command renderer step inside its language's docker image.
	#[serde(default)]
	pub enabled: bool,
}

/// Settings for the text-to-image collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
	pub endpoint: String,
	pub model: String,
	pub size: String,
	/// Number of images generated for each prompt.
	pub count: usize,
	pub timeout_secs: u64,
}

impl Default for ImageConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
			model: "dall-e-3".to_string(),
			size: "1024x1024".to_string(),
			count: 1,
			timeout_secs: 120,
		}
	}
}

/// Override for one language's command renderer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RendererConfig {
	/// Command steps, each an argv template. Supported placeholders are
	/// `{input}`, `{output}`, `{stem}` and `{workdir}`.
	#[serde(default)]
	pub command: Option<Vec<Vec<String>>>,
	/// Docker image used when docker mode is enabled.
	#[serde(default)]
	pub image: Option<String>,
}

impl MdfigConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> MdfigResult<Option<MdfigConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		Self::load_file(&config_path).map(Some)
	}

	/// Load the config from an explicit path.
	pub fn load_file(path: &Path) -> MdfigResult<MdfigConfig> {
		let content = std::fs::read_to_string(path)?;
		let config: MdfigConfig =
			toml::from_str(&content).map_err(|e| MdfigError::ConfigParse(e.to_string()))?;

		if let Some(unknown) = config
			.renderers
			.keys()
			.find(|name| Language::parse(name).is_none())
		{
			return Err(MdfigError::ConfigParse(format!(
				"unknown renderer language `{unknown}` in [renderers]"
			)));
		}

		Ok(config)
	}

	/// The override configured for `language`, if any.
	pub fn renderer(&self, language: Language) -> Option<&RendererConfig> {
		self.renderers
			.iter()
			.find(|(name, _)| Language::parse(name) == Some(language))
			.map(|(_, config)| config)
	}
}
