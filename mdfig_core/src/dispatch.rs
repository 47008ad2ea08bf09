use std::collections::HashMap;

use crate::CommandRenderer;
use crate::ImageGenerator;
use crate::Language;
use crate::MdfigConfig;
use crate::Renderer;

/// The fixed mapping from block language to the collaborator that renders
/// it.
///
/// Every [`Language`] has a renderer, so dispatch cannot fail; fences with
/// unknown tags never become blocks in the first place. Individual languages
/// can be routed to another renderer with
/// [`with_renderer`](Self::with_renderer).
pub struct Dispatcher {
	command: CommandRenderer,
	image: ImageGenerator,
	overrides: HashMap<Language, Box<dyn Renderer>>,
}

impl Dispatcher {
	/// Build the dispatch table from config. `api_key` is used by the
	/// `image` collaborator.
	pub fn new(config: &MdfigConfig, api_key: Option<String>) -> Self {
		Self {
			command: CommandRenderer::from_config(config),
			image: ImageGenerator::new(config.image.clone(), api_key),
			overrides: HashMap::new(),
		}
	}

	/// Route `language` to `renderer` instead of its built-in collaborator.
	#[must_use]
	pub fn with_renderer(mut self, language: Language, renderer: impl Renderer + 'static) -> Self {
		self.overrides.insert(language, Box::new(renderer));
		self
	}

	pub fn dispatch(&self, language: Language) -> &dyn Renderer {
		if let Some(renderer) = self.overrides.get(&language) {
			return renderer.as_ref();
		}

		match language {
			Language::PlantUml
			| Language::Mermaid
			| Language::Graphviz
			| Language::Tikz
			| Language::Latex => &self.command,
			Language::Image => &self.image,
		}
	}

	/// Number of artifacts one block of `language` produces.
	pub fn artifact_count(&self, language: Language) -> usize {
		match language {
			Language::Image => self.image.count(),
			_ => 1,
		}
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("command", &self.command)
			.field("image", &self.image)
			.field("overrides", &self.overrides.keys().collect::<Vec<_>>())
			.finish()
	}
}
