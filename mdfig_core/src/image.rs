use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use ureq::Agent;

use crate::ImageConfig;
use crate::RenderError;
use crate::RenderRequest;
use crate::Renderer;
use crate::renderer::ensure_parent;
use crate::renderer::verify_targets;

/// Environment variable holding the image generation api key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Generates images from a prompt through an OpenAI-compatible images
/// endpoint.
///
/// One request is sent per prompt asking for as many images as the block has
/// targets. Images are written in response order.
#[derive(Debug, Clone)]
pub struct ImageGenerator {
	agent: Agent,
	config: ImageConfig,
	api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
	model: &'a str,
	prompt: &'a str,
	n: usize,
	size: &'a str,
	response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
	data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
	b64_json: Option<String>,
}

impl ImageGenerator {
	/// Create a generator. A missing `api_key` only fails once an `image`
	/// block is actually rendered.
	pub fn new(config: ImageConfig, api_key: Option<String>) -> Self {
		Self {
			agent: create_agent(Duration::from_secs(config.timeout_secs)),
			config,
			api_key: api_key.filter(|key| !key.trim().is_empty()),
		}
	}

	/// Number of images requested for every prompt.
	pub fn count(&self) -> usize {
		self.config.count.max(1)
	}

	fn request_images(&self, prompt: &str, count: usize) -> Result<Vec<Vec<u8>>, RenderError> {
		let api_key = self.api_key.as_deref().ok_or(RenderError::MissingApiKey)?;
		let body = serde_json::to_string(&GenerationRequest {
			model: &self.config.model,
			prompt: prompt.trim(),
			n: count,
			size: &self.config.size,
			response_format: "b64_json",
		})
		.map_err(|e| RenderError::InvalidResponse(e.to_string()))?;

		debug!(endpoint = %self.config.endpoint, count, "requesting generated images");

		let response = self
			.agent
			.post(&self.config.endpoint)
			.header("Authorization", format!("Bearer {api_key}"))
			.header("Content-Type", "application/json")
			.send(body.as_bytes())
			.map_err(|e| RenderError::Http(e.to_string()))?;

		let status = response.status().as_u16();
		let mut body = response.into_body();
		let text = body
			.read_to_string()
			.map_err(|e| RenderError::Http(e.to_string()))?;

		if status >= 400 {
			return Err(RenderError::Http(format!("HTTP {status}: {}", text.trim())));
		}

		decode_images(&text, count)
	}
}

impl Renderer for ImageGenerator {
	fn render(&self, request: &RenderRequest) -> Result<Vec<PathBuf>, RenderError> {
		let images = self.request_images(&request.content, request.targets.len())?;

		for (target, bytes) in request.targets.iter().zip(&images) {
			ensure_parent(target)?;
			if let Err(error) = std::fs::write(target, bytes) {
				for written in &request.targets {
					let _ = std::fs::remove_file(written);
				}
				return Err(error.into());
			}
		}

		verify_targets(&request.targets)
	}
}

/// Create an HTTP agent that reports error statuses as responses.
pub fn create_agent(timeout: Duration) -> Agent {
	Agent::config_builder()
		.timeout_global(Some(timeout))
		.http_status_as_error(false)
		.build()
		.into()
}

/// Decode the `b64_json` images of a generation response. Fewer than
/// `expected` images is an error.
pub fn decode_images(body: &str, expected: usize) -> Result<Vec<Vec<u8>>, RenderError> {
	let response: GenerationResponse =
		serde_json::from_str(body).map_err(|e| RenderError::InvalidResponse(e.to_string()))?;

	let images = response
		.data
		.into_iter()
		.map(|image| {
			let encoded = image.b64_json.ok_or_else(|| {
				RenderError::InvalidResponse("image entry without `b64_json`".to_string())
			})?;
			BASE64_STANDARD
				.decode(encoded.trim())
				.map_err(|e| RenderError::InvalidResponse(format!("invalid base64 image: {e}")))
		})
		.take(expected)
		.collect::<Result<Vec<_>, _>>()?;

	if images.len() < expected {
		return Err(RenderError::InvalidResponse(format!(
			"expected {expected} image(s), received {}",
			images.len()
		)));
	}

	Ok(images)
}
