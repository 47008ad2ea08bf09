use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MdfigError {
	#[error(transparent)]
	#[diagnostic(code(mdfig::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read `{path}`: {source}")]
	#[diagnostic(code(mdfig::read_document))]
	ReadDocument {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("unterminated code fence in {file} at line {line}")]
	#[diagnostic(
		code(mdfig::unterminated_fence),
		help("close the fence opened on line {line} with a matching line of backticks or tildes")
	)]
	UnterminatedFence { file: String, line: usize },

	#[error("malformed embed marker in {file} at line {line}: {reason}")]
	#[diagnostic(
		code(mdfig::malformed_marker),
		help("fix the marker region by hand or restore the original fenced block")
	)]
	MalformedMarker {
		file: String,
		line: usize,
		reason: String,
	},

	#[error("unsupported document type: `{0}`")]
	#[diagnostic(
		code(mdfig::unsupported_extension),
		help("supported document extensions: md, markdown, txt, tex")
	)]
	UnsupportedExtension(String),

	#[error("artifact path `{path}` is claimed by both {first} and {second}")]
	#[diagnostic(
		code(mdfig::naming_collision),
		help("documents sharing a file name need distinct destination directories")
	)]
	NamingCollision {
		path: String,
		first: String,
		second: String,
	},

	#[error("output document `{path}` would be written for both {first} and {second}")]
	#[diagnostic(
		code(mdfig::duplicate_output),
		help("give each input document its own output path")
	)]
	DuplicateOutput {
		path: String,
		first: String,
		second: String,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(mdfig::config_parse),
		help("check that mdfig.toml is valid TOML and uses the documented keys")
	)]
	ConfigParse(String),

	#[error("invalid block limit `{0}`")]
	#[diagnostic(
		code(mdfig::invalid_limit),
		help("use `START:END` with 1-based inclusive indices, e.g. `2:4`, `:3` or `5:`")
	)]
	InvalidLimit(String),

	#[error("`--output` can only be used with a single input document, got {0}")]
	#[diagnostic(code(mdfig::output_with_multiple_inputs))]
	OutputWithMultipleInputs(usize),

	#[error("no input documents were given")]
	#[diagnostic(
		code(mdfig::no_inputs),
		help("pass documents with `--input`, or a list of paths with `--files_from`")
	)]
	NoInputs,

	#[error("github hosting was requested but no hosting url is configured")]
	#[diagnostic(
		code(mdfig::missing_hosting_url),
		help("pass `--hosting_url` or set `base_url` in the `[hosting]` section of mdfig.toml")
	)]
	MissingHostingUrl,

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(mdfig::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },

	#[error("failed to build worker pool: {0}")]
	#[diagnostic(code(mdfig::thread_pool))]
	ThreadPool(String),
}

/// A failure to render one block. These never abort a run; they are recorded
/// against the block that produced them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
	#[error("failed to start `{program}`: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("`{program}` exited with {status}: {stderr}")]
	CommandFailed {
		program: String,
		status: String,
		stderr: String,
	},

	#[error("renderer finished but `{0}` was not produced")]
	MissingOutput(String),

	#[error("no api key for image generation (set OPENAI_API_KEY or pass --api_key)")]
	MissingApiKey,

	#[error("HTTP error: {0}")]
	Http(String),

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

pub type MdfigResult<T> = Result<T, MdfigError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
