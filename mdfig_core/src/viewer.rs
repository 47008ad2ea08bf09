use std::path::Path;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;

use crate::RenderError;

/// The platform's default command for opening a file.
pub fn default_viewer() -> &'static str {
	if cfg!(target_os = "macos") { "open" } else { "xdg-open" }
}

/// Open `document` with `viewer`, or with the platform default.
///
/// The viewer may be a command with arguments (`"code --wait"`); the
/// document path is appended as the last argument. Only a failure to start
/// the viewer or a non-zero exit is reported.
pub fn launch_viewer(viewer: Option<&str>, document: &Path) -> Result<(), RenderError> {
	let command = viewer
		.filter(|command| !command.trim().is_empty())
		.unwrap_or(default_viewer());
	let mut parts = command.split_whitespace();
	let program = parts.next().unwrap_or(default_viewer());
	let args: Vec<&str> = parts.collect();

	debug!(program, ?args, document = %document.display(), "launching viewer");

	let status = Command::new(program)
		.args(&args)
		.arg(document)
		.stdin(Stdio::null())
		.status()
		.map_err(|source| {
			RenderError::Spawn {
				program: program.to_string(),
				source,
			}
		})?;

	if status.success() {
		Ok(())
	} else {
		Err(RenderError::CommandFailed {
			program: program.to_string(),
			status: status.to_string(),
			stderr: String::new(),
		})
	}
}
