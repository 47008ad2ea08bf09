use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::ArtifactNamer;
use crate::Dispatcher;
use crate::Language;
use crate::MdfigConfig;
use crate::RenderContext;
use crate::RenderError;
use crate::RenderOptions;
use crate::RenderRequest;
use crate::Renderer;

/// Requests received by a [`FakeRenderer`], shared with the test.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<RenderRequest>>>);

impl CallLog {
	pub fn requests(&self) -> Vec<RenderRequest> {
		self.0
			.lock()
			.unwrap_or_else(|e| panic!("call log poisoned: {e}"))
			.clone()
	}

	pub fn indices(&self) -> Vec<usize> {
		let mut indices: Vec<usize> = self.requests().iter().map(|r| r.index).collect();
		indices.sort_unstable();
		indices
	}

	pub fn len(&self) -> usize {
		self.requests().len()
	}

	fn push(&self, request: &RenderRequest) {
		self.0
			.lock()
			.unwrap_or_else(|e| panic!("call log poisoned: {e}"))
			.push(request.clone());
	}
}

/// Writes the block content into every target and fails for the listed
/// block indices.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
	log: CallLog,
	fail_indices: Vec<usize>,
}

impl FakeRenderer {
	pub fn new(log: CallLog) -> Self {
		Self {
			log,
			fail_indices: Vec::new(),
		}
	}

	pub fn failing(log: CallLog, fail_indices: &[usize]) -> Self {
		Self {
			log,
			fail_indices: fail_indices.to_vec(),
		}
	}
}

impl Renderer for FakeRenderer {
	fn render(&self, request: &RenderRequest) -> Result<Vec<PathBuf>, RenderError> {
		self.log.push(request);

		if self.fail_indices.contains(&request.index) {
			return Err(RenderError::CommandFailed {
				program: "fake".to_string(),
				status: "exit status: 1".to_string(),
				stderr: format!("block {} is broken", request.index),
			});
		}

		for target in &request.targets {
			if let Some(parent) = target.parent() {
				std::fs::create_dir_all(parent)?;
			}
			std::fs::write(
				target,
				format!("{}:{}", request.language, request.content),
			)?;
		}

		Ok(request.targets.clone())
	}
}

/// A dispatcher routing every language to `renderer`.
pub fn fake_dispatcher(renderer: &FakeRenderer) -> Dispatcher {
	Language::ALL
		.into_iter()
		.fold(Dispatcher::new(&MdfigConfig::default(), None), |dispatcher, language| {
			dispatcher.with_renderer(language, renderer.clone())
		})
}

/// A render context using a fake renderer for every language.
pub fn fake_context(options: RenderOptions) -> (RenderContext, CallLog) {
	let log = CallLog::default();
	let ctx = RenderContext {
		dispatcher: fake_dispatcher(&FakeRenderer::new(log.clone())),
		namer: ArtifactNamer::default(),
		options,
	};

	(ctx, log)
}

/// A render context whose renderer fails for the given block indices.
pub fn failing_context(options: RenderOptions, fail_indices: &[usize]) -> (RenderContext, CallLog) {
	let log = CallLog::default();
	let ctx = RenderContext {
		dispatcher: fake_dispatcher(&FakeRenderer::failing(log.clone(), fail_indices)),
		namer: ArtifactNamer::default(),
		options,
	};

	(ctx, log)
}

pub fn write_file(path: &Path, content: &str) {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

pub fn read_file(path: &Path) -> String {
	std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

pub const MERMAID_AND_SQL: &str = "# Title

```mermaid
graph TD; A-->B
```

```sql
select 1;
```
";

pub const THREE_PLANTUML: &str = "Intro

```plantuml
Alice -> Bob
```

Middle

```puml
Bob -> Carol
```

~~~plantuml
Carol -> Alice
~~~
";

pub const NESTED_FENCES: &str = "````markdown
```mermaid
graph LR; X-->Y
```
<!-- mdfig:end -->
````

```graphviz
digraph { a -> b }
```
";
