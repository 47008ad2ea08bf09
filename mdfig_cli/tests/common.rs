#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

/// Config routing mermaid blocks through `cp`, so the "image" is a copy of
/// the block source.
pub const COPY_CONFIG: &str = r#"[renderers.mermaid]
command = [["cp", "{input}", "{output}"]]
"#;

/// Config whose mermaid renderer always exits with a failure.
pub const FAILING_CONFIG: &str = r#"[renderers.mermaid]
command = [["false"]]
"#;

pub const MERMAID_AND_SQL: &str = "# Title

```mermaid
graph TD; A-->B
```

```sql
select 1;
```
";

pub const TWO_MERMAID: &str = "```mermaid
graph TD; A-->B
```

```mermaid
graph LR; C-->D
```
";

pub fn mdfig_cmd(dir: &Path) -> Command {
	let mut cmd = Command::new(get_cargo_bin("mdfig"));
	cmd.env("NO_COLOR", "1")
		.env_remove("MDFIG_LOG")
		.env_remove("RUST_LOG")
		.current_dir(dir);
	cmd
}

pub fn write(dir: &Path, name: &str, content: &str) -> std::io::Result<()> {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}

pub fn read(dir: &Path, name: &str) -> std::io::Result<String> {
	std::fs::read_to_string(dir.join(name))
}
