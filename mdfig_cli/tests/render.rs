use common::COPY_CONFIG;
use common::MERMAID_AND_SQL;
use common::TWO_MERMAID;
use common::mdfig_cmd;
use common::read;
use common::write;
use mdfig_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;
use similar_asserts::assert_eq;

mod common;

#[test]
fn render_updates_document_in_place() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md"])
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated doc.md"))
		.stdout(predicates::str::contains("1 rendered"));

	let content = read(tmp.path(), "doc.md")?;
	assert!(content.contains("<!-- mdfig:begin -->"));
	assert!(content.contains("[//]: # (graph TD; A-->B)"));
	assert!(content.contains("![](figs/doc.mermaid.1.png)"));
	assert!(content.contains("```sql\nselect 1;\n```"));
	assert_eq!(
		read(tmp.path(), "figs/doc.mermaid.1.png")?,
		"graph TD; A-->B\n"
	);

	Ok(())
}

#[test]
fn render_twice_leaves_document_unchanged() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path()).args(["-i", "doc.md"]).assert().success();
	let first = read(tmp.path(), "doc.md")?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md"])
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated").not());
	assert_eq!(read(tmp.path(), "doc.md")?, first);

	Ok(())
}

#[test]
fn remove_restores_original_document() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path()).args(["-i", "doc.md"]).assert().success();
	assert!(tmp.path().join("figs/doc.mermaid.1.png").exists());

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--action", "remove"])
		.assert()
		.success()
		.stdout(predicates::str::contains("1 removed"));

	assert_eq!(read(tmp.path(), "doc.md")?, MERMAID_AND_SQL);
	assert!(!tmp.path().join("figs/doc.mermaid.1.png").exists());

	Ok(())
}

#[test]
fn dry_run_writes_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--dry_run"])
		.assert()
		.success()
		.stdout(predicates::str::contains("figs/doc.mermaid.1.png"))
		.stdout(predicates::str::contains("Dry run"));

	assert_eq!(read(tmp.path(), "doc.md")?, MERMAID_AND_SQL);
	assert!(!tmp.path().join("figs").exists());

	Ok(())
}

#[test]
fn limit_selects_blocks_by_index() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", TWO_MERMAID)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--limit", "2"])
		.assert()
		.success()
		.stdout(predicates::str::contains("1 rendered, 0 removed, 1 skipped"));

	let content = read(tmp.path(), "doc.md")?;
	assert!(content.starts_with("```mermaid\ngraph TD; A-->B\n```\n"));
	assert!(content.contains("![](figs/doc.mermaid.2.png)"));
	assert!(!tmp.path().join("figs/doc.mermaid.1.png").exists());

	Ok(())
}

#[test]
fn parallel_run_renders_every_input() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "a.md", TWO_MERMAID)?;
	write(tmp.path(), "b.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "a.md,b.md", "--parallel", "--num_threads", "2"])
		.assert()
		.success()
		.stdout(predicates::str::contains("3 rendered"))
		.stdout(predicates::str::contains("in 2 document(s)"));

	for artifact in [
		"figs/a.mermaid.1.png",
		"figs/a.mermaid.2.png",
		"figs/b.mermaid.1.png",
	] {
		assert!(tmp.path().join(artifact).exists(), "missing {artifact}");
	}

	Ok(())
}

#[test]
fn files_from_reads_document_list() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "docs/guide.md", MERMAID_AND_SQL)?;
	write(tmp.path(), "list.txt", "# documents\ndocs/guide.md\n")?;

	mdfig_cmd(tmp.path())
		.args(["--files_from", "list.txt"])
		.assert()
		.success();

	assert!(read(tmp.path(), "docs/guide.md")?.contains("![](figs/guide.mermaid.1.png)"));
	assert!(tmp.path().join("docs/figs/guide.mermaid.1.png").exists());

	Ok(())
}

#[test]
fn directory_input_is_walked() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "docs/one.md", TWO_MERMAID)?;
	write(tmp.path(), "docs/nested/two.md", MERMAID_AND_SQL)?;
	write(tmp.path(), "docs/notes.rst", "not a document")?;

	mdfig_cmd(tmp.path())
		.args(["-i", "docs"])
		.assert()
		.success()
		.stdout(predicates::str::contains("in 2 document(s)"));

	assert!(tmp.path().join("docs/figs/one.mermaid.2.png").exists());
	assert!(tmp.path().join("docs/nested/figs/two.mermaid.1.png").exists());

	Ok(())
}

#[test]
fn json_format_reports_counts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", TWO_MERMAID)?;

	let output = mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--format", "json"])
		.output()?;
	assert!(output.status.success());

	let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], true);
	assert_eq!(json["rendered"], 2);
	assert_eq!(json["failed"], 0);
	assert_eq!(json["documents"].as_array().map(Vec::len), Some(1));

	Ok(())
}

#[test]
fn output_flag_leaves_input_untouched() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "src/doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "src/doc.md", "-o", "out/doc.md"])
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated out/doc.md"));

	assert_eq!(read(tmp.path(), "src/doc.md")?, MERMAID_AND_SQL);
	let rendered = read(tmp.path(), "out/doc.md")?;
	assert!(rendered.contains("![](../src/figs/doc.mermaid.1.png)"));

	Ok(())
}

#[test]
fn dst_dir_flag_moves_artifacts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--dst_dir", "images"])
		.assert()
		.success();

	assert!(tmp.path().join("images/doc.mermaid.1.png").exists());
	assert!(read(tmp.path(), "doc.md")?.contains("![](images/doc.mermaid.1.png)"));

	Ok(())
}

#[test]
fn github_hosting_embeds_urls() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), "mdfig.toml", COPY_CONFIG)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;
	std::fs::create_dir(tmp.path().join(".git"))?;

	mdfig_cmd(tmp.path())
		.args([
			"-i",
			"doc.md",
			"--use_github_hosting",
			"--hosting_url",
			"https://raw.example.com/org/repo/main/",
		])
		.assert()
		.success();

	assert!(read(tmp.path(), "doc.md")?.contains(
		"![](https://raw.example.com/org/repo/main/figs/doc.mermaid.1.png)"
	));

	Ok(())
}

#[test]
fn open_writes_copy_and_runs_viewer() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(
		tmp.path(),
		"mdfig.toml",
		&format!("viewer = \"true\"\n\n{COPY_CONFIG}"),
	)?;
	write(tmp.path(), "doc.md", MERMAID_AND_SQL)?;

	mdfig_cmd(tmp.path())
		.args(["-i", "doc.md", "--action", "open", "-o", "preview.md"])
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated preview.md"));

	assert_eq!(read(tmp.path(), "doc.md")?, MERMAID_AND_SQL);
	assert!(read(tmp.path(), "preview.md")?.contains("![](figs/doc.mermaid.1.png)"));

	Ok(())
}

#[test]
fn open_keeps_same_named_documents_apart() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let scratch = tmp.path().join("scratch");
	std::fs::create_dir(&scratch)?;
	write(
		tmp.path(),
		"mdfig.toml",
		&format!("viewer = \"true\"\n\n{COPY_CONFIG}"),
	)?;
	write(tmp.path(), "a/doc.md", MERMAID_AND_SQL)?;
	write(tmp.path(), "b/doc.md", TWO_MERMAID)?;

	mdfig_cmd(tmp.path())
		.env("TMPDIR", &scratch)
		.args(["-i", "a/doc.md,b/doc.md", "--action", "open"])
		.assert()
		.success()
		.stdout(predicates::str::contains("3 rendered"));

	let first = read(&scratch, "mdfig/a/doc.rendered.md")?;
	let second = read(&scratch, "mdfig/b/doc.rendered.md")?;
	assert!(first.contains("a/figs/doc.mermaid.1.png"));
	assert!(!first.contains("doc.mermaid.2.png"));
	assert!(second.contains("b/figs/doc.mermaid.2.png"));
	assert_eq!(read(tmp.path(), "a/doc.md")?, MERMAID_AND_SQL);
	assert_eq!(read(tmp.path(), "b/doc.md")?, TWO_MERMAID);

	Ok(())
}
