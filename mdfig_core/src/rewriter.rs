use std::collections::BTreeMap;
use std::path::Path;

use crate::Block;
use crate::BlockOutcome;
use crate::Document;
use crate::HostKind;
use crate::Segment;
use crate::namer::absolute;
use crate::namer::relative_path;

/// Produce the new text of `document` from its segments and the outcome of
/// each block, keyed by block index.
///
/// Text segments are copied verbatim. A block with a `Rendered` outcome
/// becomes a marker region holding the commented original and its embeds. A
/// `Removed` block, or a failed block that cannot keep its prior region, is
/// replaced by the original fenced block. Anything else, including a block
/// with no outcome, is copied verbatim.
///
/// When `output_dir` differs from the document's directory, kept marker
/// regions are rebuilt with their local embeds made relative to `output_dir`.
pub fn rewrite(
	document: &Document,
	segments: &[Segment],
	outcomes: &BTreeMap<usize, BlockOutcome>,
	output_dir: &Path,
) -> String {
	let mut output = String::with_capacity(document.text.len());
	let relocated = absolute(output_dir) != absolute(document.dir());

	for segment in segments {
		match segment {
			Segment::Text(range) => output.push_str(&document.text[range.clone()]),
			Segment::Block(block) => {
				match outcomes.get(&block.index) {
					Some(BlockOutcome::Rendered { embeds, .. }) => {
						output.push_str(&rendered_region(
							document.host,
							block,
							embeds,
							document.newline,
						));
					}
					Some(
						BlockOutcome::Removed { .. }
						| BlockOutcome::Failed {
							keep_prior: false,
							..
						},
					) => output.push_str(&restored_block(block, document.newline)),
					Some(BlockOutcome::Skipped { .. } | BlockOutcome::Failed { .. }) | None => {
						if relocated && block.is_rendered() {
							let embeds: Vec<String> = block
								.prior_embeds()
								.iter()
								.map(|embed| rebase_embed(embed, document.dir(), output_dir))
								.collect();
							output.push_str(&rendered_region(
								document.host,
								block,
								&embeds,
								document.newline,
							));
						} else {
							output.push_str(&document.text[block.span.clone()]);
						}
					}
				}
			}
		}
	}

	output
}

/// The marker region for a block: begin marker, the commented original
/// fence, one embed line per artifact and the end marker.
pub fn rendered_region(host: HostKind, block: &Block, embeds: &[String], newline: &str) -> String {
	let indent = block.indent.as_str();
	let mut lines = Vec::with_capacity(block.fence_lines.len() + embeds.len() + 2);

	lines.push(format!("{indent}{}", host.begin_marker()));
	lines.extend(block.fence_lines.iter().map(|line| host.comment(line, indent)));
	lines.extend(embeds.iter().map(|embed| format!("{indent}{}", host.embed(embed))));
	lines.push(format!("{indent}{}", host.end_marker()));

	finish(lines.join(newline), block.terminated, newline)
}

/// The original fenced block, uncommented.
pub fn restored_block(block: &Block, newline: &str) -> String {
	finish(block.fence_lines.join(newline), block.terminated, newline)
}

/// A local embed written next to `from` rewritten for a document in `to`.
/// Urls are left alone.
fn rebase_embed(embed: &str, from: &Path, to: &Path) -> String {
	if embed.contains("://") {
		return embed.to_string();
	}

	relative_path(to, &from.join(embed))
}

fn finish(mut text: String, terminated: bool, newline: &str) -> String {
	if terminated {
		text.push_str(newline);
	}

	text
}
