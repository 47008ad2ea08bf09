use std::ops::Range;

use serde::Serialize;

use crate::HostKind;
use crate::Language;

/// A structural problem found while scanning. These are fatal for the
/// document; the orchestrator attaches the file name before reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
	/// A fence was opened on `line` and never closed.
	UnterminatedFence { line: usize },
	/// An embed marker pair is not well formed.
	MalformedMarker { line: usize, reason: String },
}

/// One piece of a scanned document. Segments are ordered, never overlap, and
/// together cover every byte of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
	/// Plain text, including fences whose language has no renderer.
	Text(Range<usize>),
	/// A renderable block, either fresh or already rendered.
	Block(Block),
}

/// Whether a block is still a plain fence or sits inside an embed marker
/// pair written by a previous run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockState {
	/// An untouched fenced block.
	Fresh,
	/// A commented-out fence followed by its embeds. `embeds` holds the image
	/// references exactly as written in the document.
	Rendered { embeds: Vec<String> },
}

/// A renderable fenced block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
	/// 1-based position among the renderable blocks of the document.
	pub index: usize,
	/// The language declared on the opening fence.
	pub language: Language,
	/// Content between the fences with the fence indent removed. Every line
	/// ends with a newline.
	pub content: String,
	/// Byte range in the document, including the line terminator of the last
	/// line when there is one.
	pub span: Range<usize>,
	/// 1-based line of the opening fence, or of the begin marker for a
	/// rendered block.
	pub line: usize,
	/// Leading whitespace of the opening fence.
	pub indent: String,
	/// The original fenced block, one entry per line without terminators.
	pub fence_lines: Vec<String>,
	/// Whether the last line of the span ends with a line terminator.
	pub terminated: bool,
	pub state: BlockState,
}

impl Block {
	pub fn start_offset(&self) -> usize {
		self.span.start
	}

	pub fn end_offset(&self) -> usize {
		self.span.end
	}

	pub fn is_rendered(&self) -> bool {
		matches!(self.state, BlockState::Rendered { .. })
	}

	/// The image references of a previous run, empty for a fresh block.
	pub fn prior_embeds(&self) -> &[String] {
		match &self.state {
			BlockState::Fresh => &[],
			BlockState::Rendered { embeds } => embeds,
		}
	}
}

/// A line of the document. `end` excludes the terminator, `next` is the
/// offset of the following line.
#[derive(Debug, Clone, Copy)]
struct Line {
	start: usize,
	end: usize,
	next: usize,
}

impl Line {
	fn text(self, source: &str) -> &str {
		&source[self.start..self.end]
	}

	fn terminated(self) -> bool {
		self.next > self.end
	}
}

fn split_lines(source: &str) -> Vec<Line> {
	let mut lines = Vec::new();
	let mut start = 0;

	for piece in source.split_inclusive('\n') {
		let next = start + piece.len();
		let content = piece.strip_suffix('\n').unwrap_or(piece);
		let content = content.strip_suffix('\r').unwrap_or(content);
		lines.push(Line {
			start,
			end: start + content.len(),
			next,
		});
		start = next;
	}

	lines
}

/// An opening fence: indent, fence character, fence length and info string
/// tag.
#[derive(Debug, Clone)]
struct Fence {
	indent: String,
	marker: char,
	length: usize,
	tag: String,
}

impl Fence {
	fn parse(line: &str) -> Option<Self> {
		let body = line.trim_start_matches([' ', '\t']);
		let indent = &line[..line.len() - body.len()];
		let marker = body.chars().next().filter(|c| *c == '`' || *c == '~')?;
		let length = body.chars().take_while(|c| *c == marker).count();

		if length < 3 {
			return None;
		}

		let info = body[length..].trim();
		if marker == '`' && info.contains('`') {
			return None;
		}

		let tag = info.split_whitespace().next().unwrap_or("").to_string();

		Some(Self {
			indent: indent.to_string(),
			marker,
			length,
			tag,
		})
	}

	fn is_closed_by(&self, line: &str) -> bool {
		let Some(rest) = line.strip_prefix(self.indent.as_str()) else {
			return false;
		};
		let count = rest.chars().take_while(|c| *c == self.marker).count();

		count >= self.length && rest[count..].trim().is_empty()
	}

	fn strip_indent<'a>(&self, line: &'a str) -> &'a str {
		line.strip_prefix(self.indent.as_str()).unwrap_or(line)
	}
}

/// Scan a document into segments.
///
/// Fences whose tag has no renderer are kept as text, and their contents are
/// never inspected for blocks or markers. Regions between embed markers are
/// surfaced as rendered blocks, with the original fence recovered from the
/// commented lines.
pub fn scan(source: &str, host: HostKind) -> Result<Vec<Segment>, ScanError> {
	let lines = split_lines(source);
	let mut segments = Vec::new();
	let mut text_start = 0;
	let mut index = 0;
	let mut cursor = 0;

	while cursor < lines.len() {
		let line = lines[cursor];
		let text = line.text(source);

		if host.is_end_marker(text) {
			return Err(ScanError::MalformedMarker {
				line: cursor + 1,
				reason: "end marker without a matching begin marker".to_string(),
			});
		}

		if host.is_begin_marker(text) {
			let close = find_end_marker(source, &lines, cursor, host)?;
			index += 1;
			let block = rendered_block(source, &lines, cursor, close, host, index)?;
			push_text(&mut segments, text_start, block.span.start);
			text_start = block.span.end;
			segments.push(Segment::Block(block));
			cursor = close + 1;
			continue;
		}

		let Some(fence) = Fence::parse(text) else {
			cursor += 1;
			continue;
		};

		let close = lines[cursor + 1..]
			.iter()
			.position(|candidate| fence.is_closed_by(candidate.text(source)))
			.map(|offset| cursor + 1 + offset)
			.ok_or(ScanError::UnterminatedFence { line: cursor + 1 })?;

		if let Some(language) = Language::parse(&fence.tag) {
			index += 1;
			let fence_lines: Vec<String> = lines[cursor..=close]
				.iter()
				.map(|l| l.text(source).to_string())
				.collect();
			let content = block_content(&fence, &fence_lines);
			let span = line.start..lines[close].next;

			push_text(&mut segments, text_start, span.start);
			text_start = span.end;
			segments.push(Segment::Block(Block {
				index,
				language,
				content,
				span,
				line: cursor + 1,
				indent: fence.indent.clone(),
				fence_lines,
				terminated: lines[close].terminated(),
				state: BlockState::Fresh,
			}));
		}

		cursor = close + 1;
	}

	push_text(&mut segments, text_start, source.len());

	Ok(segments)
}

fn push_text(segments: &mut Vec<Segment>, start: usize, end: usize) {
	if start < end {
		segments.push(Segment::Text(start..end));
	}
}

fn block_content(fence: &Fence, fence_lines: &[String]) -> String {
	let inner = &fence_lines[1..fence_lines.len() - 1];
	let mut content = String::new();

	for line in inner {
		content.push_str(fence.strip_indent(line));
		content.push('\n');
	}

	content
}

fn find_end_marker(
	source: &str,
	lines: &[Line],
	open: usize,
	host: HostKind,
) -> Result<usize, ScanError> {
	for (offset, line) in lines[open + 1..].iter().enumerate() {
		let text = line.text(source);
		if host.is_end_marker(text) {
			return Ok(open + 1 + offset);
		}
		if host.is_begin_marker(text) {
			return Err(ScanError::MalformedMarker {
				line: open + 2 + offset,
				reason: format!("begin marker nested inside the region opened on line {}", open + 1),
			});
		}
	}

	Err(ScanError::MalformedMarker {
		line: open + 1,
		reason: "begin marker without a matching end marker".to_string(),
	})
}

/// Rebuild a block from the region between a begin marker on line `open` and
/// an end marker on line `close` (0-based line numbers).
fn rendered_block(
	source: &str,
	lines: &[Line],
	open: usize,
	close: usize,
	host: HostKind,
	index: usize,
) -> Result<Block, ScanError> {
	let malformed = |line: usize, reason: &str| {
		ScanError::MalformedMarker {
			line: line + 1,
			reason: reason.to_string(),
		}
	};

	let marker = lines[open].text(source);
	let indent = &marker[..marker.len() - marker.trim_start_matches([' ', '\t']).len()];

	let mut fence_lines = Vec::new();
	let mut cursor = open + 1;
	while cursor < close {
		match host.uncomment(lines[cursor].text(source), indent) {
			Some(line) => fence_lines.push(line),
			None => break,
		}
		cursor += 1;
	}

	let mut embeds = Vec::new();
	while cursor < close {
		let text = lines[cursor].text(source);
		if !text.trim().is_empty() {
			let embed = host
				.parse_embed(text)
				.ok_or_else(|| malformed(cursor, "unexpected line inside a rendered region"))?;
			embeds.push(embed);
		}
		cursor += 1;
	}

	if embeds.is_empty() {
		return Err(malformed(open, "rendered region has no embedded image"));
	}

	let fence = fence_lines
		.first()
		.and_then(|first| Fence::parse(first))
		.ok_or_else(|| malformed(open, "rendered region does not hold a fenced block"))?;
	let language = Language::parse(&fence.tag)
		.ok_or_else(|| malformed(open, "rendered region holds an unsupported fence language"))?;
	let closing = fence_lines
		.iter()
		.skip(1)
		.position(|line| fence.is_closed_by(line))
		.map(|offset| offset + 1);

	if closing != Some(fence_lines.len() - 1) {
		return Err(malformed(
			open,
			"commented fence is not closed at the end of the region",
		));
	}

	let content = block_content(&fence, &fence_lines);

	Ok(Block {
		index,
		language,
		content,
		span: lines[open].start..lines[close].next,
		line: open + 1,
		indent: fence.indent.clone(),
		fence_lines,
		terminated: lines[close].terminated(),
		state: BlockState::Rendered { embeds },
	})
}
