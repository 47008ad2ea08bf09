//! `mdfig_core` is the core library for mdfig, a tool that renders diagram
//! fences in markdown and LaTeX documents into images and embeds them next to
//! the commented-out source.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Document text
//!   → Scanner (splits the text into plain text and renderable blocks)
//!   → Orchestrator (names artifacts, plans work, runs renderers on a bounded pool)
//!   → Dispatcher (routes each block to its command or image renderer)
//!   → Rewriter (comments out the original block and inserts the embeds)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `mdfig.toml`.
//! - [`inputs`]: File lists, directory walking and input de-duplication.
//! - [`viewer`]: Launching a viewer for the `open` action.
//!
//! ## Key Types
//!
//! - [`Block`]: A renderable fenced block, fresh or already rendered.
//! - [`Language`]: The closed set of diagram languages.
//! - [`Dispatcher`]: The language to renderer table.
//! - [`ArtifactNamer`]: Deterministic artifact paths.
//! - [`RenderContext`]: Dispatcher, namer and options shared by a run.
//! - [`RunSummary`]: Per-document reports and structural errors of a run.
//!
//! ## Marker format
//!
//! A rendered markdown block looks like this:
//!
//! ```markdown
//! <!-- mdfig:begin -->
//! [//]: # (```mermaid)
//! [//]: # (graph TD; A-->B)
//! [//]: # (```)
//! ![](figs/doc.mermaid.1.png)
//! <!-- mdfig:end -->
//! ```
//!
//! Running the `remove` action restores the fenced block exactly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdfig_core::ArtifactNamer;
//! use mdfig_core::Dispatcher;
//! use mdfig_core::FileJob;
//! use mdfig_core::MdfigConfig;
//! use mdfig_core::RenderContext;
//! use mdfig_core::RenderOptions;
//! use mdfig_core::run;
//!
//! let config = MdfigConfig::default();
//! let ctx = RenderContext {
//! 	dispatcher: Dispatcher::new(&config, None),
//! 	namer: ArtifactNamer::default(),
//! 	options: RenderOptions::default(),
//! };
//!
//! let summary = run(&[FileJob::in_place("README.md")], &ctx).unwrap();
//! if !summary.is_ok() {
//! 	eprintln!("{} block(s) failed", summary.failed());
//! }
//! ```

pub use command::*;
pub use config::*;
pub use dispatch::*;
pub use document::*;
pub use error::*;
pub use host::*;
pub use image::*;
pub use language::*;
pub use namer::ArtifactNamer;
pub use namer::DEFAULT_DST_DIR;
pub use orchestrator::*;
pub use outcome::*;
pub use renderer::RenderRequest;
pub use renderer::Renderer;
pub use rewriter::*;
pub use scanner::*;

mod command;
pub mod config;
mod dispatch;
mod document;
#[allow(unused_assignments)]
mod error;
mod host;
mod image;
pub mod inputs;
mod language;
pub mod namer;
mod orchestrator;
mod outcome;
mod renderer;
mod rewriter;
mod scanner;
pub mod viewer;

#[cfg(test)]
mod __fixtures;
