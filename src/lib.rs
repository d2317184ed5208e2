//! # doc2md
//!
//! Convert documents, web pages, and media files into normalized
//! Markdown-ish text for LLM consumption.
//!
//! ## Why this crate?
//!
//! Automated reasoning systems ingest *files*: spreadsheets, slide decks,
//! wiki pages, audio clips, archives. Each format needs its own
//! extraction strategy, and the file's real type rarely matches its name.
//! This crate layers type detection (explicit hint → name suffix → HTTP
//! headers → magic bytes) over a priority-ordered registry of format
//! handlers, tolerates partial failures, and normalizes whatever wins
//! into one predictable shape: title, body text, metadata.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source (path / URL / response bytes)
//!  │
//!  ├─ 1. Materialize  private local copy, cleaned up on every exit path
//!  ├─ 2. Identify     ordered candidate extensions + magic sniffing
//!  ├─ 3. Dispatch     try handlers per candidate until one succeeds
//!  └─ 4. Normalize    whitespace canonicalization of the winner
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let result = convert("report.xlsx", &config).await?;
//!     if let Some(title) = &result.title {
//!         println!("# {title}");
//!     }
//!     println!("{}", result.text_content);
//!     Ok(())
//! }
//! ```
//!
//! ## Handlers
//!
//! | Extension(s) | Handler | Output |
//! |--------------|---------|--------|
//! | `.txt` `.md` `.csv` `.json` `.jsonl` `.yaml` … | plain text | re-serialized structured text |
//! | `.html` `.htm` | Wikipedia → video platform → generic HTML | main-content Markdown + metadata |
//! | `.docx` | Word | HTML intermediate → Markdown |
//! | `.xlsx` `.xls` | Excel | per-sheet HTML tables with cell styling |
//! | `.pptx` | PowerPoint | slide-ordered text, images, tables, notes |
//! | `.wav` `.mp3` `.m4a` `.flac` | audio | probe metadata + transcript |
//! | `.jpg` `.png` `.gif` … | image | probe metadata + OCR + caption/VQA |
//! | `.zip` | archive | sorted listing of extracted files |
//! | `.pdf` | PDF | page text |
//! | `.pdb` | structure | first two atoms + distance |
//!
//! Unknown extensions fall back to the plain-text handler and then to
//! every registered handler in priority order; exhaustion yields a typed
//! error carrying the attempted-extension list.
//!
//! ## External collaborators
//!
//! Audio transcription, image analysis, and video metadata are consumed
//! through narrow async traits ([`services`]) injected via
//! [`ConversionConfig`]; no network service is required for the
//! file-format handlers themselves.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converters;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod services;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_sync, MarkdownConverter};
pub use converters::{ConvertOptions, DocumentConverter};
pub use error::{ConvertError, ConverterError};
pub use output::ConversionResult;
pub use pipeline::dispatch::ConverterRegistry;
pub use pipeline::input::FetchedResponse;
pub use services::{
    MetadataProbe, ServiceError, SpeechToText, VideoInfo, VideoInfoService, VisionService,
};
