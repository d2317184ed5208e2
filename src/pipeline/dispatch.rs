//! Converter registry and the dispatch loop.
//!
//! The registry maps each known extension to an ordered list of handlers;
//! registration order is priority order, and the same handler may sit in
//! several buckets. A separate registration-ordered list backs the
//! "try everything" pass for unknown extensions.
//!
//! Dispatch walks the candidate-extension list: known extensions try their
//! bucket, unknown and sentinel candidates try the plain-text handler
//! first, and unknown (non-sentinel) candidates then sweep every remaining
//! registered handler. Handlers are tracked per candidate pass by their
//! stable [`DocumentConverter::name`] (never by object identity), so a
//! handler registered under several buckets is skipped within one pass but
//! may legitimately run again on a later candidate.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ConversionConfig;
use crate::converters::{ConvertOptions, DocumentConverter};
use crate::error::ConvertError;
use crate::output::ConversionResult;

use super::normalize::normalize;

/// Static mapping from extension to ordered handlers, plus the global
/// fallback list of every registered handler.
pub struct ConverterRegistry {
    buckets: HashMap<String, Vec<Arc<dyn DocumentConverter>>>,
    registered: Vec<Arc<dyn DocumentConverter>>,
    plain_text: Arc<dyn DocumentConverter>,
}

impl ConverterRegistry {
    /// Create an empty registry. `plain_text` is the handler tried first
    /// for unknown or undetected extensions.
    pub fn new(plain_text: Arc<dyn DocumentConverter>) -> Self {
        Self {
            buckets: HashMap::new(),
            registered: Vec::new(),
            plain_text,
        }
    }

    /// Register a handler under the given extension buckets (lowercase,
    /// dotted). Also appends it to the global fallback list once.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>, extensions: &[&str]) {
        for ext in extensions {
            self.buckets
                .entry(ext.to_ascii_lowercase())
                .or_default()
                .push(Arc::clone(&converter));
        }
        if !self
            .registered
            .iter()
            .any(|c| c.name() == converter.name())
        {
            self.registered.push(converter);
        }
    }

    fn bucket(&self, ext: &str) -> Option<&[Arc<dyn DocumentConverter>]> {
        self.buckets.get(ext).map(Vec::as_slice)
    }
}

/// Drive the candidate list through the registry until one handler
/// produces a result, then normalize and return it.
///
/// On exhaustion: [`ConvertError::ConversionFailed`] when at least one
/// handler failed (carrying the accumulated error text), otherwise
/// [`ConvertError::UnsupportedFormat`]. Both list the attempted
/// extensions for diagnosability.
pub async fn dispatch(
    registry: &ConverterRegistry,
    source: &Path,
    source_desc: &str,
    candidates: &[Option<String>],
    config: &ConversionConfig,
    base_opts: &ConvertOptions,
) -> Result<ConversionResult, ConvertError> {
    let mut error_log = String::new();

    for candidate in candidates {
        let mut opts = base_opts.clone();
        opts.extension = candidate.clone();

        let mut tried: HashSet<&'static str> = HashSet::new();
        let bucket = candidate.as_deref().and_then(|ext| registry.bucket(ext));

        // Known extension: its bucket, in registration order.
        // Unknown or sentinel: the plain-text handler first.
        let first_wave: Vec<Arc<dyn DocumentConverter>> = match bucket {
            Some(handlers) => handlers.to_vec(),
            None => vec![Arc::clone(&registry.plain_text)],
        };

        for converter in &first_wave {
            tried.insert(converter.name());
            match try_one(converter.as_ref(), source, config, &opts, &mut error_log).await {
                Some(result) => return Ok(finish(result)),
                None => continue,
            }
        }

        // Unknown (non-sentinel) extension: sweep every remaining handler.
        if candidate.is_some() && bucket.is_none() {
            for converter in &registry.registered {
                if !tried.insert(converter.name()) {
                    continue;
                }
                match try_one(converter.as_ref(), source, config, &opts, &mut error_log).await {
                    Some(result) => return Ok(finish(result)),
                    None => continue,
                }
            }
        }
    }

    let attempted: Vec<String> = candidates
        .iter()
        .map(|c| c.clone().unwrap_or_else(|| "<none>".to_string()))
        .collect();

    if error_log.is_empty() {
        Err(ConvertError::UnsupportedFormat {
            source: source_desc.to_string(),
            attempted,
        })
    } else {
        Err(ConvertError::ConversionFailed {
            source: source_desc.to_string(),
            attempted,
            errors: error_log.trim_end().to_string(),
        })
    }
}

async fn try_one(
    converter: &dyn DocumentConverter,
    source: &Path,
    config: &ConversionConfig,
    opts: &ConvertOptions,
    error_log: &mut String,
) -> Option<ConversionResult> {
    debug!(
        converter = converter.name(),
        extension = opts.extension.as_deref().unwrap_or("<none>"),
        "trying converter"
    );
    match converter.convert(source, config, opts).await {
        Ok(Some(result)) => Some(result),
        Ok(None) => None,
        Err(e) => {
            warn!(converter = converter.name(), error = %e, "converter failed");
            error_log.push_str(&format!(
                "[{} via {}] {}\n",
                opts.extension.as_deref().unwrap_or("<none>"),
                converter.name(),
                e
            ));
            None
        }
    }
}

fn finish(mut result: ConversionResult) -> ConversionResult {
    result.text_content = normalize(&result.text_content);
    result
}
