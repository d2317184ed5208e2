//! Pipeline stages for document conversion.
//!
//! Each submodule implements exactly one transformation step, so every
//! stage is independently testable and replaceable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ identify ──▶ dispatch ──▶ normalize
//! (path/URL/  (candidate   (try handlers  (whitespace
//!  response)   extensions)  per hint)      cleanup)
//! ```
//!
//! 1. [`input`]     — materialize any input form to a private local copy
//!    with guaranteed cleanup
//! 2. [`identify`]  — build the ordered candidate-extension list (override,
//!    suffix, headers, magic bytes, sentinel)
//! 3. [`dispatch`]  — registry lookup + priority-ordered attempts with
//!    decline/fail bookkeeping
//! 4. [`normalize`] — canonical whitespace cleanup of the winning result

pub mod dispatch;
pub mod identify;
pub mod input;
pub mod normalize;
