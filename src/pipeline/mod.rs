//! Pipeline stages around a single file's conversion.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ convert ──▶ postprocess
//! (paths)   (external)   (cleanup)
//! ```
//!
//! 1. [`input`]: recognise formats, normalise paths, scan directories
//! 2. [`convert`]: the [`convert::Converter`] seam; runs the external
//!    converter program
//! 3. [`postprocess`]: opt-in whitespace cleanup of the converter's
//!    Markdown (`clean_output`)

pub mod convert;
pub mod input;
pub mod postprocess;
