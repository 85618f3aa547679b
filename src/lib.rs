//! xlfill - Excel template fill engine
//!
//! Fills `.xlsx` templates with JSON data while leaving the template's
//! formatting untouched.
//!
//! # Features
//!
//! - `{{field}}` placeholders with dot paths into nested data
//! - Repeating row groups (`{{#items}}` ... `{{/items}}`) that carry merges,
//!   formulas, tables and conditional formatting along with the rows
//! - Native cell types: numbers, booleans and ISO dates become real values
//! - Template catalogue with sample payloads, plus an HTTP API and a CLI
//!
//! # Example
//!
//! ```no_run
//! use xlfill::core::{FillOptions, TemplateEngine};
//! use xlfill::templates::TemplateStore;
//! use serde_json::json;
//!
//! let engine = TemplateEngine::new(TemplateStore::new("./templates"));
//! let data = json!({"client": "Acme", "items": [{"sku": "A1", "qty": 2}]});
//! let report = engine.generate("invoice", &data, &FillOptions::default())?;
//!
//! std::fs::write(&report.filename, &report.bytes)?;
//! for warning in &report.warnings {
//!     println!("{}", warning);
//! }
//! # Ok::<(), xlfill::error::XlFillError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod templates;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::{FillOptions, FillWarning, GeneratedReport, TemplateEngine};
pub use error::{XlFillError, XlFillResult};
pub use templates::{Template, TemplateStore};
