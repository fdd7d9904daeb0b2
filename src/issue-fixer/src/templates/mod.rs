//! Template rendering using Handlebars.
//!
//! Branch names, commit messages, review request titles and bodies, and the
//! issue comment are all rendered from configurable formats.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{create_handlebars_registry, TemplateRenderer};
