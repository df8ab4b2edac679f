pub mod error;
pub mod generator;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod settings;
pub mod utils;
#[cfg(feature = "web-api")]
pub mod web_handlers;

// Re-export the document types for easier access
pub use models::{Document, Mapping, Sequence, SubsConfig};

pub use error::{FetchError, ProxySubError, Result};
pub use settings::Settings;
