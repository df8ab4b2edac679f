//! Core data models for the application
//!
//! [`Document`] is the YAML tree every stage of a build works on.
//! [`SubsConfig`] is the normalized form of the user's override file, and
//! [`OneTimeStore`] tracks generated files awaiting their single download.

pub mod app_state;
pub mod document;
pub mod one_time;
pub mod subs_config;

pub use app_state::AppState;
pub use document::{Document, Mapping, Sequence};
pub use one_time::OneTimeStore;
pub use subs_config::{ProviderSource, SubsConfig};
