pub mod file;
pub mod http;
pub mod matcher;
pub mod yaml;

// Re-export common utilities
pub use file::{read_text_with_fallbacks, write_atomic, write_yaml_atomic};
pub use matcher::is_west_cowboy_node;
