pub mod file_settings;
pub mod settings_struct;

pub use file_settings::{BuildSettings, FileSettings, ServerSettings};
pub use settings_struct::{init_settings, Settings, GLOBAL};
