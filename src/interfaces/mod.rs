pub mod builder;

pub use builder::{
    build_and_write_yaml, build_and_write_yaml_from_doc, build_config, build_config_from_doc,
    build_config_from_files, BuildOptions, BuildResult,
};
