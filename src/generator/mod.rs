pub mod profile;
pub mod providers;

pub use profile::{apply_profile_script, flowify_proxy_group_lists, ProfileOptions};
pub use providers::{resolve_proxy_providers, sync_group_use_fields};
