pub mod subs;
pub mod subscription;

pub use subs::{load_subs_config, parse_subs_config};
pub use subscription::{fetch_subscription_proxies, fetch_subscription_proxies_blocking};
