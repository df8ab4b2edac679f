use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `US` not glued to another ASCII letter or digit on either side.
    static ref US_TOKEN_REGEX: Regex =
        Regex::new(r"(?i)(?:^|[^A-Za-z0-9])US(?:[^A-Za-z0-9]|$)").unwrap();
}

/// Chinese for "USA", matched anywhere in a node name.
const US_KEYWORD: &str = "美国";

/// Whether `name` is a US node that belongs in the exit group.
///
/// The home proxy never matches, even when its own name is US-tagged.
pub fn is_west_cowboy_node(name: &str, us_home_proxy_name: &str) -> bool {
    if name == us_home_proxy_name {
        return false;
    }
    name.contains(US_KEYWORD) || US_TOKEN_REGEX.is_match(name)
}
