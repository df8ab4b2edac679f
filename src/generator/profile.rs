//! Exit group maintenance.
//!
//! The exit group (`西部牛仔`) collects US nodes for latency-based selection
//! and acts as the dialer of the home proxy, so that traffic leaving through
//! the home relay is first chained through a US node. Every other group gets
//! the home proxy appended so it stays selectable everywhere.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, info};

use crate::error::{ProxySubError, Result};
use crate::models::{Document, Mapping, Sequence};
use crate::parser::subscription::extract_proxy_names;
use crate::utils::file::read_text_with_fallbacks;
use crate::utils::matcher::is_west_cowboy_node;

/// Fallback health-check URL
pub const TEST_URL: &str = "https://www.gstatic.com/generate_204";

/// Name of the exit group
pub const WEST_COWBOY_GROUP_NAME: &str = "西部牛仔";

/// Group name used as dialer by older templates
pub const LEGACY_DIALER_GROUP_NAME: &str = "dialer-group";

pub const DEFAULT_EXPECTED_STATUS: i64 = 407;
pub const DEFAULT_GROUP_INTERVAL: i64 = 300;

/// Name filter put on the exit group when provider contents are unknown
pub const WEST_COWBOY_FILTER: &str = "美国|US";

const BUILTIN_POLICIES: [&str; 2] = ["DIRECT", "REJECT"];

/// Knobs of the profile transform.
#[derive(Debug, Clone, Default)]
pub struct ProfileOptions {
    /// Read each provider's cached `path` file and match US nodes inside it
    pub scan_provider_files: bool,
    /// Extra directory relative provider paths are tried against
    pub provider_base_dir: Option<PathBuf>,
}

/// Exit group overrides taken from the user's document.
#[derive(Debug, Clone, Copy, Default)]
pub struct WestCowboyOverrides<'a> {
    pub url: Option<&'a str>,
    pub expected_status: Option<&'a Document>,
}

/// Keep the first occurrence of every string, dropping everything else.
pub fn uniq_strings<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(Document::as_str)
        .filter(|value| seen.insert(value.to_string()))
        .map(str::to_string)
        .collect()
}

fn uniq_names<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn without_builtin_policies(names: &[String]) -> Sequence {
    Sequence::new(
        uniq_names(names.iter().cloned())
            .into_iter()
            .filter(|name| !BUILTIN_POLICIES.contains(&name.as_str()))
            .map(Document::String)
            .collect(),
    )
}

fn name_list(names: &[String]) -> Sequence {
    Sequence::new(names.iter().map(|name| name.as_str().into()).collect())
}

fn group_name(group: &Document) -> Option<&str> {
    group.as_mapping()?.get("name")?.as_str()
}

/// `http://{server}:{port}/` for a proxy, used to probe through the home relay.
///
/// IPv6 hosts are bracketed. The port must be an integer or an all-digit
/// string in `1..=65535`; anything else yields `None`.
pub fn build_http_probe_url(proxy: &Mapping) -> Option<String> {
    let server = proxy.get_trimmed_str("server")?;
    let host = if server.contains(':') && !(server.starts_with('[') && server.ends_with(']')) {
        format!("[{}]", server)
    } else {
        server.to_string()
    };

    let port = match proxy.get("port")? {
        Document::Integer(port) => *port,
        Document::String(port) => {
            let port = port.trim();
            if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            port.parse::<i128>().ok()?
        }
        _ => return None,
    };
    if !(1..=65535).contains(&port) {
        return None;
    }
    Some(format!("http://{}:{}/", host, port))
}

fn is_present_status(value: &Document) -> bool {
    match value {
        Document::Integer(_) => true,
        Document::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}

/// US nodes found in provider cache files, and how many files were readable.
fn scan_provider_files(
    providers: Option<&Document>,
    home_proxy_name: &str,
    options: &ProfileOptions,
) -> (usize, Vec<String>) {
    let Some(providers) = providers.and_then(Document::as_mapping) else {
        return (0, Vec::new());
    };

    let mut files_read = 0;
    let mut names = Vec::new();
    for (provider_name, provider) in providers.iter() {
        let Some(path) = provider.as_mapping().and_then(|p| p.get_trimmed_str("path")) else {
            continue;
        };
        match read_text_with_fallbacks(path, options.provider_base_dir.as_deref()) {
            Some(text) => {
                files_read += 1;
                names.extend(extract_proxy_names(&text));
            }
            None => debug!("Provider '{}' has no readable cache at {}", provider_name, path),
        }
    }

    let matched = uniq_names(names)
        .into_iter()
        .filter(|name| is_west_cowboy_node(name, home_proxy_name))
        .collect();
    (files_read, matched)
}

/// Rewrite the exit group and wire the home proxy into `config`.
///
/// Only a blank `home_proxy_name` is an error; every other missing or
/// malformed piece of `config` is treated as absent.
pub fn apply_profile_script(
    config: &mut Mapping,
    home_proxy_name: &str,
    overrides: WestCowboyOverrides<'_>,
    options: &ProfileOptions,
) -> Result<()> {
    let home = home_proxy_name.trim();
    if home.is_empty() {
        return Err(ProxySubError::Validation(
            "home proxy name must be a non-empty string".to_string(),
        ));
    }

    config.ensure_sequence("proxy-groups");
    let proxies = config.ensure_sequence("proxies");

    let mut derived_url = None;
    if let Some(home_proxy) = proxies
        .items
        .iter_mut()
        .filter_map(Document::as_mapping_mut)
        .find(|proxy| proxy.get("name").and_then(Document::as_str) == Some(home))
    {
        home_proxy.insert("dialer-proxy", WEST_COWBOY_GROUP_NAME);
        derived_url = build_http_probe_url(home_proxy);
    }

    let manual_names = uniq_names(
        proxies
            .iter()
            .filter_map(|proxy| proxy.as_mapping()?.get_trimmed_str("name"))
            .map(str::to_string),
    );
    let matched_manual: Vec<String> = manual_names
        .into_iter()
        .filter(|name| is_west_cowboy_node(name, home))
        .collect();

    let provider_names: Vec<String> = config
        .get("proxy-providers")
        .and_then(Document::as_mapping)
        .map(|providers| providers.keys().cloned().collect())
        .unwrap_or_default();

    let scan = options.scan_provider_files.then(|| {
        scan_provider_files(config.get("proxy-providers"), home, options)
    });

    let groups = config.ensure_sequence("proxy-groups");
    let exit_index = match groups
        .items
        .iter()
        .position(|group| group_name(group) == Some(WEST_COWBOY_GROUP_NAME))
    {
        Some(index) => index,
        None => {
            let mut group = Mapping::new();
            group.insert("name", WEST_COWBOY_GROUP_NAME);
            groups.push(group);
            groups.len() - 1
        }
    };

    if let Some(exit_group) = groups.items[exit_index].as_mapping_mut() {
        exit_group.insert("type", "url-test");

        let url = overrides
            .url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .or_else(|| exit_group.get_trimmed_str("url").map(str::to_string))
            .or(derived_url)
            .unwrap_or_else(|| TEST_URL.to_string());
        exit_group.insert("url", url);

        let expected_status = overrides
            .expected_status
            .filter(|status| is_present_status(status))
            .or_else(|| exit_group.get("expected-status").filter(|s| is_present_status(s)))
            .cloned()
            .unwrap_or_else(|| Document::from(DEFAULT_EXPECTED_STATUS));
        exit_group.insert("expected-status", expected_status);

        if exit_group.get("interval").and_then(Document::as_i64).is_none() {
            exit_group.insert("interval", DEFAULT_GROUP_INTERVAL);
        }

        match scan {
            Some((files_read, matched_provider)) => {
                if !provider_names.is_empty() && files_read == 0 {
                    if matched_manual.is_empty() {
                        exit_group.remove("proxies");
                    } else {
                        exit_group.insert("proxies", without_builtin_policies(&matched_manual));
                    }
                    exit_group.insert("use", name_list(&provider_names));
                    exit_group.insert("filter", WEST_COWBOY_FILTER);
                } else {
                    let matched =
                        uniq_names(matched_manual.iter().cloned().chain(matched_provider));
                    let members = if matched.is_empty() {
                        Sequence::default()
                    } else {
                        without_builtin_policies(&matched)
                    };
                    exit_group.insert("proxies", members);
                    exit_group.remove("use");
                    exit_group.remove("filter");
                }
            }
            None => {
                if !provider_names.is_empty() {
                    if matched_manual.is_empty() {
                        exit_group.remove("proxies");
                    } else {
                        exit_group.insert("proxies", without_builtin_policies(&matched_manual));
                    }
                    exit_group.insert("use", name_list(&provider_names));
                    exit_group.remove("filter");
                } else {
                    exit_group.insert("proxies", without_builtin_policies(&matched_manual));
                    exit_group.remove("use");
                    exit_group.remove("filter");
                }
            }
        }
    }

    for group in groups.items.iter_mut().filter_map(Document::as_mapping_mut) {
        if group.get("name").and_then(Document::as_str) == Some(WEST_COWBOY_GROUP_NAME) {
            continue;
        }
        // Groups that already pull in every proxy are only deduplicated.
        let includes_all =
            matches!(group.get("include-all-proxies"), Some(Document::Bool(true)));
        let Some(Document::Sequence(members)) = group.get_mut("proxies") else {
            continue;
        };
        let mut names = uniq_strings(members.iter());
        if !includes_all && !names.iter().any(|name| name == home) {
            names.push(home.to_string());
        }
        members.items = names.into_iter().map(Document::String).collect();
    }

    prune_legacy_dialer_group(config);
    info!(
        "Exit group '{}' updated for home proxy '{}'",
        WEST_COWBOY_GROUP_NAME, home
    );
    Ok(())
}

/// Drop `dialer-group` unless a proxy dials through it or a group lists it.
fn prune_legacy_dialer_group(config: &mut Mapping) {
    let dialed = config
        .get("proxies")
        .and_then(Document::as_sequence)
        .is_some_and(|proxies| {
            proxies.iter().any(|proxy| {
                proxy
                    .as_mapping()
                    .and_then(|p| p.get("dialer-proxy"))
                    .and_then(Document::as_str)
                    == Some(LEGACY_DIALER_GROUP_NAME)
            })
        });
    let Some(Document::Sequence(groups)) = config.get_mut("proxy-groups") else {
        return;
    };
    let listed = groups.iter().any(|group| {
        group
            .as_mapping()
            .and_then(|g| g.get("proxies"))
            .and_then(Document::as_sequence)
            .is_some_and(|members| members.contains_str(LEGACY_DIALER_GROUP_NAME))
    });
    if dialed || listed {
        return;
    }

    let before = groups.len();
    groups
        .items
        .retain(|group| group_name(group) != Some(LEGACY_DIALER_GROUP_NAME));
    if groups.len() != before {
        debug!("Removed unused '{}' group", LEGACY_DIALER_GROUP_NAME);
    }
}

/// Render the `proxies` and `use` lists of every group inline.
pub fn flowify_proxy_group_lists(groups: Option<&mut Document>) {
    let Some(Document::Sequence(groups)) = groups else {
        return;
    };
    for group in groups.items.iter_mut().filter_map(Document::as_mapping_mut) {
        for key in ["proxies", "use"] {
            if let Some(Document::Sequence(list)) = group.get_mut(key) {
                list.flow = true;
            }
        }
    }
}
