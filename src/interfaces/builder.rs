use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use crate::error::{ProxySubError, Result};
use crate::generator::profile::{
    apply_profile_script, flowify_proxy_group_lists, ProfileOptions, WestCowboyOverrides,
};
use crate::generator::providers::{resolve_proxy_providers, sync_group_use_fields};
use crate::models::{Document, Mapping, Sequence, SubsConfig};
use crate::parser::subs::{load_subs_config, parse_subs_config};
use crate::parser::subscription::fetch_subscription_proxies_blocking;
use crate::utils::file::write_yaml_atomic;
use crate::utils::http::DEFAULT_TIMEOUT;
use crate::utils::yaml::load_yaml_file;

/// Options for a single build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Exit group options
    pub profile: ProfileOptions,
    /// Fetch the override's subscription URLs and add their proxies
    pub fetch_subscriptions: bool,
    /// Per-request timeout of subscription fetches
    pub fetch_timeout: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            profile: ProfileOptions::default(),
            fetch_subscriptions: false,
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

/// Outcome of a build that was written to disk
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub config: Document,
    pub output_path: PathBuf,
    pub subs_config: SubsConfig,
}

/// Keep the first proxy of every trimmed name, dropping unnamed ones.
pub fn dedupe_proxies_by_name(proxies: &[Mapping]) -> Vec<Document> {
    let mut seen = HashSet::new();
    proxies
        .iter()
        .filter(|proxy| match proxy.get_trimmed_str("name") {
            Some(name) => seen.insert(name.to_string()),
            None => false,
        })
        .cloned()
        .map(Document::Mapping)
        .collect()
}

/// Fetch the subscription URLs of `subs` and append what they list.
///
/// Returns the number of proxies added.
pub fn enrich_with_subscriptions(subs: &mut SubsConfig, timeout: Duration) -> Result<usize> {
    let urls = subs.subscription_urls();
    if urls.is_empty() {
        return Ok(0);
    }
    let fetched = fetch_subscription_proxies_blocking(&urls, timeout)?;
    let count = fetched.len();
    subs.extend_proxies(fetched);
    Ok(count)
}

/// Merge `subs` into `template` and return the finished configuration.
pub fn build_config(template: Document, subs: &SubsConfig, options: &BuildOptions) -> Result<Document> {
    let mut root = match template {
        Document::Null => Mapping::new(),
        Document::Mapping(map) => map,
        other => {
            return Err(ProxySubError::Schema(format!(
                "Template must be a YAML mapping, got {}",
                other.type_name()
            )))
        }
    };
    let home_proxy_name = subs.home_proxy_name()?;

    let proxies = dedupe_proxies_by_name(&subs.proxies);
    debug!("Kept {} of {} proxies", proxies.len(), subs.proxies.len());
    root.insert("proxies", Sequence::new(proxies));

    let (providers, provider_names) =
        resolve_proxy_providers(root.get("proxy-providers"), &subs.provider_source);
    root.insert("proxy-providers", providers);
    sync_group_use_fields(root.get_mut("proxy-groups"), &provider_names);

    let overrides = WestCowboyOverrides {
        url: subs.west_cowboy_url.as_deref(),
        expected_status: subs.west_cowboy_expected_status.as_ref(),
    };
    apply_profile_script(&mut root, &home_proxy_name, overrides, &options.profile)?;
    flowify_proxy_group_lists(root.get_mut("proxy-groups"));

    Ok(Document::Mapping(root))
}

fn prepare_subs(mut subs: SubsConfig, options: &BuildOptions) -> Result<SubsConfig> {
    if options.fetch_subscriptions {
        let added = enrich_with_subscriptions(&mut subs, options.fetch_timeout)?;
        info!("Added {} proxies from subscriptions", added);
    }
    Ok(subs)
}

/// Build from a template file and an override file.
pub fn build_config_from_files<P, Q>(
    template_path: P,
    subs_path: Q,
    options: &BuildOptions,
) -> Result<(Document, SubsConfig)>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let template = load_yaml_file(template_path)?;
    let subs = prepare_subs(load_subs_config(subs_path)?, options)?;
    let config = build_config(template, &subs, options)?;
    Ok((config, subs))
}

/// Build from a template file and an already parsed override document.
pub fn build_config_from_doc<P: AsRef<Path>>(
    template_path: P,
    subs_doc: &Document,
    options: &BuildOptions,
) -> Result<(Document, SubsConfig)> {
    let template = load_yaml_file(template_path)?;
    let subs = prepare_subs(parse_subs_config(subs_doc)?, options)?;
    let config = build_config(template, &subs, options)?;
    Ok((config, subs))
}

/// [`build_config_from_files`], then write the result atomically to `output_path`.
pub fn build_and_write_yaml<P, Q, R>(
    template_path: P,
    subs_path: Q,
    output_path: R,
    options: &BuildOptions,
) -> Result<BuildResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let (config, subs_config) = build_config_from_files(template_path, subs_path, options)?;
    let output_path = write_yaml_atomic(&config, output_path)?;
    info!("Subscription written to {}", output_path.display());
    Ok(BuildResult {
        config,
        output_path,
        subs_config,
    })
}

/// [`build_config_from_doc`], then write the result atomically to `output_path`.
pub fn build_and_write_yaml_from_doc<P, R>(
    template_path: P,
    subs_doc: &Document,
    output_path: R,
    options: &BuildOptions,
) -> Result<BuildResult>
where
    P: AsRef<Path>,
    R: AsRef<Path>,
{
    let (config, subs_config) = build_config_from_doc(template_path, subs_doc, options)?;
    let output_path = write_yaml_atomic(&config, output_path)?;
    info!("Subscription written to {}", output_path.display());
    Ok(BuildResult {
        config,
        output_path,
        subs_config,
    })
}
