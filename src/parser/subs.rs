use std::path::Path;

use log::{debug, warn};

use crate::error::{ProxySubError, Result};
use crate::models::{Document, Mapping, ProviderSource, SubsConfig};
use crate::utils::yaml::load_yaml_file;

/// Load and parse an override file.
pub fn load_subs_config<P: AsRef<Path>>(path: P) -> Result<SubsConfig> {
    let doc = load_yaml_file(path)?;
    parse_subs_config(&doc)
}

/// Normalize a loosely structured override document.
///
/// Accepts both provider shapes (a list of URLs under `proxy-providers` or the
/// legacy `subs` key, or a mapping of named providers) and both spellings of
/// the exit-group keys. A null document is treated as an empty mapping.
pub fn parse_subs_config(doc: &Document) -> Result<SubsConfig> {
    let empty = Mapping::new();
    let root = match doc {
        Document::Null => &empty,
        Document::Mapping(map) => map,
        other => {
            return Err(ProxySubError::Schema(format!(
                "subs.yaml must be a YAML mapping, got {}",
                other.type_name()
            )))
        }
    };

    // `subs` is the legacy name of `proxy-providers`.
    let raw_providers = root
        .get_first(&["proxy-providers"])
        .or_else(|| root.get("subs"));
    let provider_source = parse_provider_source(raw_providers);

    let proxies: Vec<Mapping> = root
        .get("proxies")
        .and_then(Document::as_sequence)
        .map(|seq| seq.iter().filter_map(Document::as_mapping).cloned().collect())
        .unwrap_or_default();

    let mut config = SubsConfig {
        provider_source,
        proxies,
        ..Default::default()
    };

    if let Some(west_cowboy) = root
        .get_first(&["west-cowboy", "west_cowboy"])
        .and_then(Document::as_mapping)
    {
        config.west_cowboy_url = west_cowboy
            .get_first(&["url", "test-url", "test_url"])
            .and_then(Document::as_trimmed_str)
            .map(str::to_string);

        config.west_cowboy_expected_status = west_cowboy
            .get_first(&["expected-status", "expected_status"])
            .and_then(parse_expected_status);
    }

    debug!(
        "Parsed overrides: {} proxies, providers {:?}",
        config.proxies.len(),
        config.provider_source
    );
    Ok(config)
}

fn parse_provider_source(raw: Option<&Document>) -> ProviderSource {
    match raw {
        Some(Document::Sequence(seq)) => ProviderSource::Urls(
            seq.iter()
                .filter_map(Document::as_trimmed_str)
                .map(str::to_string)
                .collect(),
        ),
        Some(Document::Mapping(map)) => {
            let mut providers: Vec<(String, Mapping)> = Vec::new();
            for (raw_name, raw_provider) in map.iter() {
                let name = raw_name.trim();
                if name.is_empty() {
                    continue;
                }
                let spec = match raw_provider {
                    Document::Mapping(spec) => spec.clone(),
                    Document::String(url) => {
                        let mut spec = Mapping::new();
                        spec.insert("url", url.trim());
                        spec
                    }
                    other => {
                        warn!(
                            "Skipping provider '{}': expected a mapping or URL, got {}",
                            name,
                            other.type_name()
                        );
                        continue;
                    }
                };
                // Names equal after trimming share the first slot; the last value wins.
                match providers.iter_mut().find(|(existing, _)| existing.as_str() == name) {
                    Some((_, slot)) => {
                        debug!("Provider '{}' declared more than once", name);
                        *slot = spec;
                    }
                    None => providers.push((name.to_string(), spec)),
                }
            }
            ProviderSource::Named(providers)
        }
        _ => ProviderSource::None,
    }
}

fn parse_expected_status(value: &Document) -> Option<Document> {
    match value {
        Document::String(s) if !s.trim().is_empty() => Some(value.clone()),
        Document::Integer(_) => Some(value.clone()),
        _ => None,
    }
}
