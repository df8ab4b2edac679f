use log::debug;

use crate::models::{Document, Mapping, ProviderSource, Sequence};
use crate::generator::profile::TEST_URL;

/// Default refresh interval of a provider, in seconds
pub const DEFAULT_PROVIDER_INTERVAL: i64 = 3600;

/// Cache path of the provider at 1-based `index`.
pub fn default_provider_path(index: usize) -> String {
    format!("./providers/sub{}.yaml", index)
}

fn default_health_check() -> Mapping {
    let mut health_check = Mapping::new();
    health_check.insert("enable", true);
    health_check.insert("url", TEST_URL);
    health_check.insert("interval", 300i64);
    health_check.insert("lazy", true);
    health_check
}

fn fill_provider_defaults(provider: &mut Mapping) {
    provider.insert_if_absent("type", "http");
    provider.insert_if_absent("interval", DEFAULT_PROVIDER_INTERVAL);
    provider.insert_if_absent("health-check", default_health_check());
}

fn has_usable_path(provider: &Mapping) -> bool {
    provider.get_trimmed_str("path").is_some()
}

/// Build the provider table for an override.
///
/// Returns the table and the provider names in table order.
pub fn resolve_proxy_providers(
    existing: Option<&Document>,
    source: &ProviderSource,
) -> (Mapping, Vec<String>) {
    match source {
        ProviderSource::Named(providers) if !providers.is_empty() => {
            normalize_named_providers(providers)
        }
        ProviderSource::Urls(urls) => build_positional_providers(existing, urls),
        _ => build_positional_providers(existing, &[]),
    }
}

/// Canonicalize named providers, numbering accepted entries from 1.
pub fn normalize_named_providers(providers: &[(String, Mapping)]) -> (Mapping, Vec<String>) {
    let mut table = Mapping::new();
    let mut names = Vec::new();

    for (raw_name, spec) in providers {
        let name = raw_name.trim();
        if name.is_empty() {
            continue;
        }
        let index = names.len() + 1;

        let mut provider = spec.clone();
        fill_provider_defaults(&mut provider);
        if let Some(url) = provider.get("url").and_then(Document::as_str) {
            let trimmed = url.trim().to_string();
            provider.insert("url", trimmed);
        }
        if !has_usable_path(&provider) {
            provider.insert("path", default_provider_path(index));
        }

        names.push(name.to_string());
        table.insert(name, provider);
    }

    debug!("Resolved {} named providers", names.len());
    (table, names)
}

/// Build providers for bare subscription URLs.
///
/// The Nth URL takes the name of the Nth template provider, or `订阅N` when
/// the template has fewer. Base fields come from that template provider, else
/// from the first template provider that is a mapping.
pub fn build_positional_providers(existing: Option<&Document>, urls: &[String]) -> (Mapping, Vec<String>) {
    let empty = Mapping::new();
    let existing = existing.and_then(Document::as_mapping).unwrap_or(&empty);
    let existing_names: Vec<&String> = existing
        .keys()
        .filter(|name| !name.trim().is_empty())
        .collect();
    let default_base = existing_names
        .iter()
        .find_map(|name| existing.get(name).and_then(Document::as_mapping));

    let mut table = Mapping::new();
    let mut names = Vec::new();

    for (position, url) in urls.iter().enumerate() {
        let index = position + 1;
        let name = match existing_names.get(position) {
            Some(name) => (*name).clone(),
            None => format!("订阅{}", index),
        };

        let template_provider = existing.get(&name).and_then(Document::as_mapping);
        let mut provider = template_provider
            .or(default_base)
            .cloned()
            .unwrap_or_default();
        fill_provider_defaults(&mut provider);
        provider.insert("url", url.as_str());

        if template_provider.is_none() || !has_usable_path(&provider) {
            provider.insert("path", default_provider_path(index));
        }

        names.push(name.clone());
        table.insert(name, provider);
    }

    debug!("Resolved {} positional providers", names.len());
    (table, names)
}

/// Replace the `use` list of every group that declares one with `names`.
pub fn sync_group_use_fields(groups: Option<&mut Document>, names: &[String]) {
    let Some(Document::Sequence(groups)) = groups else {
        return;
    };
    for group in groups.items.iter_mut().filter_map(Document::as_mapping_mut) {
        if group.contains_key("use") {
            group.insert("use", Sequence::new(names.iter().map(|n| n.as_str().into()).collect()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::yaml::parse_str;

    fn mapping(yaml: &str) -> Mapping {
        parse_str(yaml).unwrap().as_mapping().unwrap().clone()
    }

    #[test]
    fn test_named_providers_fill_missing_defaults() {
        let providers = vec![
            ("P1".to_string(), mapping("url: ' http://example/a '\n")),
            (
                "P2".to_string(),
                mapping("url: http://example/b\ninterval: 600\npath: ./custom.yaml\nhealth-check: {enable: false}\n"),
            ),
        ];
        let (table, names) = normalize_named_providers(&providers);
        assert_eq!(names, vec!["P1", "P2"]);

        let p1 = table.get("P1").and_then(Document::as_mapping).unwrap();
        assert_eq!(p1.get("url").and_then(Document::as_str), Some("http://example/a"));
        assert_eq!(p1.get("type").and_then(Document::as_str), Some("http"));
        assert_eq!(p1.get("interval").and_then(Document::as_i64), Some(3600));
        assert_eq!(p1.get("path").and_then(Document::as_str), Some("./providers/sub1.yaml"));
        let health_check = p1.get("health-check").and_then(Document::as_mapping).unwrap();
        assert_eq!(health_check.get("url").and_then(Document::as_str), Some(TEST_URL));
        assert_eq!(health_check.get("lazy"), Some(&Document::Bool(true)));

        let p2 = table.get("P2").and_then(Document::as_mapping).unwrap();
        assert_eq!(p2.get("interval").and_then(Document::as_i64), Some(600));
        assert_eq!(p2.get("path").and_then(Document::as_str), Some("./custom.yaml"));
        let health_check = p2.get("health-check").and_then(Document::as_mapping).unwrap();
        assert_eq!(health_check.len(), 1);
    }

    #[test]
    fn test_named_provider_indices_skip_rejected_names() {
        let providers = vec![
            ("  ".to_string(), Mapping::new()),
            ("A".to_string(), mapping("path: '  '\n")),
        ];
        let (table, names) = normalize_named_providers(&providers);
        assert_eq!(names, vec!["A"]);
        let a = table.get("A").and_then(Document::as_mapping).unwrap();
        assert_eq!(a.get("path").and_then(Document::as_str), Some("./providers/sub1.yaml"));
    }

    #[test]
    fn test_positional_reuses_template_providers() {
        let existing = parse_str(
            r#"
Airport:
  type: http
  interval: 86400
  path: ./providers/airport.yaml
  url: http://old
Backup: not-a-mapping
"#,
        )
        .unwrap();
        let urls = vec![
            "http://new/1".to_string(),
            "http://new/2".to_string(),
            "http://new/3".to_string(),
        ];
        let (table, names) = build_positional_providers(Some(&existing), &urls);
        assert_eq!(names, vec!["Airport", "Backup", "订阅3"]);

        let airport = table.get("Airport").and_then(Document::as_mapping).unwrap();
        assert_eq!(airport.get("url").and_then(Document::as_str), Some("http://new/1"));
        assert_eq!(airport.get("interval").and_then(Document::as_i64), Some(86400));
        assert_eq!(airport.get("path").and_then(Document::as_str), Some("./providers/airport.yaml"));

        // Non-mapping template entry borrows the first mapping provider but not its path.
        let backup = table.get("Backup").and_then(Document::as_mapping).unwrap();
        assert_eq!(backup.get("interval").and_then(Document::as_i64), Some(86400));
        assert_eq!(backup.get("url").and_then(Document::as_str), Some("http://new/2"));
        assert_eq!(backup.get("path").and_then(Document::as_str), Some("./providers/sub2.yaml"));

        let third = table.get("订阅3").and_then(Document::as_mapping).unwrap();
        assert_eq!(third.get("path").and_then(Document::as_str), Some("./providers/sub3.yaml"));
        assert_eq!(third.get("interval").and_then(Document::as_i64), Some(86400));
    }

    #[test]
    fn test_positional_without_template_providers() {
        let urls = vec!["http://a".to_string()];
        let (table, names) = build_positional_providers(None, &urls);
        assert_eq!(names, vec!["订阅1"]);
        let provider = table.get("订阅1").and_then(Document::as_mapping).unwrap();
        let keys: Vec<&str> = provider.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["type", "interval", "health-check", "url", "path"]);

        let (table, names) = resolve_proxy_providers(None, &ProviderSource::None);
        assert!(table.is_empty());
        assert!(names.is_empty());
    }

    #[test]
    fn test_sync_group_use_fields_only_touches_declared_use() {
        let mut groups = parse_str(
            r#"
- name: A
  use: [old]
- name: B
  proxies: [DIRECT]
- not-a-group
"#,
        )
        .unwrap();
        sync_group_use_fields(Some(&mut groups), &["P1".to_string(), "P2".to_string()]);

        let items = &groups.as_sequence().unwrap().items;
        let a = items[0].as_mapping().unwrap();
        let use_list = a.get("use").and_then(Document::as_sequence).unwrap();
        assert!(use_list.contains_str("P1") && use_list.contains_str("P2"));
        assert_eq!(use_list.len(), 2);
        assert!(!items[1].as_mapping().unwrap().contains_key("use"));
    }
}
