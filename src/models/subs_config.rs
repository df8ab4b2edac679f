use crate::error::{ProxySubError, Result};
use crate::models::{Document, Mapping};

/// Provider declarations of an override document, resolved to one shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProviderSource {
    /// Neither `proxy-providers` nor `subs` was given
    #[default]
    None,
    /// Bare subscription URLs; provider names are assigned by position
    Urls(Vec<String>),
    /// Named provider specs in declaration order
    Named(Vec<(String, Mapping)>),
}

impl ProviderSource {
    /// Every declared subscription URL, in declaration order.
    pub fn urls(&self) -> Vec<String> {
        match self {
            ProviderSource::None => Vec::new(),
            ProviderSource::Urls(urls) => urls.clone(),
            ProviderSource::Named(providers) => providers
                .iter()
                .filter_map(|(_, spec)| spec.get_trimmed_str("url"))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// User overrides merged into the template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubsConfig {
    pub provider_source: ProviderSource,
    /// Proxy mappings in input order, not yet deduplicated
    pub proxies: Vec<Mapping>,
    /// Explicit health-check URL for the exit group
    pub west_cowboy_url: Option<String>,
    /// Explicit expected status for the exit group, a string or an integer
    pub west_cowboy_expected_status: Option<Document>,
}

impl SubsConfig {
    /// Name of the first proxy with a non-blank name; it acts as the home relay.
    pub fn home_proxy_name(&self) -> Result<String> {
        self.proxies
            .iter()
            .find_map(|proxy| proxy.get_trimmed_str("name"))
            .map(str::to_string)
            .ok_or_else(|| {
                ProxySubError::Validation(
                    "subs.yaml must contain at least one proxy with a non-empty 'name'"
                        .to_string(),
                )
            })
    }

    /// Subscription URLs to fetch when remote enrichment is enabled.
    pub fn subscription_urls(&self) -> Vec<String> {
        self.provider_source.urls()
    }

    /// Append proxies recovered from elsewhere after the user's own entries.
    pub fn extend_proxies<I>(&mut self, proxies: I)
    where
        I: IntoIterator<Item = Document>,
    {
        self.proxies.extend(proxies.into_iter().filter_map(|proxy| match proxy {
            Document::Mapping(map) => Some(map),
            _ => None,
        }));
    }
}
