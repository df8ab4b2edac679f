use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use url::Url;

use crate::error::{FetchError, ProxySubError, Result};
use crate::models::Document;
use crate::utils::http::{build_client, web_get_async};
use crate::utils::yaml::parse_str;

/// Proxy entries of a subscription document.
///
/// Looks at a non-empty `proxies` sequence, then `payload`, then a root
/// sequence. Only mappings with a non-blank `name` are returned.
pub fn extract_proxies(doc: &Document) -> Vec<Document> {
    let candidates = match doc {
        Document::Mapping(map) => ["proxies", "payload"]
            .iter()
            .filter_map(|key| map.get(key))
            .find(|value| match value {
                Document::Sequence(seq) => !seq.is_empty(),
                other => !other.is_null(),
            }),
        Document::Sequence(_) => Some(doc),
        _ => None,
    };

    let Some(Document::Sequence(seq)) = candidates else {
        return Vec::new();
    };

    seq.iter()
        .filter(|item| {
            item.as_mapping()
                .and_then(|proxy| proxy.get_trimmed_str("name"))
                .is_some()
        })
        .cloned()
        .collect()
}

/// Parse subscription text and extract its proxies.
pub fn parse_subscription_text(text: &str) -> Result<Vec<Document>> {
    Ok(extract_proxies(&parse_str(text)?))
}

/// Trimmed names of the proxies in a subscription or provider cache file.
///
/// Unparseable text yields no names.
pub fn extract_proxy_names(text: &str) -> Vec<String> {
    match parse_subscription_text(text) {
        Ok(proxies) => proxies
            .iter()
            .filter_map(|proxy| proxy.as_mapping()?.get_trimmed_str("name"))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            debug!("Ignoring unparseable proxy list: {}", e);
            Vec::new()
        }
    }
}

async fn fetch_one(client: &Client, url: &str) -> std::result::Result<Vec<Document>, String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("subscription url must be a non-empty string".to_string());
    }
    Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;

    let body = web_get_async(client, url).await?;
    parse_subscription_text(&body).map_err(|e| e.to_string())
}

/// Fetch every subscription URL concurrently and collect their proxies.
///
/// Each request carries its own `timeout`. Failures are collected per URL;
/// the call fails only when no proxy was recovered and at least one URL
/// failed. Failures alongside recovered proxies are logged and dropped.
pub async fn fetch_subscription_proxies(urls: &[String], timeout: Duration) -> Result<Vec<Document>> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }
    let client = build_client(timeout).map_err(|e| {
        ProxySubError::Fetch(FetchError {
            failures: vec![(String::new(), e)],
        })
    })?;

    let results = join_all(urls.iter().map(|url| fetch_one(&client, url))).await;

    let mut proxies = Vec::new();
    let mut failures = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(found) => {
                debug!("Fetched {} proxies from {}", found.len(), url);
                proxies.extend(found);
            }
            Err(e) => failures.push((url.trim().to_string(), e)),
        }
    }

    if proxies.is_empty() && !failures.is_empty() {
        return Err(FetchError { failures }.into());
    }
    for (url, reason) in &failures {
        warn!("Subscription fetch failed for {}: {}", url, reason);
    }
    info!(
        "Fetched {} proxies from {} subscription(s)",
        proxies.len(),
        urls.len() - failures.len()
    );
    Ok(proxies)
}

/// Blocking wrapper around [`fetch_subscription_proxies`] for synchronous callers.
pub fn fetch_subscription_proxies_blocking(
    urls: &[String],
    timeout: Duration,
) -> Result<Vec<Document>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(fetch_subscription_proxies(urls, timeout))
}
