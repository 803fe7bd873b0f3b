//! External-link resolution
//!
//! Each binding in a result's `externalSection` names a related config and a
//! connect path into `data`. Every URL found at that path is crawled with the
//! related config, and the URL string is replaced in place by the child's
//! extracted `data`. A child that fails leaves a diagnostic string in its
//! place instead; the parent crawl always continues. Bindings and the URLs
//! under them are processed one at a time, depth first.

use serde_json::Value;

use super::crawl_types::{CrawlContext, CrawlError, CrawlResult};
use super::crawler::{CrawlOptions, Crawler, close_quietly};
use crate::config::{ConfigSource, LoadedConfig, load_config};
use crate::page_extractor::{ExternalBinding, ResultTree};
use crate::utils::json_path::locate_fields;
use crate::utils::path_utils::resolve_ref;

/// Text stored in place of a URL whose sub-crawl failed
#[must_use]
pub fn failure_diagnostic(url: &str, error: &CrawlError) -> String {
    format!("an error occurred when crawling the external url: {url} ({error})")
}

/// Resolve every binding of `result` in place.
///
/// `config_location` is where the current config was loaded from; relative
/// config references are resolved against it.
pub(crate) async fn resolve_externals(
    crawler: &Crawler,
    config_location: Option<&str>,
    result: &mut ResultTree,
    options: CrawlOptions,
    ctx: &CrawlContext,
) {
    let bindings: Vec<(String, ExternalBinding)> = result
        .external_section
        .iter()
        .map(|(key, binding)| (key.clone(), binding.clone()))
        .collect();

    for (key, binding) in bindings {
        let fields = match locate_fields(&result.data, &binding.connect_path) {
            Ok(fields) => fields,
            Err(fault) => {
                log::warn!(
                    "External binding '{key}': connect path '{}' unusable: {fault}",
                    binding.connect_path
                );
                continue;
            }
        };

        let pending: Vec<_> = fields
            .into_iter()
            .filter_map(|field| {
                let url = field.read_str(&result.data)?.to_string();
                Some((field, url))
            })
            .collect();
        if pending.is_empty() {
            continue;
        }

        let source = match sub_config_source(config_location, &binding.sub_config) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("External binding '{key}' skipped: {e}");
                continue;
            }
        };
        let child_config = load_config(source, crawler.fetcher()).await;
        let identity = config_identity(config_location, &key, &child_config);

        for (field, url) in pending {
            let value = match &child_config {
                Ok(loaded) => match crawl_child(crawler, &url, loaded, &identity, options, ctx).await
                {
                    Ok(data) => data,
                    Err(e) => {
                        log::warn!("External url {url} failed: {e}");
                        Value::String(failure_diagnostic(&url, &e))
                    }
                },
                Err(e) => Value::String(failure_diagnostic(&url, e)),
            };
            if let Err(fault) = field.replace(&mut result.data, value) {
                log::warn!("Cannot splice result for {url}: {fault}");
            }
        }
    }
}

async fn crawl_child(
    crawler: &Crawler,
    url: &str,
    loaded: &LoadedConfig,
    identity: &str,
    options: CrawlOptions,
    ctx: &CrawlContext,
) -> CrawlResult<Value> {
    let max_depth = crawler.settings().max_external_depth();
    if ctx.depth() >= max_depth {
        return Err(CrawlError::ExternalResolution {
            url: url.to_string(),
            message: format!("maximum external depth {max_depth} reached"),
        });
    }
    if ctx.contains(url, identity) {
        return Err(CrawlError::ExternalResolution {
            url: url.to_string(),
            message: "cyclic external binding".to_string(),
        });
    }

    log::info!("Crawling external url {url} (depth {})", ctx.depth() + 1);
    let child_ctx = ctx.descend(url, identity);
    let outcome = crawler
        .crawl_loaded_url(url.to_string(), loaded.clone(), options, child_ctx)
        .await?;
    // only the top-level tab is ever handed back to the caller
    if let Some(page) = outcome.page {
        close_quietly(page.as_ref()).await;
    }
    Ok(outcome.result.data)
}

fn sub_config_source(
    config_location: Option<&str>,
    sub_config: &ConfigSource,
) -> CrawlResult<ConfigSource> {
    match sub_config {
        ConfigSource::Path(reference) => {
            resolve_ref(config_location, reference).map(ConfigSource::Path)
        }
        ConfigSource::Inline(config) => Ok(ConfigSource::Inline(config.clone())),
    }
}

/// Key used for cycle detection: the config's location, or for in-line
/// configs the declaring config plus the binding key
fn config_identity(
    parent_location: Option<&str>,
    binding_key: &str,
    child: &CrawlResult<LoadedConfig>,
) -> String {
    match child.as_ref().ok().and_then(|c| c.location.as_deref()) {
        Some(location) => location.to_string(),
        None => format!("{}#{binding_key}", parent_location.unwrap_or("inline")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_names_url_and_cause() {
        let err = CrawlError::timeout("page load", std::time::Duration::from_secs(30));
        assert_eq!(
            failure_diagnostic("http://x/y", &err),
            "an error occurred when crawling the external url: http://x/y (page load timed out after 30000ms)"
        );
    }

    #[cfg(unix)]
    #[test]
    fn path_reference_resolves_against_parent_config() {
        let source = sub_config_source(Some("/cfg/dir/a.json"), &"detail.json".into()).unwrap();
        assert_eq!(source, ConfigSource::Path("/cfg/dir/detail.json".into()));
    }
}
