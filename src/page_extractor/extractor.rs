//! Runs the in-page evaluator and decodes its result.

use serde_json::Value;

use super::js_scripts::evaluator_entry;
use super::schema::ResultTree;
use crate::browser::PageHandle;
use crate::config::CrawlConfig;
use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};

/// Evaluate `script` in `page` with `config` and decode the result tree.
///
/// Any evaluation or decode fault is an `Extraction` error; nothing is
/// retried.
pub async fn extract(
    page: &dyn PageHandle,
    config: &CrawlConfig,
    script: &str,
) -> CrawlResult<ResultTree> {
    let input = config
        .to_evaluator_input()
        .map_err(|e| CrawlError::Extraction(format!("cannot encode config: {e}")))?;

    let raw = page
        .evaluate(&evaluator_entry(script), vec![input])
        .await
        .map_err(|e| CrawlError::Extraction(format!("evaluator failed: {e:#}")))?;

    decode_result(raw)
}

/// Decode the evaluator's return value
pub fn decode_result(raw: Value) -> CrawlResult<ResultTree> {
    if !raw.is_object() {
        return Err(CrawlError::Extraction(format!(
            "evaluator returned {raw} instead of a result object"
        )));
    }
    let tree: ResultTree = serde_json::from_value(raw)
        .map_err(|e| CrawlError::Extraction(format!("undecodable result: {e}")))?;
    if !tree.data.is_object() {
        return Err(CrawlError::Extraction(
            "result data is not an object".to_string(),
        ));
    }
    log::debug!(
        "Decoded result: {} data keys, {} download groups, {} external bindings",
        tree.data.as_object().map_or(0, serde_json::Map::len),
        tree.downloads.len(),
        tree.external_section.len()
    );
    Ok(tree)
}
