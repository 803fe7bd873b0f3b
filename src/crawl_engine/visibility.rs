//! Element visibility probe

use serde_json::Value;

use crate::browser::PageHandle;
use crate::page_extractor::js_scripts::VISIBILITY_SCRIPT;

/// Whether `selector` resolves to exactly one element with a non-empty
/// rendered box.
///
/// Never fails: evaluation faults, bad selectors and unexpected return
/// values all read as `false`.
pub async fn is_visible(page: &dyn PageHandle, selector: &str) -> bool {
    match page
        .evaluate(VISIBILITY_SCRIPT, vec![Value::from(selector)])
        .await
    {
        Ok(Value::Bool(visible)) => visible,
        Ok(other) => {
            log::trace!("Visibility probe for {selector} returned {other}");
            false
        }
        Err(e) => {
            log::trace!("Visibility probe for {selector} failed: {e:#}");
            false
        }
    }
}
