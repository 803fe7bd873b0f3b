//! JavaScript evaluation scripts
//!
//! Every script here is a function expression; callers pass its arguments
//! through `PageHandle::evaluate`. Selectors may start with any number of
//! `:frame(X)` / `:shadow(X)` prefixes, which move the query root into the
//! content document of iframe `X` or the shadow root of host `X` before the
//! remaining selector is applied.

/// Shared pierce-aware query helper, spliced into the scripts below
macro_rules! query_prelude {
    () => {
        r#"
        function queryAll(selector) {
            let root = document;
            let rest = String(selector).trim();
            const prefix = /^:(frame|shadow)\(((?:[^()]|\([^()]*\))+)\)\s*/;
            let m;
            while ((m = rest.match(prefix))) {
                const host = root.querySelector(m[2]);
                if (!host) return [];
                root = m[1] === 'frame'
                    ? (host.contentDocument || (host.contentWindow && host.contentWindow.document))
                    : host.shadowRoot;
                if (!root) return [];
                rest = rest.slice(m[0].length);
            }
            return rest ? Array.from(root.querySelectorAll(rest)) : [];
        }
        "#
    };
}

/// `(selector) => bool`: exactly one match with a non-empty bounding box.
/// Any fault (bad selector, cross-origin frame) reads as not visible.
pub const VISIBILITY_SCRIPT: &str = concat!(
    "(selector) => {",
    query_prelude!(),
    r#"
        try {
            const nodes = queryAll(selector);
            if (nodes.length !== 1) return false;
            const rect = nodes[0].getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        } catch (e) {
            return false;
        }
    }"#
);

/// `(selector) => number`: count of matches
pub const COUNT_SCRIPT: &str = concat!(
    "(selector) => {",
    query_prelude!(),
    r#"
        return queryAll(selector).length;
    }"#
);

/// `(selector, index, modifiers) => true`: synthesize a click on the
/// index-th match. `modifiers` is the CDP modifier mask (1 alt, 2 ctrl,
/// 8 shift). Used for elements a native query cannot reach.
pub const CLICK_NTH_SCRIPT: &str = concat!(
    "(selector, index, modifiers) => {",
    query_prelude!(),
    r#"
        const el = queryAll(selector)[index];
        if (!el) throw new Error('no element #' + index + ' for ' + selector);
        if (el.scrollIntoView) el.scrollIntoView({ block: 'center' });
        el.dispatchEvent(new MouseEvent('click', {
            bubbles: true,
            cancelable: true,
            view: window,
            altKey: (modifiers & 1) !== 0,
            ctrlKey: (modifiers & 2) !== 0,
            shiftKey: (modifiers & 8) !== 0
        }));
        return true;
    }"#
);

/// `() => {readyState, resources}`: load progress sample used for the
/// network-idle heuristic
pub const READY_STATE_SCRIPT: &str = r#"
    () => {
        let resources = 0;
        try { resources = performance.getEntriesByType('resource').length; } catch (e) {}
        return {
            readyState: document.readyState,
            resources: resources,
            bodyExists: document.body !== null
        };
    }
"#;

/// Bundled in-page evaluator. Defines `run(config)`.
pub const DEFAULT_EVALUATOR_SCRIPT: &str = include_str!("js/extractor.js");

/// Wrap an evaluator script into a function expression taking the config
#[must_use]
pub fn evaluator_entry(script: &str) -> String {
    format!("(cfg) => {{\n{script}\n;return run(cfg);\n}}")
}
