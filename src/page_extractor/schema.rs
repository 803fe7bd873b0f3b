//! Result document produced by one crawl step.
//!
//! The in-page evaluator returns JSON in this shape; the download dispatcher
//! and the external resolver then mutate it in place before it is handed
//! back to the caller.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::ConfigSource;

/// Structured output of one crawl step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTree {
    /// Extracted data keyed by extraction-group id
    #[serde(default = "empty_object", deserialize_with = "null_as_object")]
    pub data: Value,

    #[serde(default, deserialize_with = "null_as_default")]
    pub download_root: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: BTreeMap<String, DownloadGroupResult>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub external_section: BTreeMap<String, ExternalBinding>,
}

impl Default for ResultTree {
    fn default() -> Self {
        Self {
            data: empty_object(),
            download_root: String::new(),
            downloads: BTreeMap::new(),
            external_section: BTreeMap::new(),
        }
    }
}

/// One file of a download group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFile {
    pub name: String,

    #[serde(default)]
    pub url: String,

    /// Set when this file could not be produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadFile {
    #[must_use]
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of one `downloadSection` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DownloadGroupWire")]
pub struct DownloadGroupResult {
    pub label: String,
    pub files: Vec<DownloadFile>,
}

impl DownloadGroupResult {
    /// Indices of files that failed
    #[must_use]
    pub fn error_indices(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.failed().then_some(i))
            .collect()
    }
}

/// Accepted encodings of a download group: the typed `files` list, or the
/// parallel-array form (`fileNames`, `links`, `errors`) emitted by older
/// evaluator scripts.
#[derive(Deserialize)]
#[serde(untagged)]
enum DownloadGroupWire {
    Files {
        #[serde(default)]
        label: String,
        files: Vec<DownloadFile>,
    },
    Parallel {
        #[serde(default)]
        label: String,
        #[serde(default, rename = "fileNames")]
        file_names: Vec<String>,
        #[serde(default)]
        links: Vec<String>,
        #[serde(default)]
        errors: Vec<usize>,
    },
}

impl From<DownloadGroupWire> for DownloadGroupResult {
    fn from(wire: DownloadGroupWire) -> Self {
        match wire {
            DownloadGroupWire::Files { label, files } => Self { label, files },
            DownloadGroupWire::Parallel {
                label,
                file_names,
                links,
                errors,
            } => {
                let files = file_names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| DownloadFile {
                        name,
                        url: links.get(i).cloned().unwrap_or_default(),
                        error: errors
                            .contains(&i)
                            .then(|| "reported failed by evaluator".to_string()),
                    })
                    .collect();
                Self { label, files }
            }
        }
    }
}

/// An external link declared by an extraction group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalBinding {
    #[serde(default)]
    pub id: String,

    /// Related configuration: a path/URL relative to the current config, or
    /// an embedded configuration
    #[serde(rename = "config", alias = "subConfigRef")]
    pub sub_config: ConfigSource,

    /// Slash-delimited path into `data`; the last segment is the URL key
    #[serde(rename = "connect", alias = "connectPath")]
    pub connect_path: String,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn null_as_object<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_object() } else { value })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_parallel_array_downloads() {
        let tree: ResultTree = serde_json::from_value(json!({
            "data": { "title": "x" },
            "downloadRoot": "/tmp/att",
            "downloads": {
                "files": {
                    "label": "PDF File",
                    "count": 3,
                    "fileNames": ["a.pdf", "b.pdf", "c.pdf"],
                    "links": ["http://h/a.pdf", "http://h/b.pdf"],
                    "errors": [1]
                }
            }
        }))
        .unwrap();

        let group = &tree.downloads["files"];
        assert_eq!(group.label, "PDF File");
        assert_eq!(group.files.len(), 3);
        assert_eq!(group.files[0].url, "http://h/a.pdf");
        assert_eq!(group.files[2].url, "");
        assert_eq!(group.error_indices(), vec![1]);
    }

    #[test]
    fn encodes_typed_file_list() {
        let group = DownloadGroupResult {
            label: "Docs".into(),
            files: vec![
                DownloadFile {
                    name: "a.pdf".into(),
                    url: "http://h/a.pdf".into(),
                    error: None,
                },
                DownloadFile {
                    name: "b.pdf".into(),
                    url: String::new(),
                    error: Some("timed out".into()),
                },
            ],
        };
        let encoded = serde_json::to_value(&group).unwrap();
        assert_eq!(encoded["files"][0].get("error"), None);
        assert_eq!(encoded["files"][1]["error"], "timed out");

        let decoded: DownloadGroupResult = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, group);
    }

    #[test]
    fn tolerates_sparse_evaluator_output() {
        let tree: ResultTree =
            serde_json::from_value(json!({ "data": null, "downloads": null })).unwrap();
        assert!(tree.data.as_object().is_some_and(Map::is_empty));
        assert!(tree.downloads.is_empty());
        assert!(tree.external_section.is_empty());
    }

    #[test]
    fn external_binding_accepts_path_or_inline_config() {
        let tree: ResultTree = serde_json::from_value(json!({
            "data": {},
            "externalSection": {
                "detail": { "id": "detail", "config": "detail.json", "connect": "list/url" },
                "inline": { "id": "inline", "config": { "dataSection": [] }, "connect": "/link" }
            }
        }))
        .unwrap();

        let detail = &tree.external_section["detail"];
        assert_eq!(detail.sub_config, ConfigSource::Path("detail.json".into()));
        assert_eq!(detail.connect_path, "list/url");
        assert!(matches!(
            tree.external_section["inline"].sub_config,
            ConfigSource::Inline(_)
        ));
    }
}
