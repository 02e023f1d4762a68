//! Default-annotation policy table
//!
//! The table is an ordered list of entries, each naming one Ingress and the
//! annotations it must carry. It is loaded once at startup and shared
//! read-only between request handlers.
//!
//! Document format (JSON, or YAML for `.yaml`/`.yml` files):
//!
//! ```json
//! [
//!   {
//!     "ingressName": "test-ingress",
//!     "defaultAnnotations": {
//!       "ingress.citrix.com/secure-port": "4443",
//!       "ingress.citrix.com/insecure-port": "81"
//!     }
//!   }
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{Error, Result};

/// One policy record: a target Ingress name and its default annotations
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntry {
    /// Name of the target object, matched case-insensitively.
    ///
    /// Entries without a name never match anything.
    #[serde(default, alias = "targetName", skip_serializing_if = "Option::is_none")]
    pub ingress_name: Option<String>,

    /// Annotations to enforce on the target object
    #[serde(default)]
    pub default_annotations: BTreeMap<String, String>,
}

impl PolicyEntry {
    /// Create an entry for `name` with the given defaults
    pub fn new(
        name: impl Into<String>,
        default_annotations: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            ingress_name: Some(name.into()),
            default_annotations: default_annotations.into_iter().collect(),
        }
    }

    /// Whether this entry targets an object called `name`
    pub fn matches(&self, name: &str) -> bool {
        self.ingress_name
            .as_deref()
            .is_some_and(|target| target.to_lowercase() == name.to_lowercase())
    }
}

/// Immutable, ordered collection of policy entries
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PolicyTable {
    entries: Vec<PolicyEntry>,
}

impl PolicyTable {
    /// Build a table from entries, preserving their order
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    /// A table with no entries; every decision against it is "no mutation"
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries, including inert ones without a name
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose name matches `name` case-insensitively
    pub fn find(&self, name: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|entry| entry.matches(name))
    }

    /// Default annotations for `name`, or `None` if no entry matches
    pub fn defaults_for(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.find(name).map(|entry| &entry.default_annotations)
    }

    /// Parse a JSON policy document
    pub fn parse_json(doc: &str) -> Result<Self> {
        serde_json::from_str(doc)
            .map_err(|e| Error::config(format!("invalid policy document: {e}")))
    }

    /// Parse a YAML policy document.
    ///
    /// YAML would otherwise coerce plain scalars such as `4443` or `true`
    /// into strings, so names and annotation values must be string scalars.
    pub fn parse_yaml(doc: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(doc)
            .map_err(|e| Error::config(format!("invalid policy document: {e}")))?;
        check_yaml_strings(&value)?;
        serde_yaml::from_value(value)
            .map_err(|e| Error::config(format!("invalid policy document: {e}")))
    }

    /// Read and parse the policy document at `path`.
    ///
    /// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
    pub fn try_load(path: &Path) -> Result<Self> {
        let doc = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::parse_yaml(&doc)
        } else {
            Self::parse_json(&doc)
        }
    }

    /// Load the policy document at `path`, falling back to an empty table.
    ///
    /// Failures are logged and never returned: the webhook keeps serving and
    /// simply mutates nothing.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(table) => {
                info!(
                    path = %path.display(),
                    entries = table.len(),
                    "Loaded default annotation policy"
                );
                table
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load default annotations, continuing with empty policy"
                );
                Self::empty()
            }
        }
    }
}

/// Reject non-string names, annotation keys, and annotation values
fn check_yaml_strings(doc: &serde_yaml::Value) -> Result<()> {
    use serde_yaml::Value;

    let Value::Sequence(entries) = doc else {
        return Ok(());
    };

    for (index, entry) in entries.iter().enumerate() {
        let Value::Mapping(fields) = entry else {
            continue;
        };

        for key in ["ingressName", "targetName"] {
            match fields.get(key) {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(Error::config(format!(
                        "invalid policy document: entry {index}: {key} must be a string, got {other:?}"
                    )))
                }
            }
        }

        if let Some(Value::Mapping(annotations)) = fields.get("defaultAnnotations") {
            for (key, value) in annotations {
                if !matches!(key, Value::String(_)) || !matches!(value, Value::String(_)) {
                    return Err(Error::config(format!(
                        "invalid policy document: entry {index}: annotation {key:?} must map a string to a string, got {value:?}"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"[
        {
            "ingressName": "test-ingress",
            "defaultAnnotations": {
                "ingress.citrix.com/secure-port": "4443",
                "ingress.citrix.com/insecure-port": "81"
            }
        }
    ]"#;

    fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_sample_document() {
        let table = PolicyTable::parse_json(SAMPLE).unwrap();
        assert_eq!(table.len(), 1);

        let defaults = table.defaults_for("test-ingress").unwrap();
        assert_eq!(defaults.get("ingress.citrix.com/secure-port").unwrap(), "4443");
        assert_eq!(defaults.get("ingress.citrix.com/insecure-port").unwrap(), "81");
    }

    #[rstest]
    #[case("Class1", "class1")]
    #[case("class1", "CLASS1")]
    #[case("test-ingress", "Test-Ingress")]
    fn name_match_is_case_insensitive(#[case] target: &str, #[case] object: &str) {
        let table = PolicyTable::new(vec![PolicyEntry::new(target, [])]);
        assert!(table.find(object).is_some());
    }

    #[test]
    fn first_match_wins() {
        let table = PolicyTable::new(vec![
            PolicyEntry::new("web", [("a".to_string(), "first".to_string())]),
            PolicyEntry::new("WEB", [("a".to_string(), "second".to_string())]),
        ]);
        assert_eq!(table.defaults_for("web").unwrap().get("a").unwrap(), "first");
    }

    #[test]
    fn entries_without_name_are_inert() {
        let doc = r#"[
            {"defaultAnnotations": {"a": "1"}},
            {"ingressName": "web", "defaultAnnotations": {"b": "2"}}
        ]"#;
        let table = PolicyTable::parse_json(doc).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.find("").is_none());
        assert_eq!(table.defaults_for("web").unwrap().len(), 1);
    }

    #[test]
    fn target_name_alias_is_accepted() {
        let doc = r#"[{"targetName": "web", "defaultAnnotations": {"a": "1"}}]"#;
        let table = PolicyTable::parse_json(doc).unwrap();
        assert!(table.find("web").is_some());
    }

    #[test]
    fn missing_defaults_mean_empty_defaults() {
        let table = PolicyTable::parse_json(r#"[{"ingressName": "web"}]"#).unwrap();
        assert!(table.defaults_for("web").unwrap().is_empty());
    }

    #[test]
    fn non_string_default_value_is_rejected() {
        let doc = r#"[{"ingressName": "web", "defaultAnnotations": {"port": 4443}}]"#;
        let err = PolicyTable::parse_json(doc).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[rstest]
    #[case("- ingressName: web\n  defaultAnnotations:\n    port: 4443\n")]
    #[case("- ingressName: web\n  defaultAnnotations:\n    on: true\n")]
    #[case("- ingressName: web\n  defaultAnnotations:\n    80: \"http\"\n")]
    #[case("- ingressName: 123\n  defaultAnnotations:\n    a: \"1\"\n")]
    #[case("- targetName: true\n")]
    fn non_string_yaml_scalars_are_rejected(#[case] doc: &str) {
        let err = PolicyTable::parse_yaml(doc).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
    }

    #[test]
    fn quoted_yaml_scalars_are_accepted() {
        let doc = "- ingressName: \"123\"\n  defaultAnnotations:\n    port: \"4443\"\n    enabled: 'true'\n";
        let table = PolicyTable::parse_yaml(doc).unwrap();
        let defaults = table.defaults_for("123").unwrap();
        assert_eq!(defaults.get("port").unwrap(), "4443");
        assert_eq!(defaults.get("enabled").unwrap(), "true");
    }

    /// Story: an unquoted port in a YAML config map is refused at load time
    #[test]
    fn story_unquoted_yaml_port_falls_back_to_empty_table() {
        let file = write_temp(
            ".yml",
            "- ingressName: web\n  defaultAnnotations:\n    ingress.citrix.com/secure-port: 4443\n",
        );
        assert!(PolicyTable::try_load(file.path()).is_err());
        assert!(PolicyTable::load(file.path()).is_empty());
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(PolicyTable::parse_json("{not json").is_err());
        assert!(PolicyTable::parse_json(r#"{"ingressName": "web"}"#).is_err());
    }

    #[test]
    fn try_load_reads_yaml_by_extension() {
        let file = write_temp(
            ".yaml",
            "- ingressName: web\n  defaultAnnotations:\n    a: \"1\"\n",
        );
        let table = PolicyTable::try_load(file.path()).unwrap();
        assert_eq!(table.defaults_for("web").unwrap().get("a").unwrap(), "1");
    }

    #[test]
    fn load_reads_json_file() {
        let file = write_temp(".json", SAMPLE);
        let table = PolicyTable::load(file.path());
        assert_eq!(table.len(), 1);
    }

    /// Story: operator ships a broken config map, webhook keeps running
    #[test]
    fn story_malformed_file_falls_back_to_empty_table() {
        let file = write_temp(".json", "[{\"ingressName\": ");
        let table = PolicyTable::load(file.path());
        assert!(table.is_empty());
        assert!(table.find("test-ingress").is_none());
    }

    /// Story: config map not mounted, webhook keeps running
    #[test]
    fn story_missing_file_falls_back_to_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = PolicyTable::load(&dir.path().join("absent.json"));
        assert!(table.is_empty());

        let err = PolicyTable::try_load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
