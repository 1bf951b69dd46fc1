use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Node entry in the allow-list file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AllowListNode {
    /// `0x`-prefixed 32-byte hardware identity.
    pub hardware_identity: String,

    /// Display name for logs.
    pub name: String,
}

/// Allow-list file handed over by whatever tracks authorizations on-chain.
///
/// ```json
/// {
///   "nodes": [{ "hardware_identity": "0x52fd...0f", "name": "Dev-Node" }],
///   "firmware": ["0x1234...ef"]
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AllowList {
    /// Authorized nodes.
    #[serde(default)]
    pub nodes: Vec<AllowListNode>,

    /// Approved firmware measurements, `0x`-prefixed.
    #[serde(default)]
    pub firmware: Vec<String>,
}

impl AllowList {
    /// Parse an allow-list from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not a valid allow-list document.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse allow-list: {e}")))
    }

    /// Load an allow-list from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read allow-list file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow_list() {
        let allow_list = AllowList::from_json(
            r#"{
                "nodes": [{ "hardware_identity": "0x01", "name": "a" }],
                "firmware": ["0x02", "0x03"]
            }"#,
        )
        .unwrap();

        assert_eq!(allow_list.nodes.len(), 1);
        assert_eq!(allow_list.nodes[0].name, "a");
        assert_eq!(allow_list.firmware, vec!["0x02", "0x03"]);
    }

    #[test]
    fn test_sections_default_to_empty() {
        assert_eq!(AllowList::from_json("{}").unwrap(), AllowList::default());
    }

    #[test]
    fn test_unknown_keys_are_errors() {
        assert!(matches!(
            AllowList::from_json(r#"{ "versions": [] }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AllowList::from_file("/nonexistent/allow-list.json").unwrap_err();

        assert!(err.to_string().contains("/nonexistent/allow-list.json"));
    }
}
