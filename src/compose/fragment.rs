//! # Configuration fragments.
//!
//! A [`Fragment`] is a named, partial configuration tree contributed by one
//! concern (base settings, snapshotter settings, user overrides). It is parsed
//! lazily at merge time so a malformed fragment is reported by name.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::ComposeError;

/// Where the content of a fragment comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentSource {
    /// TOML text, parsed at merge time.
    Toml(Cow<'static, str>),
    /// Already structured table.
    Table(toml::Table),
    /// JSON object, kept as JSON so integers above `i64::MAX` and `null`
    /// survive a JSON merge.
    Json(Map<String, Value>),
}

/// Named partial configuration document.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    name: Cow<'static, str>,
    source: FragmentSource,
}

impl Fragment {
    /// Fragment backed by TOML text.
    pub fn toml(name: impl Into<Cow<'static, str>>, text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            source: FragmentSource::Toml(text.into()),
        }
    }

    /// Fragment backed by an existing table.
    pub fn table(name: impl Into<Cow<'static, str>>, table: toml::Table) -> Self {
        Self {
            name: name.into(),
            source: FragmentSource::Table(table),
        }
    }

    /// Fragment backed by a JSON object.
    pub fn json(name: impl Into<Cow<'static, str>>, object: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            source: FragmentSource::Json(object),
        }
    }

    /// Fragment name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses the fragment into a table.
    pub(crate) fn to_table(&self) -> Result<toml::Table, ComposeError> {
        match &self.source {
            FragmentSource::Table(table) => Ok(table.clone()),
            FragmentSource::Toml(text) => {
                text.parse::<toml::Table>()
                    .map_err(|source| ComposeError::Parse {
                        fragment: self.name.to_string(),
                        source,
                    })
            }
            FragmentSource::Json(object) => match toml::Value::try_from(object) {
                Ok(toml::Value::Table(table)) => Ok(table),
                Ok(other) => Err(ComposeError::NotATable {
                    fragment: self.name.to_string(),
                    reason: format!("converted to {}", other.type_str()),
                }),
                Err(e) => Err(ComposeError::NotATable {
                    fragment: self.name.to_string(),
                    reason: e.to_string(),
                }),
            },
        }
    }

    /// Converts the fragment into a JSON object.
    pub(crate) fn to_object(&self) -> Result<Map<String, Value>, ComposeError> {
        let table = match &self.source {
            FragmentSource::Json(object) => return Ok(object.clone()),
            _ => self.to_table()?,
        };
        match serde_json::to_value(table) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(ComposeError::NotATable {
                fragment: self.name.to_string(),
                reason: format!("converted to {other}"),
            }),
            Err(e) => Err(ComposeError::NotATable {
                fragment: self.name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_fragment_parses() {
        let f = Fragment::toml("base", "a = 1\n[b]\nc = \"x\"\n");
        let table = f.to_table().unwrap();
        assert_eq!(table["a"].as_integer(), Some(1));
        assert_eq!(table["b"]["c"].as_str(), Some("x"));
    }

    #[test]
    fn test_malformed_fragment_is_named() {
        let f = Fragment::toml("user-overrides", "[broken");
        match f.to_table().unwrap_err() {
            ComposeError::Parse { fragment, .. } => assert_eq!(fragment, "user-overrides"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_json_null_cannot_become_toml() {
        let object: Map<String, Value> = serde_json::from_str(r#"{"a": null}"#).unwrap();
        let err = Fragment::json("kubelet-user", object).to_table().unwrap_err();
        assert!(matches!(err, ComposeError::NotATable { ref fragment, .. } if fragment == "kubelet-user"));
    }

    #[test]
    fn test_json_object_becomes_table() {
        let object: Map<String, Value> =
            serde_json::from_str(r#"{"maxPods": 110, "labels": {"a": "b"}}"#).unwrap();
        let table = Fragment::json("user", object).to_table().unwrap();
        assert_eq!(table["maxPods"].as_integer(), Some(110));
        assert_eq!(table["labels"]["a"].as_str(), Some("b"));
    }

    #[test]
    fn test_json_object_is_kept_verbatim() {
        let object: Map<String, Value> =
            serde_json::from_str(r#"{"soft": 18446744073709551615, "gone": null}"#).unwrap();
        let kept = Fragment::json("user", object.clone()).to_object().unwrap();
        assert_eq!(kept, object);
        assert_eq!(kept["soft"].as_u64(), Some(u64::MAX));
    }

    #[test]
    fn test_toml_fragment_becomes_object() {
        let object = Fragment::toml("base", "a = 1\n[b]\nc = \"x\"\n").to_object().unwrap();
        assert_eq!(object["a"], Value::from(1));
        assert_eq!(object["b"]["c"], Value::from("x"));
    }
}
