//! Pipeline configuration: the JSON document that names which modules to
//! load and with what keyword arguments, plus `{name}`-style template
//! substitution from CLI key/value pairs.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

pub const DEFAULT_START_TTL: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    Thread,
    Process,
}

impl Default for Binding {
    fn default() -> Self {
        Binding::Thread
    }
}

/// A single `(module_name, kwargs)` entry from one of the three module arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    #[serde(default)]
    pub args: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "InputEndpointModules", default)]
    pub input_modules: Vec<ModuleEntry>,
    #[serde(rename = "ReemitterModules", default)]
    pub reemitter_modules: Vec<ModuleEntry>,
    #[serde(rename = "OutputEndpointModules", default)]
    pub output_modules: Vec<ModuleEntry>,
    #[serde(default = "default_start_ttl")]
    pub start_ttl: i64,
    #[serde(default)]
    pub binding: Binding,
}

fn default_start_ttl() -> i64 {
    DEFAULT_START_TTL
}

// `ModuleEntry` is actually serialized on the wire as a 2-tuple
// `[name, kwargs]`, matching the distilled config format. Custom
// Serialize/Deserialize make the tuple shape transparent to callers.
impl Serialize for ModuleEntry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.name)?;
        tup.serialize_element(&self.args)?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for ModuleEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (name, args): (String, BTreeMap<String, serde_json::Value>) =
            Deserialize::deserialize(deserializer)?;
        Ok(ModuleEntry { name, args })
    }
}

impl PipelineConfig {
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_str(&buf)
    }

    pub fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(ProtocolError::from)
    }

    pub fn all_modules_mut(&mut self) -> impl Iterator<Item = &mut ModuleEntry> {
        self.input_modules
            .iter_mut()
            .chain(self.reemitter_modules.iter_mut())
            .chain(self.output_modules.iter_mut())
    }

    /// Substitute `{key}` placeholders in every string-valued kwarg using
    /// `template`. Mirrors `str.format(**template_filler)`: a referenced key
    /// absent from `template` is a fatal configuration error.
    pub fn apply_template(&mut self, template: &BTreeMap<String, String>) -> Result<()> {
        for entry in self.all_modules_mut() {
            for value in entry.args.values_mut() {
                if let serde_json::Value::String(s) = value {
                    *s = substitute(s, template)?;
                }
            }
        }
        Ok(())
    }
}

fn substitute(template_str: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template_str.len());
    let mut chars = template_str.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '{' {
            let mut key = String::new();
            let mut closed = false;
            for (_, c2) in chars.by_ref() {
                if c2 == '}' {
                    closed = true;
                    break;
                }
                key.push(c2);
            }
            if !closed {
                out.push('{');
                out.push_str(&key);
                continue;
            }
            if key.is_empty() {
                out.push_str("{}");
                continue;
            }
            match vars.get(&key) {
                Some(v) => out.push_str(v),
                None => return Err(ProtocolError::MissingTemplateKey(key)),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Parse `--template KEY VAL KEY VAL ...` into a map. Errors if the count is odd.
pub fn template_from_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    if pairs.len() % 2 != 0 {
        return Err(ProtocolError::OddTemplateArgCount(pairs.len()));
    }
    let mut map = BTreeMap::new();
    for chunk in pairs.chunks(2) {
        map.insert(chunk[0].clone(), chunk[1].clone());
    }
    Ok(map)
}

/// SQLite table names: `[A-Za-z0-9_]+`, must not start with a digit.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.chars().next().unwrap().is_ascii_digit()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ProtocolError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_key() {
        let mut vars = BTreeMap::new();
        vars.insert("host".to_string(), "example.com".to_string());
        assert_eq!(substitute("http://{host}/x", &vars).unwrap(), "http://example.com/x");
    }

    #[test]
    fn missing_key_is_error() {
        let vars = BTreeMap::new();
        assert!(matches!(
            substitute("{missing}", &vars),
            Err(ProtocolError::MissingTemplateKey(k)) if k == "missing"
        ));
    }

    #[test]
    fn odd_template_pairs_rejected() {
        let pairs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(template_from_pairs(&pairs).is_err());
    }

    #[test]
    fn table_name_validation() {
        assert!(validate_table_name("downloads").is_ok());
        assert!(validate_table_name("_dl_1").is_ok());
        assert!(validate_table_name("1dl").is_err());
        assert!(validate_table_name("dl-1").is_err());
    }

    #[test]
    fn parses_two_tuple_module_array() {
        let json = r#"{
            "InputEndpointModules": [["EmitLines", {"data": "a\nb"}]],
            "ReemitterModules": [],
            "OutputEndpointModules": [["Log", {}]],
            "start_ttl": 3
        }"#;
        let cfg = PipelineConfig::from_str(json).unwrap();
        assert_eq!(cfg.input_modules.len(), 1);
        assert_eq!(cfg.input_modules[0].name, "EmitLines");
        assert_eq!(cfg.start_ttl, 3);
        assert_eq!(cfg.binding, Binding::Thread);
    }
}
