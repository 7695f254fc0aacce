use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        load_yaml_str(&content, values)?;
    }
    Ok(())
}

pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys. Sequences are stored whole
/// under their parent key.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key_str = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
            }
        }
    }
}
