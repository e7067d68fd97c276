//! Localization of display strings.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

const EN: &str = include_str!("../locales/en.json");
const FI: &str = include_str!("../locales/fi.json");
const SV: &str = include_str!("../locales/sv.json");

/// Resolves localization keys.
pub trait Localizer: Send + Sync {
    /// Display text for `key`, or `None` if it is not localized.
    fn resolve(&self, key: &str) -> Option<String>;

    /// Display text for `key`, or the key itself.
    fn translate(&self, key: &str) -> String {
        self.resolve(key).unwrap_or_else(|| key.to_string())
    }

    /// Display text for `key`, or a literal default.
    fn translate_or(&self, key: &str, default: &str) -> String {
        self.resolve(key).unwrap_or_else(|| default.to_string())
    }
}

/// Localizer over nested JSON bundles flattened to dotted keys, with a
/// fallback bundle for keys the selected language lacks.
#[derive(Debug, Clone, Default)]
pub struct BundleLocalizer {
    strings: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl BundleLocalizer {
    /// Build from JSON bundles.
    pub fn from_json(primary: &str, fallback: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            strings: flatten(&serde_json::from_str(primary)?),
            fallback: flatten(&serde_json::from_str(fallback)?),
        })
    }

    /// The bundled translations for `language` ("en", "fi", "sv"), English
    /// for anything else.
    pub fn bundled(language: &str) -> Self {
        let primary = match language {
            "fi" => FI,
            "sv" => SV,
            "en" => EN,
            other => {
                warn!(language = %other, "No bundled translations, using English");
                EN
            }
        };
        Self::from_json(primary, EN).unwrap_or_else(|e| {
            warn!(language = %language, "Failed to parse bundled translations: {}", e);
            Self::default()
        })
    }
}

impl Localizer for BundleLocalizer {
    fn resolve(&self, key: &str) -> Option<String> {
        self.strings
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
    }
}

fn flatten(value: &Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into(value, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, path, out);
            }
        }
        Value::String(s) if !s.is_empty() => {
            out.insert(prefix, s.clone());
        }
        _ => {}
    }
}
