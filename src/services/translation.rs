use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{TaggerError, TaggerResult};
use crate::models::job::RankedTag;

/// What to do with inference labels missing from the translation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedLabels {
    #[default]
    PassThrough,
    Drop,
}

/// Maps inference-vocabulary labels to the display labels that get stored.
#[derive(Debug, Clone, Default)]
pub struct LabelTranslator {
    map: HashMap<String, String>,
    unmapped: UnmappedLabels,
}

impl LabelTranslator {
    /// Translator that leaves every label unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(map: HashMap<String, String>, unmapped: UnmappedLabels) -> Self {
        Self { map, unmapped }
    }

    /// Load a JSON object of `{"inference label": "display label"}`.
    pub fn from_json_file(path: &Path, unmapped: UnmappedLabels) -> TaggerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TaggerError::Configuration(format!("translation table {}: {e}", path.display()))
        })?;
        let map: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            TaggerError::Configuration(format!("translation table {}: {e}", path.display()))
        })?;
        Ok(Self::new(map, unmapped))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn translate_label(&self, label: &str) -> Option<String> {
        match self.map.get(label) {
            Some(display) => Some(display.clone()),
            None => match self.unmapped {
                UnmappedLabels::PassThrough => Some(label.to_string()),
                UnmappedLabels::Drop => None,
            },
        }
    }

    pub fn translate(&self, labels: &[String]) -> Vec<String> {
        labels
            .iter()
            .filter_map(|l| self.translate_label(l))
            .collect()
    }

    /// Translate ranked labels, keeping each confidence with its label.
    pub fn translate_ranked(&self, ranked: Vec<RankedTag>) -> Vec<RankedTag> {
        ranked
            .into_iter()
            .filter_map(|t| {
                self.translate_label(&t.label).map(|label| RankedTag {
                    label,
                    confidence: t.confidence,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HashMap<String, String> {
        HashMap::from([
            ("cat".to_string(), "кошка".to_string()),
            ("dog".to_string(), "собака".to_string()),
        ])
    }

    #[test]
    fn test_identity_passes_through() {
        let t = LabelTranslator::identity();
        assert_eq!(t.translate(&["sunset".to_string()]), vec!["sunset".to_string()]);
    }

    #[test]
    fn test_unmapped_pass_through() {
        let t = LabelTranslator::new(table(), UnmappedLabels::PassThrough);
        let out = t.translate(&["cat".to_string(), "sunset".to_string()]);
        assert_eq!(out, vec!["кошка".to_string(), "sunset".to_string()]);
    }

    #[test]
    fn test_unmapped_dropped() {
        let t = LabelTranslator::new(table(), UnmappedLabels::Drop);
        let ranked = vec![
            RankedTag {
                label: "sunset".into(),
                confidence: 0.6,
            },
            RankedTag {
                label: "dog".into(),
                confidence: 0.3,
            },
        ];
        let out = t.translate_ranked(ranked);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "собака");
        assert_eq!(out[0].confidence, 0.3);
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, r#"{"beach": "пляж"}"#).unwrap();

        let t = LabelTranslator::from_json_file(&path, UnmappedLabels::Drop).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.translate_label("beach").as_deref(), Some("пляж"));
    }

    #[test]
    fn test_bad_json_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = LabelTranslator::from_json_file(&path, UnmappedLabels::Drop).unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
    }
}
