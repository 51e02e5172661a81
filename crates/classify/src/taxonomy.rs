use std::collections::BTreeMap;

use brandcheck_model::{is_valid_class, ClassInfo, ClassificationResult};
use serde::{Deserialize, Serialize};

use crate::ClassifyError;

const BUILTIN_TAXONOMY: &str = include_str!("../data/nice_classes.json");

/// One class of the Nice taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiceClassEntry {
    pub number: u16,
    pub title: String,
    pub description: String,
}

/// The Nice classification document, keyed by class number.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: BTreeMap<u16, NiceClassEntry>,
}

impl Taxonomy {
    /// Load the taxonomy bundled with the crate.
    pub fn builtin() -> Result<Self, ClassifyError> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    /// Parse a taxonomy document: a JSON array of `{number, title, description}`.
    pub fn from_json(document: &str) -> Result<Self, ClassifyError> {
        let parsed: Vec<NiceClassEntry> =
            serde_json::from_str(document).map_err(|e| ClassifyError::Taxonomy(e.to_string()))?;
        Self::from_entries(parsed)
    }

    pub fn from_entries(parsed: Vec<NiceClassEntry>) -> Result<Self, ClassifyError> {
        let mut entries = BTreeMap::new();
        for entry in parsed {
            if !is_valid_class(entry.number) {
                return Err(ClassifyError::Taxonomy(format!(
                    "class {} is outside 1-45",
                    entry.number
                )));
            }
            let number = entry.number;
            if entries.insert(number, entry).is_some() {
                return Err(ClassifyError::Taxonomy(format!("class {} is duplicated", number)));
            }
        }
        if entries.is_empty() {
            return Err(ClassifyError::Taxonomy("no classes defined".to_string()));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, number: u16) -> Option<&NiceClassEntry> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NiceClassEntry> {
        self.entries.values()
    }

    /// Title and description for a class, with a generic fallback for unknown numbers.
    pub fn class_info(&self, number: u16) -> ClassInfo {
        match self.get(number) {
            Some(entry) => ClassInfo {
                number,
                title: entry.title.clone(),
                description: entry.description.clone(),
            },
            None => ClassInfo {
                number,
                title: format!("Class {}", number),
                description: "Miscellaneous goods and services".to_string(),
            },
        }
    }

    /// Annotate class numbers with their taxonomy text, keeping their order.
    pub fn annotate(&self, numbers: &[u16]) -> ClassificationResult {
        ClassificationResult {
            classes: numbers.iter().map(|&n| self.class_info(n)).collect(),
        }
    }

    /// Render the taxonomy as one `Class N: title; description` line per class.
    pub fn knowledge_base(&self) -> String {
        self.iter()
            .map(|e| format!("Class {}: {}; {}", e.number, e.title, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_has_all_classes() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(taxonomy.len(), 45);
        assert!((1..=45).all(|n| taxonomy.get(n).is_some()));
        assert_eq!(taxonomy.get(25).unwrap().title, "Clothing");
    }

    #[test]
    fn test_rejects_out_of_range_and_duplicates() {
        let out_of_range = r#"[{"number": 46, "title": "x", "description": "y"}]"#;
        assert!(matches!(
            Taxonomy::from_json(out_of_range),
            Err(ClassifyError::Taxonomy(_))
        ));

        let duplicated = r#"[{"number": 3, "title": "a", "description": "b"},
                             {"number": 3, "title": "c", "description": "d"}]"#;
        assert!(Taxonomy::from_json(duplicated).is_err());
        assert!(Taxonomy::from_json("[]").is_err());
    }

    #[test]
    fn test_class_info_fallback() {
        let taxonomy =
            Taxonomy::from_json(r#"[{"number": 25, "title": "Clothing", "description": "footwear"}]"#)
                .unwrap();
        let known = taxonomy.class_info(25);
        assert_eq!(known.title, "Clothing");

        let unknown = taxonomy.class_info(9);
        assert_eq!(unknown.title, "Class 9");
    }

    #[test]
    fn test_annotate_keeps_order() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let result = taxonomy.annotate(&[35, 25]);
        assert_eq!(result.numbers(), vec![35, 25]);
    }

    #[test]
    fn test_knowledge_base_lines() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let kb = taxonomy.knowledge_base();
        assert_eq!(kb.lines().count(), 45);
        assert!(kb.lines().any(|l| l.starts_with("Class 25: Clothing;")));
    }
}
