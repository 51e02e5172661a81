use std::collections::{BTreeMap, BTreeSet};

use brandcheck_features::tokenize;

use crate::Taxonomy;

/// Token-overlap index over the taxonomy descriptions.
///
/// Built once at startup. Used as the guaranteed fallback when the
/// AI-assisted classifier is unavailable.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    tokens: BTreeMap<u16, BTreeSet<String>>,
}

impl LexicalIndex {
    pub fn build(taxonomy: &Taxonomy) -> Self {
        let tokens = taxonomy
            .iter()
            .map(|entry| (entry.number, tokenize(&entry.description).into_iter().collect()))
            .collect();
        Self { tokens }
    }

    /// Classes sharing at least one token with `description`.
    ///
    /// Ordered by hit count descending, then class number ascending. An empty
    /// result means the description is unclassifiable.
    pub fn classify(&self, description: &str) -> Vec<u16> {
        let input: BTreeSet<String> = tokenize(description).into_iter().collect();
        if input.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(u16, usize)> = self
            .tokens
            .iter()
            .map(|(&class, tokens)| (class, tokens.intersection(&input).count()))
            .filter(|&(_, count)| count > 0)
            .collect();

        hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.into_iter().map(|(class, _)| class).collect()
    }

    /// Number of indexed classes.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NiceClassEntry;
    use pretty_assertions::assert_eq;

    fn small_taxonomy() -> Taxonomy {
        Taxonomy::from_entries(vec![
            NiceClassEntry {
                number: 25,
                title: "Clothing".into(),
                description: "clothing footwear scarpe shoes".into(),
            },
            NiceClassEntry {
                number: 18,
                title: "Leather goods".into(),
                description: "leather bags shoes".into(),
            },
            NiceClassEntry {
                number: 9,
                title: "Electronics".into(),
                description: "software computers".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_italian_footwear_maps_to_clothing() {
        let index = LexicalIndex::build(&Taxonomy::builtin().unwrap());
        let classes = index.classify("scarpe sportive");
        assert!(classes.contains(&25));
    }

    #[test]
    fn test_orders_by_hits_then_number() {
        let index = LexicalIndex::build(&small_taxonomy());
        // 25 matches "footwear" and "shoes", 18 only "shoes"
        assert_eq!(index.classify("footwear and shoes"), vec![25, 18]);
        // one hit each, ties broken by class number
        assert_eq!(index.classify("shoes"), vec![18, 25]);
    }

    #[test]
    fn test_unclassifiable_is_empty() {
        let index = LexicalIndex::build(&small_taxonomy());
        assert!(index.classify("").is_empty());
        assert!(index.classify("quantum teleportation").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let index = LexicalIndex::build(&small_taxonomy());
        assert_eq!(index.classify("SOFTWARE for Computers"), vec![9]);
    }
}
