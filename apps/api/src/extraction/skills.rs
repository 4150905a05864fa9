//! Skill Extractor — scans plain text against the skill lexicon plus a
//! supplementary pattern set, returning a deduplicated set of canonical
//! skill names.
//!
//! Lexicon hits use substring matching with no word-boundary requirement.
//! That trades false positives ("java" inside "javascript") for recall, and
//! downstream scoring depends on it — pinned by a test below, improve with
//! boundary checks only as a deliberate, documented change.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use regex::Regex;

use crate::extraction::lexicon::SkillLexicon;

/// Word-boundary patterns for common technology mentions, applied in
/// addition to the lexicon scan. Capture group 1 is the skill mention.
const SUPPLEMENTARY_PATTERNS: &[&str] = &[
    r"\b(python|java|javascript|react|angular|vue|node\.js)\b",
    r"\b(sql|mysql|postgresql|mongodb|redis)\b",
    r"\b(aws|azure|gcp|docker|kubernetes|jenkins)\b",
    r"\b(machine learning|ai|nlp|computer vision|deep learning)\b",
    r"\b(html|css|bootstrap|tailwind|sass|less)\b",
    r"\b(git|github|gitlab|bitbucket|svn)\b",
    r"\b(agile|scrum|kanban|waterfall)\b",
    r"\b(linux|unix|windows|macos)\b",
    r"\b(excel|power bi|tableau|looker)\b",
    r"\b(photoshop|illustrator|figma|sketch)\b",
];

#[derive(Clone)]
pub struct SkillExtractor {
    lexicon: Arc<SkillLexicon>,
    patterns: Vec<Regex>,
    /// lower-cased variant → canonical name, so pattern hits the lexicon
    /// already knows resolve to the same canonical spelling.
    variant_index: HashMap<String, String>,
}

impl SkillExtractor {
    pub fn new(lexicon: Arc<SkillLexicon>) -> Self {
        let patterns = SUPPLEMENTARY_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("valid supplementary skill pattern"))
            .collect();

        let mut variant_index = HashMap::new();
        for skill in lexicon.skills() {
            for variant in skill.variants() {
                variant_index
                    .entry(variant)
                    .or_insert_with(|| skill.canonical.clone());
            }
        }

        Self {
            lexicon,
            patterns,
            variant_index,
        }
    }

    pub fn lexicon(&self) -> &SkillLexicon {
        &self.lexicon
    }

    /// Returns the canonical skills mentioned in `text`.
    ///
    /// Idempotent and unordered; a single variant substring hit is enough to
    /// include a lexicon skill.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        let mut found = BTreeSet::new();

        for skill in self.lexicon.skills() {
            if skill
                .variants()
                .iter()
                .any(|variant| lowered.contains(variant.as_str()))
            {
                found.insert(skill.canonical.clone());
            }
        }

        for pattern in &self.patterns {
            for caps in pattern.captures_iter(&lowered) {
                if let Some(hit) = caps.get(1) {
                    found.insert(self.canonicalize(hit.as_str()));
                }
            }
        }

        found
    }

    /// Pattern hits resolve through the lexicon when it knows the mention;
    /// unknown mentions are title-cased before insertion.
    fn canonicalize(&self, hit: &str) -> String {
        self.variant_index
            .get(hit)
            .cloned()
            .unwrap_or_else(|| title_case(hit))
    }
}

/// Upper-cases every letter that follows a non-letter ("power bi" → "Power
/// Bi", "node.js" → "Node.Js").
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_boundary = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_boundary = false;
        } else {
            out.push(ch);
            at_boundary = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::lexicon::SkillLexicon;

    fn extractor(names: &[&str]) -> SkillExtractor {
        SkillExtractor::new(Arc::new(SkillLexicon::from_names(names)))
    }

    #[test]
    fn test_canonical_substring_inclusion() {
        let ex = extractor(&["Python", "Flask", "Git", "AWS"]);
        let skills = ex.extract("We need a python developer with flask, git, and aws skills.");
        for expected in ["Python", "Flask", "Git", "AWS"] {
            assert!(skills.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn test_multi_word_variant_forms_match() {
        let ex = extractor(&["Machine Learning"]);
        for text in [
            "strong machine learning background",
            "machine-learning pipelines",
            "machine_learning models",
            "MachineLearning at scale",
        ] {
            assert!(
                ex.extract(text).contains("Machine Learning"),
                "no hit in {text:?}"
            );
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let ex = SkillExtractor::new(Arc::new(SkillLexicon::builtin()));
        let text = "Python developer with Docker, Kubernetes and AWS experience";
        assert_eq!(ex.extract(text), ex.extract(text));
    }

    // Documents the deliberate substring trade-off: "java" hits inside
    // "javascript". Candidate improvement, not a bug.
    #[test]
    fn test_lexicon_hits_inside_longer_words() {
        let ex = extractor(&["Java", "JavaScript"]);
        let skills = ex.extract("Five years of javascript");
        assert!(skills.contains("Java"));
        assert!(skills.contains("JavaScript"));
    }

    #[test]
    fn test_pattern_hits_resolve_to_canonical_spelling() {
        // "aws" comes from the supplementary cloud pattern; the lexicon knows
        // the canonical casing, so the set does not grow an "Aws" twin.
        let ex = extractor(&["AWS"]);
        let skills = ex.extract("deployed on aws");
        assert_eq!(skills.into_iter().collect::<Vec<_>>(), vec!["AWS"]);
    }

    #[test]
    fn test_unknown_pattern_hits_are_title_cased() {
        let ex = extractor(&["Python"]);
        let skills = ex.extract("dashboards in power bi and tableau");
        assert!(skills.contains("Power Bi"));
        assert!(skills.contains("Tableau"));
    }

    #[test]
    fn test_empty_text_yields_empty_set() {
        let ex = SkillExtractor::new(Arc::new(SkillLexicon::builtin()));
        assert!(ex.extract("").is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("power bi"), "Power Bi");
        assert_eq!(title_case("node.js"), "Node.Js");
        assert_eq!(title_case("sql"), "Sql");
    }
}
