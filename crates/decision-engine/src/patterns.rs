use soulscout_core_types::PatternKind;
use std::collections::BTreeMap;

/// Confidence a category starts from when first reinforced.
pub const INITIAL_PATTERN_CONFIDENCE: f64 = 0.5;
/// Confidence added per successful reinforcement.
pub const PATTERN_STEP: f64 = 0.1;

/// A learned heuristic category with the examples that taught it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub examples: Vec<String>,
    pub confidence: f64,
}

impl Pattern {
    fn new(kind: PatternKind) -> Self {
        Self {
            kind,
            examples: Vec::new(),
            confidence: INITIAL_PATTERN_CONFIDENCE,
        }
    }

    /// True when any memorized example occurs in `haystack`.
    pub fn matches_example(&self, haystack: &str) -> bool {
        self.examples
            .iter()
            .any(|example| !example.is_empty() && haystack.contains(example.as_str()))
    }
}

/// Per-run map of learned patterns. Confidence only ever grows, capped per kind.
#[derive(Clone, Debug, Default)]
pub struct PatternStore {
    patterns: BTreeMap<PatternKind, Pattern>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: PatternKind) -> Option<&Pattern> {
        self.patterns.get(&kind)
    }

    pub fn confidence(&self, kind: PatternKind) -> f64 {
        self.get(kind).map(|p| p.confidence).unwrap_or(0.0)
    }

    pub fn kinds(&self) -> Vec<PatternKind> {
        self.patterns.keys().copied().collect()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Record a successful example and bump the category confidence.
    pub fn reinforce(&mut self, kind: PatternKind, example: &str) -> &Pattern {
        let pattern = self.patterns.entry(kind).or_insert_with(|| Pattern::new(kind));
        if !example.is_empty() && !pattern.examples.iter().any(|e| e == example) {
            pattern.examples.push(example.to_string());
        }
        pattern.confidence = (pattern.confidence + PATTERN_STEP).min(kind.ceiling());
        pattern
    }

    /// Install a previously learned pattern. Never lowers existing confidence.
    pub fn seed(&mut self, kind: PatternKind, confidence: f64, examples: Vec<String>) {
        let clamped = confidence.clamp(0.0, kind.ceiling());
        let pattern = self.patterns.entry(kind).or_insert_with(|| Pattern {
            kind,
            examples: Vec::new(),
            confidence: clamped,
        });
        pattern.confidence = pattern.confidence.max(clamped);
        for example in examples {
            if !example.is_empty() && !pattern.examples.contains(&example) {
                pattern.examples.push(example);
            }
        }
    }
}
