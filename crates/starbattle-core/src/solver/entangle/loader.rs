//! Entanglement spec loading.
//!
//! Pattern files ship as JSON. A file is classified by peeking at its keys:
//! a `patterns` array makes a pair file, `pure_entanglement_templates` a
//! pure file, and the `unconstrained_rules`/`constrained_rules` pair a
//! triple (or constrained) rule file. Files whose id ends in `-solutions`
//! are raw enumeration dumps and are skipped. Constraint feature names are
//! opaque capabilities; unknown names fail at load time, never at match
//! time.

use serde::Deserialize;
use thiserror::Error;

use crate::board::BoardState;

/// Errors from spec loading and classification.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("spec {id}: malformed JSON: {source}")]
    Json {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("spec {id}: unknown file schema")]
    UnknownSchema { id: String },
    #[error("spec {id}: rule is missing its candidate cell")]
    MissingCandidate { id: String },
    #[error("spec {id}: unsupported constraint feature {feature:?}")]
    UnknownFeature { id: String, feature: String },
}

/// Host-provided evaluator for constrained-rule features. The core treats
/// feature names as capabilities and never interprets them itself.
pub trait FeatureEvaluator {
    /// Whether this evaluator can evaluate the named feature.
    fn supports(&self, name: &str) -> bool;

    /// Evaluate the feature at a mapped candidate.
    fn evaluate(&self, name: &str, ctx: &FeatureContext) -> bool;
}

/// Evaluation context handed to feature implementations.
pub struct FeatureContext<'a> {
    pub board: &'a BoardState,
    pub candidate: (usize, usize),
    pub mapped_stars: &'a [(usize, usize)],
}

/// Evaluator that supports no features; constrained rules fail to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeatureEvaluator;

impl FeatureEvaluator for NullFeatureEvaluator {
    fn supports(&self, _name: &str) -> bool {
        false
    }

    fn evaluate(&self, _name: &str, _ctx: &FeatureContext) -> bool {
        false
    }
}

/// A pair/composite pattern: a full star configuration with its forced
/// cells.
#[derive(Debug, Clone)]
pub struct PairPattern {
    pub fingerprint: String,
    pub initial_stars: Vec<(i32, i32)>,
    pub compatible_solutions: u64,
    pub forced_empty: Vec<(i32, i32)>,
    pub forced_star: Vec<(i32, i32)>,
}

/// A triple/constrained rule: a canonical star triple plus one candidate
/// that is forced Empty when the rule fires.
#[derive(Debug, Clone)]
pub struct TripleRule {
    pub fingerprint: String,
    pub canonical_stars: Vec<(i32, i32)>,
    pub candidate: (i32, i32),
    pub constraint_features: Vec<String>,
    pub occurrences: u64,
}

/// Metadata derived at load time, used to filter specs per board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMeta {
    pub board_size: usize,
    pub stars_per_line: Option<usize>,
    pub initial_star_count: usize,
    pub has_pair: bool,
    pub has_triple: bool,
    pub has_constrained: bool,
}

/// A loaded pattern file.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub id: String,
    pub meta: SpecMeta,
    pub pair_patterns: Vec<PairPattern>,
    pub triple_rules: Vec<TripleRule>,
}

// ==================== Raw file shapes ====================

#[derive(Debug, Deserialize)]
struct PairFileRaw {
    board_size: usize,
    stars_per_row: Option<usize>,
    #[allow(dead_code)]
    stars_per_column: Option<usize>,
    initial_star_count: Option<usize>,
    #[allow(dead_code)]
    total_solutions: Option<u64>,
    #[serde(alias = "pure_entanglement_templates")]
    patterns: Vec<PairPatternRaw>,
}

#[derive(Debug, Deserialize)]
struct PairPatternRaw {
    initial_stars: Vec<[i32; 2]>,
    compatible_solutions: Option<u64>,
    #[serde(default)]
    forced_empty: Vec<[i32; 2]>,
    #[serde(default)]
    forced_star: Vec<[i32; 2]>,
}

#[derive(Debug, Deserialize)]
struct TripleFileRaw {
    board_size: usize,
    initial_stars: Option<usize>,
    unconstrained_rules: Vec<RuleRaw>,
    constrained_rules: Vec<RuleRaw>,
}

#[derive(Debug, Deserialize)]
struct RuleRaw {
    canonical_stars: Vec<[i32; 2]>,
    canonical_candidate: Option<[i32; 2]>,
    canonical_forced_empty: Option<[i32; 2]>,
    #[serde(default)]
    constraint_features: Vec<String>,
    #[allow(dead_code)]
    forced: Option<bool>,
    occurrences: Option<u64>,
}

// ==================== Library ====================

/// The set of loaded specs, filterable per board.
#[derive(Debug, Default)]
pub struct SpecLibrary {
    specs: Vec<LoadedSpec>,
}

impl SpecLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one spec file. Returns `Ok(false)` when the file is skipped
    /// (enumeration dumps with the `-solutions` id suffix).
    pub fn load(
        &mut self,
        id: &str,
        json: &str,
        evaluator: &dyn FeatureEvaluator,
    ) -> Result<bool, SpecError> {
        if id.ends_with("-solutions") {
            log::debug!("skipping solutions dump {id}");
            return Ok(false);
        }
        let spec = parse_spec(id, json, evaluator)?;
        self.specs.push(spec);
        Ok(true)
    }

    pub fn specs(&self) -> &[LoadedSpec] {
        &self.specs
    }

    /// Specs applicable to a board with `star_count` placed stars.
    pub fn for_board(
        &self,
        board_size: usize,
        stars_per_line: usize,
        star_count: usize,
    ) -> Vec<&LoadedSpec> {
        self.specs
            .iter()
            .filter(|s| {
                s.meta.board_size == board_size
                    && s.meta.stars_per_line.map_or(true, |k| k == stars_per_line)
                    && (s.meta.has_triple || s.meta.initial_star_count == star_count)
            })
            .collect()
    }
}

fn parse_spec(
    id: &str,
    json: &str,
    evaluator: &dyn FeatureEvaluator,
) -> Result<LoadedSpec, SpecError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|source| SpecError::Json {
            id: id.to_string(),
            source,
        })?;
    let obj = value.as_object().ok_or_else(|| SpecError::UnknownSchema {
        id: id.to_string(),
    })?;

    if obj.contains_key("patterns") || obj.contains_key("pure_entanglement_templates") {
        let raw: PairFileRaw =
            serde_json::from_value(value.clone()).map_err(|source| SpecError::Json {
                id: id.to_string(),
                source,
            })?;
        return Ok(load_pair_file(id, raw));
    }
    if obj.contains_key("unconstrained_rules") && obj.contains_key("constrained_rules") {
        let raw: TripleFileRaw =
            serde_json::from_value(value.clone()).map_err(|source| SpecError::Json {
                id: id.to_string(),
                source,
            })?;
        return load_triple_file(id, raw, evaluator);
    }
    Err(SpecError::UnknownSchema { id: id.to_string() })
}

fn load_pair_file(id: &str, raw: PairFileRaw) -> LoadedSpec {
    let patterns: Vec<PairPattern> = raw
        .patterns
        .into_iter()
        .map(|p| {
            let initial_stars = coords(&p.initial_stars);
            let forced_empty = coords(&p.forced_empty);
            let forced_star = coords(&p.forced_star);
            PairPattern {
                fingerprint: fingerprint(&initial_stars, &forced_empty, &forced_star, &[]),
                initial_stars,
                compatible_solutions: p.compatible_solutions.unwrap_or(0),
                forced_empty,
                forced_star,
            }
        })
        .collect();
    let initial_star_count = raw
        .initial_star_count
        .or_else(|| patterns.first().map(|p| p.initial_stars.len()))
        .unwrap_or(0);
    LoadedSpec {
        id: id.to_string(),
        meta: SpecMeta {
            board_size: raw.board_size,
            stars_per_line: raw.stars_per_row,
            initial_star_count,
            has_pair: true,
            has_triple: false,
            has_constrained: false,
        },
        pair_patterns: patterns,
        triple_rules: Vec::new(),
    }
}

fn load_triple_file(
    id: &str,
    raw: TripleFileRaw,
    evaluator: &dyn FeatureEvaluator,
) -> Result<LoadedSpec, SpecError> {
    let mut rules = Vec::new();
    let mut has_constrained = false;
    for rule in raw
        .unconstrained_rules
        .into_iter()
        .chain(raw.constrained_rules)
    {
        let candidate = rule
            .canonical_candidate
            .or(rule.canonical_forced_empty)
            .ok_or_else(|| SpecError::MissingCandidate { id: id.to_string() })?;
        for feature in &rule.constraint_features {
            if !evaluator.supports(feature) {
                return Err(SpecError::UnknownFeature {
                    id: id.to_string(),
                    feature: feature.clone(),
                });
            }
        }
        if !rule.constraint_features.is_empty() {
            has_constrained = true;
        }
        let canonical_stars = coords(&rule.canonical_stars);
        let candidate = (candidate[0], candidate[1]);
        rules.push(TripleRule {
            fingerprint: fingerprint(
                &canonical_stars,
                &[candidate],
                &[],
                &rule.constraint_features,
            ),
            canonical_stars,
            candidate,
            constraint_features: rule.constraint_features,
            occurrences: rule.occurrences.unwrap_or(0),
        });
    }
    let initial_star_count = raw
        .initial_stars
        .or_else(|| rules.first().map(|r| r.canonical_stars.len()))
        .unwrap_or(0);
    Ok(LoadedSpec {
        id: id.to_string(),
        meta: SpecMeta {
            board_size: raw.board_size,
            stars_per_line: None,
            initial_star_count,
            has_pair: false,
            has_triple: true,
            has_constrained,
        },
        pair_patterns: Vec::new(),
        triple_rules: rules,
    })
}

fn coords(raw: &[[i32; 2]]) -> Vec<(i32, i32)> {
    raw.iter().map(|p| (p[0], p[1])).collect()
}

/// Deterministic 6-hex fingerprint: sorted coordinate and feature tokens
/// hashed with a commutative 32-bit sum, so serialization order never
/// changes the identity.
fn fingerprint(
    stars: &[(i32, i32)],
    primary: &[(i32, i32)],
    secondary: &[(i32, i32)],
    features: &[String],
) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut sorted_stars = stars.to_vec();
    sorted_stars.sort_unstable();
    tokens.extend(sorted_stars.iter().map(|(r, c)| format!("s:{r},{c}")));
    let mut sorted_primary = primary.to_vec();
    sorted_primary.sort_unstable();
    tokens.extend(sorted_primary.iter().map(|(r, c)| format!("p:{r},{c}")));
    let mut sorted_secondary = secondary.to_vec();
    sorted_secondary.sort_unstable();
    tokens.extend(sorted_secondary.iter().map(|(r, c)| format!("q:{r},{c}")));
    let mut sorted_features = features.to_vec();
    sorted_features.sort_unstable();
    tokens.extend(sorted_features.iter().map(|f| format!("f:{f}")));

    let mut hash: u32 = 0;
    for token in &tokens {
        hash = hash.wrapping_add(fnv32(token));
    }
    format!("{:06x}", hash & 0x00ff_ffff)
}

fn fnv32(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in s.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
