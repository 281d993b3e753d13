//! Resolves document statements to registry claims through a ranked set of
//! strategies with different confidence semantics.

use crate::config::VerifyConfig;
use crate::models::claim::normalize_claim_text;
use crate::models::{
    Claim, DocumentStatement, MatchResult, MatchStrategy, Verdict,
};
use crate::numeric::values_agree;
use crate::registry::ClaimRegistry;
use once_cell::sync::Lazy;
use std::collections::HashSet;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "was", "were", "has", "had", "have", "this", "that", "with",
        "from", "its", "their", "which", "been", "will", "would", "could", "should", "than",
        "then", "into", "over", "under", "about", "after", "before", "between", "during", "while",
        "also", "more", "most", "some", "such", "not", "but", "all", "any", "per", "when", "where",
        "who", "whom", "whose", "what", "how", "why", "out", "off", "they", "them", "there",
        "here", "said",
    ]
    .into_iter()
    .collect()
});

/// Lowercased content words: alphanumeric runs of length ≥ 3 that are not
/// stop-words.
pub fn content_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

pub struct MatchOutcome {
    pub result: MatchResult,
    /// Best-scoring candidate that fell below the acceptance threshold;
    /// offered to the oracle for adjudication.
    pub runner_up: Option<Claim>,
}

pub struct Matcher<'a> {
    registry: &'a ClaimRegistry,
    config: &'a VerifyConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(registry: &'a ClaimRegistry, config: &'a VerifyConfig) -> Self {
        Self { registry, config }
    }

    pub fn match_statement(&self, statement: &DocumentStatement) -> MatchOutcome {
        // Direct claim references short-circuit everything else.
        for claim_id in statement.cited_claims() {
            if let Some(claim) = self.registry.find_by_id(claim_id) {
                return MatchOutcome {
                    result: self.result(statement, Verdict::Verified, Some(&claim),
                        MatchStrategy::DirectReference, 1.0, "statement cites the claim directly"),
                    runner_up: None,
                };
            }
        }

        let cited = statement.cited_sources();
        let candidates = self.registry.all_claims();

        if candidates.is_empty() {
            return MatchOutcome {
                result: self.result(statement, Verdict::Unverified, None, MatchStrategy::None,
                    0.0, "registry holds no claims"),
                runner_up: None,
            };
        }

        let normalized = normalize_claim_text(&statement.text);
        let statement_words = content_words(&statement.text);

        let mut best_text: Option<(f32, &Claim)> = None;
        let mut best_numeric: Option<(f32, &Claim)> = None;
        let mut best_keyword: Option<(f32, &Claim)> = None;

        for claim in &candidates {
            // Only text matching restricts to cited sources; the other
            // strategies scan the full registry so a winner from an uncited
            // source can surface and be downgraded below.
            if cited.is_empty() || cited.contains(&claim.source_id) {
                if let Some(score) = text_score(&normalized, &claim.normalized_text) {
                    update_best(&mut best_text, score, claim);
                }
            }
            if let Some(score) = self.numeric_score(statement, claim) {
                update_best(&mut best_numeric, score, claim);
            }
            let mut keyword = jaccard(&statement_words, &content_words(&claim.normalized_text));
            if cited.contains(&claim.source_id) {
                // Citation-consistent candidates outrank better text from
                // uncited sources.
                keyword = clamp(keyword * self.config.cited_source_boost, 0.0, 1.0);
            }
            update_best(&mut best_keyword, keyword, claim);
        }

        let threshold = self.config.accept_threshold;
        let accepted = [
            (best_text, MatchStrategy::TextMatch, "normalized text match"),
            (best_numeric, MatchStrategy::NumericMatch, "numeric agreement"),
            (best_keyword, MatchStrategy::KeywordOverlap, "keyword overlap"),
        ]
        .into_iter()
        .find_map(|(best, strategy, reason)| match best {
            Some((score, claim)) if score >= threshold => Some((score, claim, strategy, reason)),
            _ => None,
        });

        match accepted {
            Some((score, claim, strategy, reason)) => {
                // Citation correctness is confirmed, never inferred.
                let verdict = if cited.contains(&claim.source_id) {
                    Verdict::Verified
                } else {
                    Verdict::Mismatch
                };
                MatchOutcome {
                    result: self.result(statement, verdict, Some(claim), strategy, score, reason),
                    runner_up: None,
                }
            }
            None => {
                let runner_up = [best_text, best_numeric, best_keyword]
                    .into_iter()
                    .flatten()
                    .max_by(|a, b| a.0.total_cmp(&b.0))
                    .map(|(_, claim)| claim.clone());
                MatchOutcome {
                    result: self.result(statement, Verdict::Unverified, None, MatchStrategy::None,
                        0.0, "no candidate met the acceptance threshold"),
                    runner_up,
                }
            }
        }
    }

    /// Fraction of statement numbers with a unit-compatible counterpart in
    /// the claim within the configured relative tolerance.
    fn numeric_score(&self, statement: &DocumentStatement, claim: &Claim) -> Option<f32> {
        if statement.numbers.is_empty() || claim.numbers.is_empty() {
            return None;
        }
        let matched = statement
            .numbers
            .iter()
            .filter(|n| {
                claim
                    .numbers
                    .iter()
                    .any(|c| values_agree(n, c, self.config.match_numeric_relative))
            })
            .count();
        Some(matched as f32 / statement.numbers.len() as f32)
    }

    fn result(
        &self,
        statement: &DocumentStatement,
        verdict: Verdict,
        claim: Option<&Claim>,
        strategy: MatchStrategy,
        confidence: f32,
        reason: &str,
    ) -> MatchResult {
        MatchResult {
            statement_line: statement.line,
            statement_text: statement.text.clone(),
            claim_id: claim.map(|c| c.id),
            strategy,
            confidence: clamp(confidence, 0.0, 1.0),
            verdict,
            reason: reason.to_string(),
        }
    }
}

fn text_score(a: &str, b: &str) -> Option<f32> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b || a.contains(b) || b.contains(a) {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        Some(short.len() as f32 / long.len() as f32)
    } else {
        None
    }
}

fn update_best<'c>(best: &mut Option<(f32, &'c Claim)>, score: f32, claim: &'c Claim) {
    match best {
        Some((current, _)) if *current >= score => {}
        _ => *best = Some((score, claim)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{fixtures, FsEvidenceStore};
    use crate::models::{CandidateClaim, Citation, ClaimKind, SourceId};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ClaimRegistry) {
        let dir = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        fixtures::write_capture(
            dir.path(),
            SourceId(1),
            "https://one.example/report",
            at,
            b"raw-1",
            "Quarterly revenue grew 12% in fiscal 2025.",
        );
        fixtures::write_capture(
            dir.path(),
            SourceId(2),
            "https://two.example/filing",
            at,
            b"raw-2",
            "Quarterly revenue grew 12% in fiscal 2025.",
        );
        let store = Arc::new(FsEvidenceStore::new(dir.path()));
        let registry = ClaimRegistry::open(dir.path().join("registry.wal"), store).unwrap();
        (dir, registry)
    }

    fn add(registry: &ClaimRegistry, source: SourceId, text: &str) -> Claim {
        registry
            .add_claim(CandidateClaim {
                source_id: source,
                text: text.into(),
                kind: ClaimKind::Statistic,
                numbers: crate::extract::extract_numbers(text),
                excerpt: "Quarterly revenue grew 12% in fiscal 2025".into(),
            })
            .unwrap()
            .claim()
            .clone()
    }

    fn statement(text: &str, citations: Vec<Citation>) -> DocumentStatement {
        DocumentStatement {
            text: text.into(),
            line: 1,
            citations,
            numbers: crate::extract::extract_numbers(text),
        }
    }

    #[test]
    fn direct_reference_wins_at_full_confidence() {
        let (_dir, registry) = setup();
        let claim = add(&registry, SourceId(1), "Quarterly revenue grew 12% in fiscal 2025");
        let config = VerifyConfig::default();
        let matcher = Matcher::new(&registry, &config);

        let outcome = matcher.match_statement(&statement(
            "Revenue was up.",
            vec![Citation::Claim { id: claim.id }],
        ));
        assert_eq!(outcome.result.verdict, Verdict::Verified);
        assert_eq!(outcome.result.strategy, MatchStrategy::DirectReference);
        assert_eq!(outcome.result.confidence, 1.0);
    }

    #[test]
    fn text_containment_verifies_cited_source() {
        let (_dir, registry) = setup();
        add(&registry, SourceId(1), "Quarterly revenue grew 12% in fiscal 2025");
        let config = VerifyConfig::default();
        let matcher = Matcher::new(&registry, &config);

        let outcome = matcher.match_statement(&statement(
            "Quarterly revenue grew 12% in fiscal 2025",
            vec![Citation::Source { id: SourceId(1), url: None }],
        ));
        assert_eq!(outcome.result.verdict, Verdict::Verified);
        assert_eq!(outcome.result.strategy, MatchStrategy::TextMatch);
        assert!(outcome.result.confidence > 0.99);
    }

    #[test]
    fn exact_numbers_match_despite_different_wording() {
        let (_dir, registry) = setup();
        add(&registry, SourceId(1), "Quarterly revenue grew 12% in fiscal 2025");
        let config = VerifyConfig::default();
        let matcher = Matcher::new(&registry, &config);

        let outcome = matcher.match_statement(&statement(
            "Sales expanded by 12% during the year",
            vec![Citation::Source { id: SourceId(1), url: None }],
        ));
        assert_eq!(outcome.result.verdict, Verdict::Verified);
        assert_eq!(outcome.result.strategy, MatchStrategy::NumericMatch);
    }

    #[test]
    fn wrong_source_match_is_mismatch_never_verified() {
        let (_dir, registry) = setup();
        add(&registry, SourceId(2), "Quarterly revenue grew 12% in fiscal 2025");
        let config = VerifyConfig::default();
        let matcher = Matcher::new(&registry, &config);

        // Statement cites S001 but the only matching claim belongs to S002:
        // the claim still surfaces through keyword overlap and is downgraded.
        let outcome = matcher.match_statement(&DocumentStatement {
            text: "Quarterly revenue grew 12% in fiscal 2025".into(),
            line: 3,
            citations: vec![Citation::Source { id: SourceId(1), url: None }],
            numbers: Vec::new(),
        });
        assert_eq!(outcome.result.verdict, Verdict::Mismatch);
        assert!(outcome.result.claim_id.is_some());

        // Same downgrade when the statement cites nothing resolvable at all.
        let open = matcher.match_statement(&DocumentStatement {
            text: "Quarterly revenue grew 12% in fiscal 2025".into(),
            line: 3,
            citations: vec![Citation::Claim { id: crate::models::ClaimId(999) }],
            numbers: Vec::new(),
        });
        assert_eq!(open.result.verdict, Verdict::Mismatch);
    }

    #[test]
    fn below_threshold_is_unverified_with_runner_up() {
        let (_dir, registry) = setup();
        add(&registry, SourceId(1), "Quarterly revenue grew 12% in fiscal 2025");
        let config = VerifyConfig::default();
        let matcher = Matcher::new(&registry, &config);

        let outcome = matcher.match_statement(&statement(
            "The board announced an unrelated governance change",
            vec![Citation::Source { id: SourceId(1), url: None }],
        ));
        assert_eq!(outcome.result.verdict, Verdict::Unverified);
        assert!(outcome.result.claim_id.is_none());
        assert!(outcome.runner_up.is_some());
    }

    #[test]
    fn keyword_overlap_accepts_close_paraphrase() {
        let (_dir, registry) = setup();
        add(&registry, SourceId(1), "Quarterly revenue grew 12% in fiscal 2025");
        let mut config = VerifyConfig::default();
        config.accept_threshold = 0.4;
        let matcher = Matcher::new(&registry, &config);

        let outcome = matcher.match_statement(&statement(
            "Fiscal 2025 quarterly revenue grew",
            vec![Citation::Source { id: SourceId(1), url: None }],
        ));
        assert_eq!(outcome.result.verdict, Verdict::Verified);
    }

    #[test]
    fn content_words_drop_stopwords_and_short_tokens() {
        let words = content_words("The revenue of it grew and grew in 2025");
        assert!(words.contains("revenue"));
        assert!(words.contains("grew"));
        assert!(words.contains("2025"));
        assert!(!words.contains("the"));
        assert!(!words.contains("of"));
        assert!(!words.contains("it"));
    }
}
