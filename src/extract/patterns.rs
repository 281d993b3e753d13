//! Pattern-path numeric extraction. No oracle involved: fixed regex
//! categories over sentence-like units, in the style of a signature table.

use crate::models::{CandidateClaim, ClaimKind, SourceId};
use crate::numeric::{NumericValue, Unit};
use crate::scanner::split_sentences;
use once_cell::sync::Lazy;
use regex::Regex;

static PERCENTAGE_POINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*percentage\s+points?\b").expect("pp regex")
});

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:%|percent\b)").expect("percent regex"));

static CURRENCY_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([$€£¥])\s?(\d[\d,]*(?:\.\d+)?)\s*(million|billion|trillion|thousand)?")
        .expect("currency regex")
});

static CURRENCY_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d[\d,]*(?:\.\d+)?)\s*(million|billion|trillion|thousand)?\s*(dollars|euros|pounds|yen)\b",
    )
    .expect("currency word regex")
});

static RATIO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+(?:out\s+of|in)\s+(\d+)\b").expect("ratio regex"));

static RANK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ranked|ranks|ranking)\s*(?:#|no\.\s*)?(\d+)\b").expect("rank regex")
});

static ORDINAL_RANK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)[-\s](?:largest|biggest|most|highest|best|busiest)\b")
        .expect("ordinal regex")
});

static MULTIPLIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(doubled|tripled|quadrupled|halved)\b").expect("multiplier regex")
});

static COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d[\d,]*(?:\.\d+)?)\s*(million|billion|thousand)?\s+(users|customers|employees|people|subscribers|countries|companies|stores|devices|vehicles|units|respondents|patients|students|incidents)\b",
    )
    .expect("count regex")
});

static ATTRIBUTION_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\baccording to\b|\bsaid\b|\bstated\b|\breported\b|\bestimates?\b")
        .expect("attribution regex")
});

static EVENT_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bannounced\b|\blaunched\b|\bacquired\b|\bfounded\b|\breleased\b|\bsigned\b")
        .expect("event regex")
});

static COMPARISON_CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bthan\b|\bcompared (?:to|with)\b|\bversus\b|\bvs\.?\b").expect("cmp regex")
});

fn scale_multiplier(word: Option<&str>) -> f64 {
    match word.map(|w| w.to_lowercase()).as_deref() {
        Some("thousand") => 1e3,
        Some("million") => 1e6,
        Some("billion") => 1e9,
        Some("trillion") => 1e12,
        _ => 1.0,
    }
}

fn change_multiplier(word: &str) -> f64 {
    match word.to_lowercase().as_str() {
        "doubled" => 2.0,
        "tripled" => 3.0,
        "quadrupled" => 4.0,
        "halved" => 0.5,
        _ => 1.0,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn currency_symbol_for_word(word: &str) -> &'static str {
    match word.to_lowercase().as_str() {
        "euros" => "€",
        "pounds" => "£",
        "yen" => "¥",
        _ => "$",
    }
}

struct Claims<'a> {
    text: &'a str,
    taken: Vec<(usize, usize)>,
    out: Vec<NumericValue>,
}

impl<'a> Claims<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            taken: Vec::new(),
            out: Vec::new(),
        }
    }

    /// Record a value unless an earlier (higher-priority) category already
    /// consumed an overlapping span.
    fn push(&mut self, start: usize, end: usize, value: f64, unit: Unit) {
        if self.taken.iter().any(|&(s, e)| start < e && s < end) {
            return;
        }
        self.taken.push((start, end));
        self.out.push(NumericValue::new(value, unit, self.text.trim()));
    }
}

/// All quantitative assertions in one sentence-like unit, unit-aware.
pub fn extract_numbers(text: &str) -> Vec<NumericValue> {
    let mut claims = Claims::new(text);

    for caps in PERCENTAGE_POINT_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        if let Some(v) = parse_number(&caps[1]) {
            claims.push(m.start(), m.end(), v, Unit::PercentagePoint);
        }
    }
    for caps in PERCENT_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        if let Some(v) = parse_number(&caps[1]) {
            claims.push(m.start(), m.end(), v, Unit::Percent);
        }
    }
    for caps in CURRENCY_SYMBOL_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        if let Some(v) = parse_number(&caps[2]) {
            let value = v * scale_multiplier(caps.get(3).map(|s| s.as_str()));
            claims.push(
                m.start(),
                m.end(),
                value,
                Unit::Currency {
                    symbol: caps[1].to_string(),
                },
            );
        }
    }
    for caps in CURRENCY_WORD_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        if let Some(v) = parse_number(&caps[1]) {
            let value = v * scale_multiplier(caps.get(2).map(|s| s.as_str()));
            claims.push(
                m.start(),
                m.end(),
                value,
                Unit::Currency {
                    symbol: currency_symbol_for_word(&caps[3]).to_string(),
                },
            );
        }
    }
    for caps in RATIO_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        let (Some(n), Some(d)) = (parse_number(&caps[1]), parse_number(&caps[2])) else {
            continue;
        };
        if d != 0.0 {
            claims.push(m.start(), m.end(), n / d, Unit::Ratio);
        }
    }
    for re in [&*RANK_RE, &*ORDINAL_RANK_RE] {
        for caps in re.captures_iter(text) {
            let m = caps.get(0).expect("match");
            if let Some(v) = parse_number(&caps[1]) {
                claims.push(m.start(), m.end(), v, Unit::Rank);
            }
        }
    }
    for caps in MULTIPLIER_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        claims.push(m.start(), m.end(), change_multiplier(&caps[1]), Unit::Multiplier);
    }
    for caps in COUNT_RE.captures_iter(text) {
        let m = caps.get(0).expect("match");
        if let Some(v) = parse_number(&caps[1]) {
            let value = v * scale_multiplier(caps.get(2).map(|s| s.as_str()));
            claims.push(
                m.start(),
                m.end(),
                value,
                Unit::Count {
                    noun: caps[3].to_lowercase(),
                },
            );
        }
    }

    claims.out
}

pub fn classify_kind(sentence: &str, numbers: &[NumericValue]) -> ClaimKind {
    if ATTRIBUTION_CUE_RE.is_match(sentence) {
        ClaimKind::Attribution
    } else if EVENT_CUE_RE.is_match(sentence) {
        ClaimKind::Event
    } else if numbers.iter().any(|n| n.unit == Unit::Rank) || COMPARISON_CUE_RE.is_match(sentence)
    {
        ClaimKind::Comparison
    } else if !numbers.is_empty() {
        ClaimKind::Statistic
    } else {
        ClaimKind::Fact
    }
}

/// Scan source text for quantitative sentences; each hit becomes a candidate
/// whose text and excerpt are the containing sentence.
pub fn pattern_candidates(source_id: SourceId, source_text: &str) -> Vec<CandidateClaim> {
    let mut candidates = Vec::new();
    for line in source_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        for sentence in split_sentences(trimmed) {
            let numbers = extract_numbers(&sentence);
            if numbers.is_empty() {
                continue;
            }
            let kind = classify_kind(&sentence, &numbers);
            candidates.push(CandidateClaim {
                source_id,
                text: sentence.clone(),
                kind,
                numbers,
                excerpt: sentence,
            });
        }
    }
    candidates
}
