//! Extracts citation-bearing statements from a finished document.

use crate::extract::patterns::extract_numbers;
use crate::models::{Citation, DocumentStatement};
use once_cell::sync::Lazy;
use regex::Regex;

static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([SC]\d+)\](?:\(([^)\s]+)\))?").expect("citation regex"));

static RULE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-{3,}|={3,}|\*{3,}|_{3,})\s*$").expect("rule regex"));

static SOURCES_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#+\s*(?:sources|references|bibliography)\b").expect("sources regex")
});

/// Split one line into sentence-like units at sentence-ending punctuation
/// followed by whitespace and a capital letter.
pub fn split_sentences(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut units = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            let mut j = i + 1;
            let mut saw_ws = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_ws = true;
                j += 1;
            }
            if saw_ws && j < chars.len() && chars[j].is_uppercase() {
                let unit: String = chars[start..=i].iter().collect();
                let unit = unit.trim().to_string();
                if !unit.is_empty() {
                    units.push(unit);
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim().to_string();
    if !tail.is_empty() {
        units.push(tail);
    }
    units
}

/// Scan the document, keeping only units that carry at least one citation
/// marker and are not bare source-list entries.
pub fn scan(document: &str) -> Vec<DocumentStatement> {
    scan_units(document)
        .into_iter()
        .filter(|s| s.has_citations())
        .collect()
}

/// Every sentence-like unit of prose, cited or not; the numeric stage needs
/// uncited quantitative sentences too.
pub fn scan_units(document: &str) -> Vec<DocumentStatement> {
    let mut statements = Vec::new();
    let mut in_sources_section = false;

    for (idx, line) in document.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            in_sources_section = SOURCES_HEADING_RE.is_match(trimmed);
            continue;
        }
        if trimmed.starts_with('|') || trimmed.starts_with('>') || RULE_LINE_RE.is_match(trimmed) {
            continue;
        }

        for unit in split_sentences(trimmed) {
            let citations = parse_citations(&unit);
            let text = strip_citations(&unit);
            if text.is_empty() {
                continue;
            }
            if looks_like_source_entry(&text, in_sources_section) {
                continue;
            }
            let numbers = extract_numbers(&text);
            statements.push(DocumentStatement {
                text,
                line: idx + 1,
                citations,
                numbers,
            });
        }
    }
    statements
}

fn parse_citations(unit: &str) -> Vec<Citation> {
    CITATION_RE
        .captures_iter(unit)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str();
            let url = caps.get(2).map(|m| m.as_str().to_string());
            if let Ok(source_id) = id.parse() {
                Some(Citation::Source { id: source_id, url })
            } else if let Ok(claim_id) = id.parse() {
                Some(Citation::Claim { id: claim_id })
            } else {
                None
            }
        })
        .collect()
}

fn strip_citations(unit: &str) -> String {
    let stripped = CITATION_RE.replace_all(unit, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bare source-list entries are indexing metadata, not assertions: short,
/// colon-separated, title-cased lines, or anything under a Sources heading.
fn looks_like_source_entry(text: &str, in_sources_section: bool) -> bool {
    if in_sources_section {
        return true;
    }
    let text = text.trim_start_matches(['-', '*', ' ']);
    if text.len() > 80 {
        return false;
    }
    let Some((before_colon, _)) = text.split_once(':') else {
        return false;
    };
    let words: Vec<&str> = before_colon.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let title_cased = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    title_cased * 2 >= words.len()
}
