//! Binding stage: three-way URL agreement between citation, source catalog,
//! and captured-evidence metadata. An existence check on citation ids cannot
//! catch a citation whose id is valid but whose content silently drifted;
//! this stage can.

use crate::evidence::EvidenceStore;
use crate::models::{
    Citation, DocumentStatement, Issue, IssueCode, SourceCatalog, SourceId,
};
use crate::registry::ClaimRegistry;
use crate::urlnorm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingInput {
    pub citations: Vec<BindingCitation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingCitation {
    pub statement_line: usize,
    pub citation: Citation,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingReport {
    pub checked_citations: usize,
    pub issues: Vec<Issue>,
}

pub fn run(
    statements: &[DocumentStatement],
    catalog: &SourceCatalog,
    registry: &ClaimRegistry,
    store: &dyn EvidenceStore,
) -> (BindingInput, BindingReport) {
    let input = BindingInput {
        citations: statements
            .iter()
            .flat_map(|s| {
                s.citations.iter().cloned().map(|citation| BindingCitation {
                    statement_line: s.line,
                    citation,
                })
            })
            .collect(),
    };

    let mut issues = Vec::new();
    let mut orphaned: BTreeSet<String> = BTreeSet::new();
    let mut checked = 0usize;

    for statement in statements {
        for citation in &statement.citations {
            checked += 1;
            match citation {
                Citation::Source { id, url } => {
                    let Some(record) = catalog.get(*id) else {
                        if orphaned.insert(id.to_string()) {
                            issues.push(
                                Issue::blocking(
                                    IssueCode::OrphanCitation,
                                    format!("citation {id} has no source record"),
                                )
                                .with_source(*id)
                                .with_statement(statement.text.clone()),
                            );
                        }
                        continue;
                    };
                    if let Some(cited_url) = url {
                        check_three_way(
                            *id,
                            cited_url,
                            record.url.as_str(),
                            statement,
                            store,
                            &mut issues,
                        );
                    }
                }
                Citation::Claim { id } => {
                    // A dangling direct reference would otherwise fall
                    // through to weaker matching unnoticed.
                    if registry.find_by_id(*id).is_none() && orphaned.insert(id.to_string()) {
                        issues.push(
                            Issue::blocking(
                                IssueCode::OrphanCitation,
                                format!("citation {id} names a claim absent from the registry"),
                            )
                            .with_statement(statement.text.clone()),
                        );
                    }
                }
            }
        }
    }

    debug!(checked, issues = issues.len(), "binding stage done");
    (
        input,
        BindingReport {
            checked_citations: checked,
            issues,
        },
    )
}

fn check_three_way(
    id: SourceId,
    citation_url: &str,
    catalog_url: &str,
    statement: &DocumentStatement,
    store: &dyn EvidenceStore,
    issues: &mut Vec<Issue>,
) {
    let meta_url = match store.meta(id) {
        Ok(meta) => meta.url.to_string(),
        Err(err) => {
            issues.push(
                Issue::blocking(
                    IssueCode::UrlMismatch,
                    format!("evidence metadata for {id} unavailable: {err}"),
                )
                .with_source(id)
                .with_statement(statement.text.clone()),
            );
            return;
        }
    };

    let canon_citation = urlnorm::normalize(citation_url);
    let canon_catalog = urlnorm::normalize(catalog_url);
    let canon_meta = urlnorm::normalize(&meta_url);

    if canon_citation != canon_catalog || canon_catalog != canon_meta {
        issues.push(
            Issue::blocking(
                IssueCode::UrlMismatch,
                format!(
                    "citation, catalog, and evidence URLs disagree for {id}: \
citation={canon_citation} catalog={canon_catalog} evidence={canon_meta}"
                ),
            )
            .with_source(id)
            .with_statement(statement.text.clone())
            .with_expected_found(canon_catalog, canon_citation),
        );
    }
}
