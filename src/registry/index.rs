use crate::models::{Claim, ClaimId, SourceId};
use std::collections::{BTreeMap, HashMap};

/// In-memory view of the registry, rebuilt from the WAL on open.
#[derive(Default, Debug)]
pub struct ClaimIndex {
    by_id: BTreeMap<ClaimId, Claim>,
    by_source: HashMap<SourceId, Vec<ClaimId>>,
    by_content_hash: HashMap<String, ClaimId>,
}

impl ClaimIndex {
    pub fn insert(&mut self, claim: Claim) {
        self.by_content_hash
            .insert(claim.content_hash.clone(), claim.id);
        self.by_source.entry(claim.source_id).or_default().push(claim.id);
        self.by_id.insert(claim.id, claim);
    }

    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: ClaimId) -> Option<&mut Claim> {
        self.by_id.get_mut(&id)
    }

    pub fn by_content_hash(&self, hash: &str) -> Option<&Claim> {
        self.by_content_hash.get(hash).and_then(|id| self.by_id.get(id))
    }

    pub fn by_source(&self, source_id: SourceId) -> Vec<&Claim> {
        self.by_source
            .get(&source_id)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Claims carrying a number within `tolerance` (relative) of `value`,
    /// regardless of unit.
    pub fn by_numeric_value(&self, value: f64, tolerance: f64) -> Vec<&Claim> {
        self.by_id
            .values()
            .filter(|claim| {
                claim.numbers.iter().any(|n| {
                    if value == 0.0 {
                        n.value == 0.0
                    } else {
                        ((n.value - value).abs() / value.abs()) <= tolerance
                    }
                })
            })
            .collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Claim> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn max_id(&self) -> Option<ClaimId> {
        self.by_id.keys().next_back().copied()
    }
}
