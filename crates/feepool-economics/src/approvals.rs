//! Claim-on-behalf delegations

use feepool_core::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Explicit approvals letting a delegate claim for an owner
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DelegateApprovals {
    approvals: HashMap<AccountId, HashSet<AccountId>>,
}

impl DelegateApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the approval already existed
    pub fn approve(&mut self, owner: AccountId, delegate: AccountId) -> bool {
        self.approvals.entry(owner).or_default().insert(delegate)
    }

    /// Returns false if there was nothing to remove
    pub fn remove(&mut self, owner: &AccountId, delegate: &AccountId) -> bool {
        let Some(delegates) = self.approvals.get_mut(owner) else {
            return false;
        };
        let removed = delegates.remove(delegate);
        if delegates.is_empty() {
            self.approvals.remove(owner);
        }
        removed
    }

    pub fn can_claim_for(&self, owner: &AccountId, delegate: &AccountId) -> bool {
        self.approvals
            .get(owner)
            .map(|d| d.contains(delegate))
            .unwrap_or(false)
    }

    pub fn delegates_of(&self, owner: &AccountId) -> Vec<AccountId> {
        let mut delegates: Vec<_> = self
            .approvals
            .get(owner)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();
        delegates.sort();
        delegates
    }
}
