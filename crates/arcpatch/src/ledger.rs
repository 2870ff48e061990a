//! Per-run record of container offsets that have already been targeted.

use std::collections::HashSet;

/// Set of container offsets claimed during one patch run.
///
/// Two mod files that resolve to the same slot would silently overwrite each
/// other, so the second claim is rejected. The ledger is not thread-safe; the
/// orchestrator only claims from its sequential planning phase.
#[derive(Debug, Default)]
pub struct OffsetLedger {
    claimed: HashSet<u64>,
}

impl OffsetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `offset`. Returns `false` without mutating if it was already claimed.
    pub fn claim(&mut self, offset: u64) -> bool {
        self.claimed.insert(offset)
    }

    pub fn is_claimed(&self, offset: u64) -> bool {
        self.claimed.contains(&offset)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_claim() {
        let mut ledger = OffsetLedger::new();
        assert!(ledger.claim(0x2000));
        assert!(!ledger.claim(0x2000));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_distinct_offsets() {
        let mut ledger = OffsetLedger::new();
        assert!(ledger.claim(0x2000));
        assert!(ledger.claim(0x4000));
        assert!(ledger.is_claimed(0x2000));
        assert!(ledger.is_claimed(0x4000));
        assert!(!ledger.is_claimed(0x6000));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_empty() {
        let ledger = OffsetLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.is_claimed(0));
    }
}
