//! Lock / hold / freeze aggregation
//!
//! Substrate accounts can carry three independent kinds of encumbrance:
//! `balances.locks` (8-byte identifiers), `balances.holds` and `balances.freezes`
//! (runtime reason enums). All three are flattened into `LockEntry`s and summed
//! into named buckets. Each entry lands in at most one bucket.

use balance_core::{Amount, LockedBalanceDetails};
use serde_json::Value;

// ================================================================================================
// Identifier sets
// ================================================================================================

/// Lock/hold/freeze identifiers attributed to staking
const STAKING_IDS: &[&str] = &[
    "staking",
    "stkngdel",
    "stkngcol",
    "collator",
    "delegatr",
    "delegatedstaking",
    "nominationpools",
    "parachainstaking",
    "collatorselection",
];

/// Identifiers attributed to governance (conviction voting, elections)
const GOVERNANCE_IDS: &[&str] = &["pyconvot", "convictionvoting", "phrelect"];

/// Identifiers attributed to legacy democracy
const DEMOCRACY_IDS: &[&str] = &["democrac", "democracy"];

/// Named bucket a lock identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCategory {
    Staking,
    Governance,
    Democracy,
}

/// Classify an identifier. Priority is staking, then governance, then democracy.
pub fn classify(id: &str) -> Option<LockCategory> {
    let id = id.trim().to_ascii_lowercase();
    let in_set = |set: &[&str]| set.iter().any(|s| *s == id);

    if in_set(STAKING_IDS) {
        Some(LockCategory::Staking)
    } else if in_set(GOVERNANCE_IDS) {
        Some(LockCategory::Governance)
    } else if in_set(DEMOCRACY_IDS) {
        Some(LockCategory::Democracy)
    } else {
        None
    }
}

// ================================================================================================
// Entries
// ================================================================================================

/// Where an entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockSource {
    Lock,
    Hold,
    Freeze,
}

/// One lock, hold or freeze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    pub id: Option<String>,
    pub amount: Amount,
    pub source: LockSource,
}

/// Extract the semantic identifier from a decoded lock id.
///
/// Handles fixed-width byte ids (hex string or byte array, null padded),
/// plain strings, and map-shaped enum ids whose single key is the id.
pub fn lock_identifier(id: &Value) -> Option<String> {
    let text = match id {
        Value::String(s) => match s.strip_prefix("0x").map(hex::decode) {
            Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => s.clone(),
        },
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            String::from_utf8_lossy(&bytes?).into_owned()
        }
        Value::Object(map) if map.len() == 1 => map.keys().next()?.clone(),
        _ => return None,
    };

    let trimmed = text.trim_matches(char::from(0)).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a storage value holding a list of `{id, amount}` entries
pub fn parse_entries(value: &Value, source: LockSource) -> Vec<LockEntry> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let amount = Amount::from_json(item.get("amount")?)?;
            Some(LockEntry {
                id: item.get("id").and_then(lock_identifier),
                amount,
                source,
            })
        })
        .collect()
}

// ================================================================================================
// Aggregation
// ================================================================================================

/// Sums per named bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockBuckets {
    pub staking: Amount,
    pub governance: Amount,
    pub democracy: Amount,
    /// Part of the classified amounts that came from holds (already inside `reserved`)
    pub classified_holds: Amount,
}

impl LockBuckets {
    /// Stake read from outside the lock ledgers (pool members, subnet root stake)
    pub fn add_staking(&mut self, amount: &Amount) {
        self.staking = &self.staking + amount;
    }

    /// Build the details record for an account.
    ///
    /// Holds are a subset of the account's reserved balance, so the `reserved`
    /// bucket only keeps reserved funds that were not already attributed to a named
    /// bucket. `others` is whatever of `total_locked` the buckets leave unexplained.
    ///
    /// The buckets are summed, not maxed: staking 40 and governance 10 on a
    /// total of 50 must leave `others` at zero. Taking the largest bucket would
    /// report the governance lock a second time as `others`.
    pub fn into_details(self, total_locked: &Amount, account_reserved: &Amount) -> LockedBalanceDetails {
        let reserved = account_reserved.saturating_sub(&self.classified_holds);
        let explained = [&self.staking, &self.governance, &self.democracy, &reserved]
            .into_iter()
            .sum::<Amount>();
        let others = total_locked.saturating_sub(&explained);

        LockedBalanceDetails {
            staking: self.staking,
            governance: self.governance,
            democracy: self.democracy,
            reserved,
            others,
        }
    }
}

/// Sum entries into buckets; unclassified entries are left for `others`
pub fn aggregate(entries: &[LockEntry]) -> LockBuckets {
    let mut buckets = LockBuckets::default();

    for entry in entries {
        let Some(category) = entry.id.as_deref().and_then(classify) else {
            continue;
        };

        let bucket = match category {
            LockCategory::Staking => &mut buckets.staking,
            LockCategory::Governance => &mut buckets.governance,
            LockCategory::Democracy => &mut buckets.democracy,
        };
        *bucket = &*bucket + &entry.amount;

        if entry.source == LockSource::Hold {
            buckets.classified_holds = &buckets.classified_holds + &entry.amount;
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, amount: u64, source: LockSource) -> LockEntry {
        LockEntry {
            id: Some(id.to_string()),
            amount: Amount::from(amount),
            source,
        }
    }

    #[test]
    fn test_lock_identifier_shapes() {
        // "staking " null/space padded as 8 bytes
        assert_eq!(
            lock_identifier(&json!("0x7374616b696e6720")).as_deref(),
            Some("staking")
        );
        assert_eq!(
            lock_identifier(&json!([100, 101, 109, 111, 99, 114, 97, 99])).as_deref(),
            Some("democrac")
        );
        assert_eq!(
            lock_identifier(&json!("0x70796372656c6563000000")).as_deref(),
            Some("pycrelec")
        );
        assert_eq!(
            lock_identifier(&json!({"DelegatedStaking": "StakingDelegation"})).as_deref(),
            Some("DelegatedStaking")
        );
        assert_eq!(lock_identifier(&json!("pyconvot")).as_deref(), Some("pyconvot"));
        assert_eq!(lock_identifier(&json!("0x0000")), None);
        assert_eq!(lock_identifier(&json!(7)), None);
    }

    #[test]
    fn test_classify_priority_and_case() {
        assert_eq!(classify("Staking"), Some(LockCategory::Staking));
        assert_eq!(classify("NominationPools"), Some(LockCategory::Staking));
        assert_eq!(classify(" pyconvot "), Some(LockCategory::Governance));
        assert_eq!(classify("Democracy"), Some(LockCategory::Democracy));
        assert_eq!(classify("vesting"), None);
    }

    #[test]
    fn test_staking_and_governance_locks() {
        let buckets = aggregate(&[
            entry("staking", 40, LockSource::Lock),
            entry("pyconvot", 10, LockSource::Lock),
        ]);
        let details = buckets.into_details(&Amount::from(50u64), &Amount::zero());

        assert_eq!(details.staking, Amount::from(40u64));
        assert_eq!(details.governance, Amount::from(10u64));
        assert_eq!(details.democracy, Amount::zero());
        assert_eq!(details.reserved, Amount::zero());
        assert_eq!(details.others, Amount::zero());
    }

    #[test]
    fn test_others_subtracts_the_sum_of_buckets() {
        let buckets = aggregate(&[
            entry("staking", 40, LockSource::Lock),
            entry("pyconvot", 10, LockSource::Lock),
        ]);
        // Total minus the largest bucket would be 20 here
        let details = buckets.into_details(&Amount::from(60u64), &Amount::zero());
        assert_eq!(details.others, Amount::from(10u64));
    }

    #[test]
    fn test_unclassified_goes_to_others() {
        let buckets = aggregate(&[
            entry("staking", 40, LockSource::Lock),
            entry("vesting", 25, LockSource::Lock),
        ]);
        let details = buckets.into_details(&Amount::from(65u64), &Amount::zero());
        assert_eq!(details.others, Amount::from(25u64));
    }

    #[test]
    fn test_holds_are_not_counted_twice() {
        let buckets = aggregate(&[
            entry("DelegatedStaking", 30, LockSource::Hold),
            entry("Preimage", 5, LockSource::Hold),
        ]);
        // Account reserved 35 = both holds; only the preimage part stays reserved
        let details = buckets.into_details(&Amount::from(35u64), &Amount::from(35u64));
        assert_eq!(details.staking, Amount::from(30u64));
        assert_eq!(details.reserved, Amount::from(5u64));
        assert_eq!(details.others, Amount::zero());
    }

    #[test]
    fn test_others_never_negative() {
        let buckets = aggregate(&[entry("staking", 100, LockSource::Lock)]);
        let details = buckets.into_details(&Amount::from(60u64), &Amount::zero());
        assert_eq!(details.others, Amount::zero());
    }

    #[test]
    fn test_parse_entries() {
        let value = json!([
            {"id": "0x7374616b696e6720", "amount": "0x28", "reasons": "All"},
            {"id": {"NominationPools": "PoolMinBalance"}, "amount": 7},
            {"id": "broken"}
        ]);
        let entries = parse_entries(&value, LockSource::Freeze);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.as_deref(), Some("staking"));
        assert_eq!(entries[0].amount, Amount::from(40u64));
        assert_eq!(entries[1].id.as_deref(), Some("NominationPools"));
        assert!(parse_entries(&Value::Null, LockSource::Lock).is_empty());
    }

    #[test]
    fn test_parse_entries_above_u64() {
        let value: Value =
            serde_json::from_str(r#"[{"id": "0x7374616b696e6720", "amount": 100000000000000000000}]"#)
                .unwrap();
        let entries = parse_entries(&value, LockSource::Lock);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount.to_string(), "100000000000000000000");
    }
}
