//! Decoded account shapes and transferable-balance rules

use balance_core::Amount;
use serde::Deserialize;
use serde_json::Value;

/// `system.account(..).data`
///
/// Newer runtimes carry a single `frozen`; older ones split it into
/// `miscFrozen` and `feeFrozen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    #[serde(default)]
    pub free: Amount,
    #[serde(default)]
    pub reserved: Amount,
    #[serde(default)]
    pub frozen: Option<Amount>,
    #[serde(default)]
    pub misc_frozen: Option<Amount>,
    #[serde(default)]
    pub fee_frozen: Option<Amount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AccountInfo {
    #[serde(default)]
    data: AccountData,
}

impl AccountData {
    /// Decode a `system.account` value; a missing account reads as empty
    pub fn from_account_info(value: &Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        match serde_json::from_value::<AccountInfo>(value.clone()) {
            Ok(info) => info.data,
            Err(e) => {
                tracing::warn!("Undecodable account info, treating as empty: {}", e);
                Self::default()
            }
        }
    }

    pub fn frozen(&self) -> Amount {
        match &self.frozen {
            Some(frozen) => frozen.clone(),
            None => {
                let misc = self.misc_frozen.clone().unwrap_or_default();
                let fee = self.fee_frozen.clone().unwrap_or_default();
                misc.max(fee)
            }
        }
    }

    pub fn total(&self) -> Amount {
        &self.free + &self.reserved
    }

    /// Part of `frozen` not already covered by reserved funds
    fn frozen_over_reserved(&self) -> Amount {
        self.frozen().saturating_sub(&self.reserved)
    }

    /// `free - max(frozen - reserved, ed)`
    pub fn transferable(&self, applied_ed: &Amount) -> Amount {
        let untouchable = self.frozen_over_reserved().max(applied_ed.clone());
        self.free.saturating_sub(&untouchable)
    }

    /// Reserved funds plus the frozen part of free funds.
    ///
    /// The existential deposit is withheld from `transferable` but is not a lock.
    pub fn locked(&self) -> Amount {
        let frozen_free = self.frozen_over_reserved().min(self.free.clone());
        &self.reserved + &frozen_free
    }
}

/// Tokens-pallet account (`tokens.accounts`, `ormlTokens.accounts`, currencies API)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountData {
    #[serde(default)]
    pub free: Amount,
    #[serde(default)]
    pub reserved: Amount,
    #[serde(default)]
    pub frozen: Amount,
}

impl TokenAccountData {
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!("Undecodable token account, treating as empty: {}", e);
            Self::default()
        })
    }

    /// `free - max(frozen, ed)`; token freezes apply to free funds only
    pub fn transferable(&self, applied_ed: &Amount) -> Amount {
        let untouchable = self.frozen.clone().max(applied_ed.clone());
        self.free.saturating_sub(&untouchable)
    }

    pub fn locked(&self) -> Amount {
        &self.reserved + &self.frozen.clone().min(self.free.clone())
    }
}

/// pallet-assets account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AssetAccountStatus {
    Liquid,
    Frozen,
    Blocked,
}

/// `assets.account` / `foreignAssets.account`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAccountData {
    #[serde(default)]
    pub balance: Amount,
    #[serde(default)]
    pub status: Option<AssetAccountStatus>,
    /// Pre-status runtimes
    #[serde(default)]
    pub is_frozen: bool,
}

impl AssetAccountData {
    /// Decode an asset account; a missing account is `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!("Undecodable asset account: {}", e);
                None
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.is_frozen
            || matches!(
                self.status,
                Some(AssetAccountStatus::Frozen | AssetAccountStatus::Blocked)
            )
    }

    /// `(free, locked)`; a frozen account locks its whole balance
    pub fn free_and_locked(&self, applied_ed: &Amount) -> (Amount, Amount) {
        if self.is_frozen() {
            (Amount::zero(), self.balance.clone())
        } else {
            (self.balance.saturating_sub(applied_ed), Amount::zero())
        }
    }
}

/// Stake of a legacy nomination-pool member: bonded points plus unbonding chunks
pub fn pool_member_stake(value: &Value) -> Amount {
    if value.is_null() {
        return Amount::zero();
    }
    let points = value
        .get("points")
        .and_then(Amount::from_json)
        .unwrap_or_default();
    let unbonding: Amount = value
        .get("unbondingEras")
        .and_then(Value::as_object)
        .map(|eras| eras.values().filter_map(Amount::from_json).sum())
        .unwrap_or_default();
    points + unbonding
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amount(v: u64) -> Amount {
        Amount::from(v)
    }

    #[test]
    fn test_numeric_balance_above_u64() {
        let value: Value = serde_json::from_str(
            r#"{"nonce": 0, "data": {"free": 100000000000000000000, "reserved": 0, "frozen": 0}}"#,
        )
        .unwrap();
        let data = AccountData::from_account_info(&value);
        assert_eq!(data.free.to_string(), "100000000000000000000");
        assert_eq!(data.transferable(&amount(1)).to_string(), "99999999999999999999");
    }

    #[test]
    fn test_plain_account() {
        let data = AccountData::from_account_info(&json!({
            "nonce": 3,
            "data": {"free": "100", "reserved": "0", "frozen": "0", "flags": "0x0"}
        }));
        assert_eq!(data.transferable(&amount(1)), amount(99));
        assert_eq!(data.locked(), amount(0));
    }

    #[test]
    fn test_frozen_and_reserved() {
        let data = AccountData {
            free: amount(100),
            reserved: amount(20),
            frozen: Some(amount(50)),
            ..Default::default()
        };
        // untouchable = max(50 - 20, 1) = 30
        assert_eq!(data.transferable(&amount(1)), amount(70));
        assert_eq!(data.locked(), amount(50));
        assert_eq!(data.total(), amount(120));
    }

    #[test]
    fn test_legacy_frozen_fields() {
        let data = AccountData::from_account_info(&json!({
            "data": {"free": 1000, "reserved": 0, "miscFrozen": 300, "feeFrozen": 400}
        }));
        assert_eq!(data.frozen(), amount(400));
        assert_eq!(data.transferable(&amount(10)), amount(600));
    }

    #[test]
    fn test_missing_account() {
        let data = AccountData::from_account_info(&Value::Null);
        assert_eq!(data.transferable(&amount(1)), amount(0));
        assert_eq!(data.locked(), amount(0));
    }

    #[test]
    fn test_frozen_beyond_free() {
        let data = AccountData {
            free: amount(10),
            frozen: Some(amount(50)),
            ..Default::default()
        };
        assert_eq!(data.transferable(&amount(0)), amount(0));
        assert_eq!(data.locked(), amount(10));
    }

    #[test]
    fn test_token_account() {
        let data = TokenAccountData::from_value(&json!({"free": "500", "reserved": "5", "frozen": "100"}));
        assert_eq!(data.transferable(&amount(10)), amount(400));
        assert_eq!(data.locked(), amount(105));
    }

    #[test]
    fn test_asset_account_status() {
        let liquid = AssetAccountData::from_value(&json!({"balance": 70, "status": "Liquid"})).unwrap();
        assert_eq!(liquid.free_and_locked(&amount(0)), (amount(70), amount(0)));

        let frozen = AssetAccountData::from_value(&json!({"balance": 70, "status": "Frozen"})).unwrap();
        assert_eq!(frozen.free_and_locked(&amount(0)), (amount(0), amount(70)));

        let legacy = AssetAccountData::from_value(&json!({"balance": 70, "isFrozen": true})).unwrap();
        assert!(legacy.is_frozen());

        assert!(AssetAccountData::from_value(&Value::Null).is_none());
    }

    #[test]
    fn test_pool_member_stake() {
        let member = json!({
            "poolId": 12,
            "points": "1000",
            "unbondingEras": {"1500": "200", "1501": "50"}
        });
        assert_eq!(pool_member_stake(&member), amount(1250));
        assert_eq!(pool_member_stake(&Value::Null), amount(0));
    }
}
