//! Native balances from `system.account`
//!
//! All addresses are watched in one batched subscription. On every change the
//! transferable and locked amounts are derived from the account data; only
//! addresses with something locked get their lock, hold and freeze ledgers read,
//! after a short delay, to break the locked amount down into buckets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use balance_core::{
    applied_existential_deposit, AdapterError, Amount, BalanceItem, BalanceState, ChainAsset,
};
use chain_client::{
    timed_request, ChainCapabilities, StorageEntry, StorageQuery, StorageResults, SubstrateClient,
};
use serde_json::Value;

use super::account::{pool_member_stake, AccountData};
use super::spawn_storage_watch;
use super::subnet::{fetch_stake, ROOT_NETUID};
use crate::adapters::{zero_items, AdapterContext};
use crate::chain_groups;
use crate::handle::SubscriptionHandle;
use crate::locks::{aggregate, parse_entries, LockBuckets, LockEntry, LockSource};

struct SystemAccountReader {
    client: Arc<dyn SubstrateClient>,
    chain: String,
    addresses: Vec<String>,
    asset: ChainAsset,
    applied_ed: Amount,
    caps: ChainCapabilities,
    bittensor: bool,
    lock_read_delay: Duration,
    timeout: Duration,
}

fn account_query(address: &str) -> StorageQuery {
    StorageQuery::new(StorageEntry::SystemAccount, vec![Value::from(address)])
}

fn pool_member_query(address: &str) -> StorageQuery {
    StorageQuery::new(
        StorageEntry::NominationPoolsPoolMembers,
        vec![Value::from(address)],
    )
}

impl SystemAccountReader {
    fn queries(&self) -> Vec<StorageQuery> {
        let mut queries: Vec<StorageQuery> =
            self.addresses.iter().map(|a| account_query(a)).collect();
        if self.caps.needs_pool_member_query() {
            queries.extend(self.addresses.iter().map(|a| pool_member_query(a)));
        }
        queries
    }

    /// Stake held outside the account's own locks
    async fn external_stake(&self, address: &str, results: &StorageResults) -> Amount {
        let mut stake = Amount::zero();

        if self.caps.needs_pool_member_query() {
            stake = stake + pool_member_stake(results.get(&pool_member_query(address)));
        }

        if self.bittensor {
            match fetch_stake(self.client.as_ref(), address, self.timeout).await {
                Ok(by_netuid) => {
                    if let Some(root) = by_netuid.get(&ROOT_NETUID) {
                        stake = &stake + root;
                    }
                }
                Err(e) => {
                    tracing::warn!(chain = %self.chain, address = %address, "Failed to read root stake: {}", e);
                }
            }
        }

        stake
    }

    /// Lock, hold and freeze entries for the given addresses, in one batched read
    async fn lock_entries(&self, addresses: &[&str]) -> HashMap<String, Vec<LockEntry>> {
        let mut sources = vec![(StorageEntry::BalancesLocks, LockSource::Lock)];
        if self.caps.has_holds {
            sources.push((StorageEntry::BalancesHolds, LockSource::Hold));
        }
        if self.caps.has_freezes {
            sources.push((StorageEntry::BalancesFreezes, LockSource::Freeze));
        }

        let queries: Vec<(String, LockSource, StorageQuery)> = addresses
            .iter()
            .flat_map(|address| {
                sources.iter().map(move |(entry, source)| {
                    (
                        address.to_string(),
                        *source,
                        StorageQuery::new(*entry, vec![Value::from(*address)]),
                    )
                })
            })
            .collect();

        let batch: Vec<StorageQuery> = queries.iter().map(|(_, _, q)| q.clone()).collect();
        let results = match timed_request(self.timeout, self.client.query_storage(batch)).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(chain = %self.chain, "Failed to read lock ledgers: {}", e);
                return HashMap::new();
            }
        };

        let mut entries: HashMap<String, Vec<LockEntry>> = HashMap::new();
        for (address, source, query) in &queries {
            entries
                .entry(address.clone())
                .or_default()
                .extend(parse_entries(results.get(query), *source));
        }
        entries
    }

    async fn snapshot(&self, results: StorageResults) -> Vec<BalanceItem> {
        struct Row {
            address: String,
            data: AccountData,
            stake: Amount,
        }

        let mut rows = Vec::with_capacity(self.addresses.len());
        for address in &self.addresses {
            let data = AccountData::from_account_info(results.get(&account_query(address)));
            let stake = self.external_stake(address, &results).await;
            rows.push(Row {
                address: address.clone(),
                data,
                stake,
            });
        }

        // Lock ledgers lag behind account updates; only read them when needed
        let locked_addresses: Vec<&str> = rows
            .iter()
            .filter(|row| !row.data.locked().is_zero())
            .map(|row| row.address.as_str())
            .collect();

        let mut ledgers = if locked_addresses.is_empty() {
            HashMap::new()
        } else {
            tokio::time::sleep(self.lock_read_delay).await;
            self.lock_entries(&locked_addresses).await
        };

        rows.into_iter()
            .map(|row| {
                let free = row.data.transferable(&self.applied_ed);
                let locked = &row.data.locked() + &row.stake;

                let entries = ledgers.remove(&row.address).unwrap_or_default();
                let mut buckets: LockBuckets = aggregate(&entries);
                buckets.add_staking(&row.stake);
                let details = buckets.into_details(&locked, &row.data.reserved);

                BalanceItem::ready(row.address, self.asset.slug.clone(), free, locked)
                    .with_locked_details(details)
            })
            .collect()
    }
}

pub fn subscribe(
    ctx: &AdapterContext,
    client: Arc<dyn SubstrateClient>,
    caps: &ChainCapabilities,
) -> Result<SubscriptionHandle, AdapterError> {
    let asset = ctx
        .assets
        .iter()
        .find(|asset| asset.is_native())
        .cloned()
        .ok_or_else(|| AdapterError::UnsupportedAsset {
            slug: ctx
                .assets
                .first()
                .map(|a| a.slug.to_string())
                .unwrap_or_default(),
            adapter: "system".to_string(),
        })?;

    let unreadable = zero_items(&ctx.addresses, std::slice::from_ref(&asset), BalanceState::Ready);
    let reader = Arc::new(SystemAccountReader {
        client: client.clone(),
        chain: ctx.chain_slug().to_string(),
        addresses: ctx.addresses.clone(),
        applied_ed: applied_existential_deposit(&asset.min_amount, ctx.tx_hint),
        asset,
        caps: caps.clone(),
        bittensor: chain_groups::is_bittensor(ctx.chain_slug()),
        lock_read_delay: ctx.config.lock_read_delay(),
        timeout: ctx.request_timeout(),
    });

    let handle = SubscriptionHandle::new(ctx.label("system"));
    spawn_storage_watch(
        &handle,
        ctx.sink.scoped(&handle),
        client,
        reader.queries(),
        unreadable,
        ctx.request_timeout(),
        move |results| {
            let reader = reader.clone();
            async move { reader.snapshot(results).await }
        },
    );

    Ok(handle)
}
