//! Address format compatibility
//!
//! Deciding whether an address can hold balances on a chain is delegated to an
//! `AddressFormat`. The default implementation recognizes address shapes by
//! prefix, length and alphabet; it does not verify checksums.

use balance_core::{BitcoinNetwork, ChainFamily, ChainInfo};

/// Shape of an account address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `0x` + 20 bytes hex
    Ethereum,
    /// SS58 base58 account
    Substrate,
    Bitcoin { network: BitcoinNetwork },
    Ton,
    Cardano { testnet: bool },
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn is_base58(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_bech32_body(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Bounceable/non-bounceable tags of user-friendly TON addresses (mainnet, testnet)
const TON_FRIENDLY_PREFIXES: [&str; 4] = ["EQ", "UQ", "kQ", "0Q"];

fn is_ton_friendly(s: &str) -> bool {
    TON_FRIENDLY_PREFIXES.iter().any(|p| s.starts_with(p)) && is_ton_base64(s)
}

fn is_ton_base64(s: &str) -> bool {
    s.len() == 48
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '/'))
}

/// Detect the shape of an address
pub fn detect_kind(address: &str) -> Option<AddressKind> {
    let address = address.trim();

    if let Some(body) = address.strip_prefix("0x") {
        return (body.len() == 40 && is_hex(body)).then_some(AddressKind::Ethereum);
    }

    if let Some(body) = address.strip_prefix("addr_test1") {
        return is_bech32_body(body).then_some(AddressKind::Cardano { testnet: true });
    }
    if let Some(body) = address.strip_prefix("addr1") {
        return is_bech32_body(body).then_some(AddressKind::Cardano { testnet: false });
    }

    let lower = address.to_ascii_lowercase();
    if let Some(body) = lower.strip_prefix("bc1") {
        return is_bech32_body(body).then_some(AddressKind::Bitcoin {
            network: BitcoinNetwork::Mainnet,
        });
    }
    if let Some(body) = lower.strip_prefix("tb1") {
        return is_bech32_body(body).then_some(AddressKind::Bitcoin {
            network: BitcoinNetwork::Testnet,
        });
    }

    // Raw TON form: workchain:hex
    if let Some((workchain, hash)) = address.split_once(':') {
        let valid = matches!(workchain, "0" | "-1") && hash.len() == 64 && is_hex(hash);
        return valid.then_some(AddressKind::Ton);
    }

    // Friendly TON addresses can also be valid base58, so they go first
    if is_ton_friendly(address) {
        return Some(AddressKind::Ton);
    }

    // Legacy base58 Bitcoin addresses are 26-35 chars; SS58 accounts are longer
    if is_base58(address) {
        return match (address.len(), address.chars().next()) {
            (26..=35, Some('1' | '3')) => Some(AddressKind::Bitcoin {
                network: BitcoinNetwork::Mainnet,
            }),
            (26..=35, Some('m' | 'n' | '2')) => Some(AddressKind::Bitcoin {
                network: BitcoinNetwork::Testnet,
            }),
            (46..=50, _) => Some(AddressKind::Substrate),
            _ => None,
        };
    }

    is_ton_base64(address).then_some(AddressKind::Ton)
}

/// Chain-specific address compatibility rules
pub trait AddressFormat: Send + Sync {
    fn is_compatible(&self, address: &str, chain: &ChainInfo) -> bool;
}

/// Shape-based compatibility
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAddressFormat;

impl AddressFormat for DefaultAddressFormat {
    fn is_compatible(&self, address: &str, chain: &ChainInfo) -> bool {
        let Some(kind) = detect_kind(address) else {
            return false;
        };

        match chain.family() {
            ChainFamily::Evm => kind == AddressKind::Ethereum,
            ChainFamily::Substrate => {
                let ethereum_accounts = chain
                    .substrate
                    .as_ref()
                    .map(|s| s.uses_ethereum_accounts)
                    .unwrap_or(false);
                if ethereum_accounts {
                    kind == AddressKind::Ethereum
                } else {
                    kind == AddressKind::Substrate
                }
            }
            ChainFamily::Bitcoin => {
                let network = chain.bitcoin.as_ref().map(|b| b.network).unwrap_or_default();
                kind == AddressKind::Bitcoin { network }
            }
            ChainFamily::Ton => kind == AddressKind::Ton,
            ChainFamily::Cardano => {
                let testnet = chain.cardano.as_ref().map(|c| c.is_testnet).unwrap_or(false);
                kind == AddressKind::Cardano { testnet }
            }
        }
    }
}

/// Split addresses into (compatible, incompatible) for a chain, keeping order
pub fn partition_addresses(
    format: &dyn AddressFormat,
    addresses: &[String],
    chain: &ChainInfo,
) -> (Vec<String>, Vec<String>) {
    addresses
        .iter()
        .cloned()
        .partition(|address| format.is_compatible(address, chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_core::{BitcoinInfo, CardanoInfo, EvmInfo, SubstrateInfo};

    const SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const ETH: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

    fn chain() -> ChainInfo {
        ChainInfo {
            slug: "test".into(),
            name: "Test".into(),
            substrate: None,
            evm: None,
            bitcoin: None,
            ton: None,
            cardano: None,
        }
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind(ETH), Some(AddressKind::Ethereum));
        assert_eq!(detect_kind(SS58), Some(AddressKind::Substrate));
        assert_eq!(
            detect_kind("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            Some(AddressKind::Bitcoin {
                network: BitcoinNetwork::Mainnet
            })
        );
        assert_eq!(
            detect_kind("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"),
            Some(AddressKind::Bitcoin {
                network: BitcoinNetwork::Mainnet
            })
        );
        assert_eq!(
            detect_kind("EQDtFpEwcFAEcRe5mLVh2N6C0x-_hJEM7W61_JLnSF74p4q2"),
            Some(AddressKind::Ton)
        );
        // Friendly form that is also valid base58
        assert_eq!(
            detect_kind("EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAag8xqB2N"),
            Some(AddressKind::Ton)
        );
        assert_eq!(
            detect_kind("UQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAag8xqB2N"),
            Some(AddressKind::Ton)
        );
        assert_eq!(
            detect_kind("0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8"),
            Some(AddressKind::Ton)
        );
        assert_eq!(
            detect_kind("addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x"),
            Some(AddressKind::Cardano { testnet: false })
        );
        assert_eq!(detect_kind("0x1234"), None);
        assert_eq!(detect_kind("not an address"), None);
    }

    #[test]
    fn test_substrate_compatibility() {
        let mut polkadot = chain();
        polkadot.substrate = Some(SubstrateInfo::default());
        assert!(DefaultAddressFormat.is_compatible(SS58, &polkadot));
        assert!(!DefaultAddressFormat.is_compatible(ETH, &polkadot));

        let mut moonbeam = polkadot.clone();
        moonbeam.evm = Some(EvmInfo { chain_id: 1284 });
        moonbeam.substrate = Some(SubstrateInfo {
            uses_ethereum_accounts: true,
            ..Default::default()
        });
        assert!(DefaultAddressFormat.is_compatible(ETH, &moonbeam));
        assert!(!DefaultAddressFormat.is_compatible(SS58, &moonbeam));
    }

    #[test]
    fn test_network_mismatch() {
        let mut btc = chain();
        btc.bitcoin = Some(BitcoinInfo {
            network: BitcoinNetwork::Testnet,
        });
        assert!(!DefaultAddressFormat.is_compatible("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", &btc));

        let mut ada = chain();
        ada.cardano = Some(CardanoInfo { is_testnet: true });
        assert!(DefaultAddressFormat.is_compatible("addr_test1vz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzerspjrlsz", &ada));
    }

    #[test]
    fn test_partition_keeps_order() {
        let mut evm = chain();
        evm.evm = Some(EvmInfo { chain_id: 1 });
        let addresses = vec![ETH.to_string(), SS58.to_string()];
        let (ok, bad) = partition_addresses(&DefaultAddressFormat, &addresses, &evm);
        assert_eq!(ok, vec![ETH.to_string()]);
        assert_eq!(bad, vec![SS58.to_string()]);
    }
}
