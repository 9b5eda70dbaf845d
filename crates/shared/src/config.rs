use anyhow::{ensure, Context};
use serde::Deserialize;
use std::env;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_GATEWAY: &str = "gateway.pinata.cloud";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solana: SolanaConfig,
    pub submission: SubmissionConfig,
    pub metadata: MetadataConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub rpc_fallback_url: Option<String>,
    /// One of `processed`, `confirmed`, `finalized`
    pub commitment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// Wall-clock bound on waiting for confirmation (default: 60000)
    pub confirm_timeout_ms: u64,
    /// Wall-clock bound on waiting for the wallet to sign and send (default: 60000)
    pub sign_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    pub pinata_jwt: Option<String>,
    /// Gateway host used to build retrieval URIs, without scheme
    pub gateway_url: String,
    /// Last-resort content identifier when both uploads fail
    pub default_metadata_hash: Option<String>,
    /// Bound on each off-chain metadata fetch (default: 10000)
    pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Balance/holdings refresh period in seconds (default: 30)
    pub balance_poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        // Timeouts and intervals of zero are rejected
        let positive = |key: &str, default: u64| -> anyhow::Result<u64> {
            let value = match non_empty(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {}: {:?}", key, raw))?,
                None => default,
            };
            ensure!(value > 0, "Invalid {}: must be greater than zero", key);
            Ok(value)
        };

        Ok(Config {
            solana: SolanaConfig {
                rpc_url: non_empty("SOLANA_RPC_URL")
                    .unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
                rpc_fallback_url: non_empty("SOLANA_RPC_FALLBACK_URL"),
                commitment: non_empty("SOLANA_COMMITMENT")
                    .unwrap_or_else(|| "confirmed".to_string()),
            },
            submission: SubmissionConfig {
                confirm_timeout_ms: positive("CONFIRM_TIMEOUT_MS", 60_000)?,
                sign_timeout_ms: positive("SIGN_TIMEOUT_MS", 60_000)?,
            },
            metadata: MetadataConfig {
                pinata_jwt: non_empty("PINATA_JWT"),
                gateway_url: non_empty("PINATA_GATEWAY_URL")
                    .unwrap_or_else(|| DEFAULT_GATEWAY.to_string()),
                default_metadata_hash: non_empty("DEFAULT_METADATA_HASH"),
                fetch_timeout_ms: positive("METADATA_FETCH_TIMEOUT_MS", 10_000)?,
            },
            monitoring: MonitoringConfig {
                balance_poll_interval_secs: positive("BALANCE_POLL_INTERVAL_SECS", 30)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.solana.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.solana.rpc_fallback_url, None);
        assert_eq!(config.solana.commitment, "confirmed");
        assert_eq!(config.submission.confirm_timeout_ms, 60_000);
        assert_eq!(config.submission.sign_timeout_ms, 60_000);
        assert_eq!(config.metadata.gateway_url, DEFAULT_GATEWAY);
        assert_eq!(config.metadata.default_metadata_hash, None);
        assert_eq!(config.monitoring.balance_poll_interval_secs, 30);
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("SOLANA_RPC_URL", "http://localhost:8899"),
            ("SOLANA_RPC_FALLBACK_URL", "   "),
            ("CONFIRM_TIMEOUT_MS", "1500"),
            ("DEFAULT_METADATA_HASH", "bafyfallback"),
        ]))
        .unwrap();

        assert_eq!(config.solana.rpc_url, "http://localhost:8899");
        assert_eq!(config.solana.rpc_fallback_url, None);
        assert_eq!(config.submission.confirm_timeout_ms, 1500);
        assert_eq!(
            config.metadata.default_metadata_hash.as_deref(),
            Some("bafyfallback")
        );
    }

    #[test]
    fn test_unparseable_timeout_names_the_key() {
        let err = Config::from_lookup(lookup_from(&[("SIGN_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("SIGN_TIMEOUT_MS"));
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        for key in [
            "CONFIRM_TIMEOUT_MS",
            "SIGN_TIMEOUT_MS",
            "METADATA_FETCH_TIMEOUT_MS",
            "BALANCE_POLL_INTERVAL_SECS",
        ] {
            let err = Config::from_lookup(lookup_from(&[(key, "0")])).unwrap_err();
            assert!(err.to_string().contains(key), "{}: {}", key, err);
        }
    }
}
