use futures::future::join_all;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::amount::to_ui_amount;
use crate::deadline::with_deadline;
use crate::metadata_source::OffChainMetadataSource;
use crate::rpc::NetworkRpc;
use crate::types::{
    OnChainMetadata, ParsedTokenAccount, ProgramVariant, TokenHolding, UNKNOWN_NAME,
    UNKNOWN_SYMBOL,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Display fields resolved for one mint
#[derive(Debug, Clone, PartialEq, Eq)]
struct DisplayFields {
    name: String,
    symbol: String,
    image: String,
}

impl DisplayFields {
    fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            symbol: UNKNOWN_SYMBOL.to_string(),
            image: String::new(),
        }
    }
}

/// Lists the owner's nonzero token balances with best-effort metadata
pub struct HoldingsFetcher {
    rpc: Arc<dyn NetworkRpc>,
    metadata_source: Arc<dyn OffChainMetadataSource>,
    fetch_timeout: Duration,
}

impl HoldingsFetcher {
    pub fn new(rpc: Arc<dyn NetworkRpc>, metadata_source: Arc<dyn OffChainMetadataSource>) -> Self {
        Self {
            rpc,
            metadata_source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Holdings ordered by program variant, then by the order the RPC returned them.
    ///
    /// A failed variant query contributes nothing; a failed metadata lookup
    /// leaves that holding with the `Unknown`/`UNK` sentinels.
    pub async fn list_holdings(&self, owner: &Pubkey) -> Vec<TokenHolding> {
        let mut holdings = Vec::new();

        for variant in ProgramVariant::ALL {
            let accounts = match self.rpc.get_token_accounts_by_owner(owner, variant).await {
                Ok(accounts) => accounts,
                Err(e) => {
                    error!("Failed to list {:?} token accounts for {}: {}", variant, owner, e);
                    continue;
                }
            };

            let nonzero = accounts.into_iter().filter(|account| account.amount > 0);
            let decorated = join_all(nonzero.map(|account| self.decorate(account, variant))).await;
            holdings.extend(decorated);
        }

        debug!("Listed {} holdings for {}", holdings.len(), owner);
        holdings
    }

    async fn decorate(&self, account: ParsedTokenAccount, variant: ProgramVariant) -> TokenHolding {
        let balance = to_ui_amount(account.amount, account.decimals).unwrap_or_else(|| {
            warn!(
                "Mint {} uses {} decimals, which cannot be displayed",
                account.mint, account.decimals
            );
            Decimal::ZERO
        });

        let display = self.resolve_display(&account.mint, variant).await;

        TokenHolding {
            mint: account.mint,
            balance,
            name: display.name,
            symbol: display.symbol,
            image: display.image,
            program: variant,
            account: account.account,
            decimals: account.decimals,
        }
    }

    async fn resolve_display(&self, mint: &Pubkey, variant: ProgramVariant) -> DisplayFields {
        let on_chain = match self.rpc.get_mint_metadata(mint, variant).await {
            Ok(Some(metadata)) if !metadata.uri.trim().is_empty() => metadata,
            Ok(_) => return DisplayFields::unknown(),
            Err(e) => {
                warn!("Failed to read metadata for mint {}: {}", mint, e);
                return DisplayFields::unknown();
            }
        };

        let fetched = with_deadline(
            "metadata fetch",
            self.fetch_timeout,
            self.metadata_source.fetch(&on_chain.uri),
        )
        .await;

        match fetched {
            Ok(Ok(document)) => merge_display(document.name, document.symbol, document.image, &on_chain),
            Ok(Err(e)) => {
                warn!("Failed to fetch metadata for mint {}: {}", mint, e);
                DisplayFields::unknown()
            }
            Err(elapsed) => {
                warn!("Metadata for mint {} unavailable: {}", mint, elapsed);
                DisplayFields::unknown()
            }
        }
    }
}

/// Off-chain values win, then on-chain values, then sentinels
fn merge_display(
    name: Option<String>,
    symbol: Option<String>,
    image: Option<String>,
    on_chain: &OnChainMetadata,
) -> DisplayFields {
    let pick = |off_chain: Option<String>, embedded: &str, sentinel: &str| {
        off_chain
            .filter(|v| !v.is_empty())
            .or_else(|| Some(embedded.to_string()).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| sentinel.to_string())
    };

    DisplayFields {
        name: pick(name, &on_chain.name, UNKNOWN_NAME),
        symbol: pick(symbol, &on_chain.symbol, UNKNOWN_SYMBOL),
        image: image.unwrap_or_default(),
    }
}
