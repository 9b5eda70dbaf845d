use blockchain::mock::{MockMetadataSource, MockRpc};
use blockchain::{
    HoldingsFetcher, OffChainMetadata, OnChainMetadata, ParsedTokenAccount, ProgramVariant,
    UNKNOWN_NAME, UNKNOWN_SYMBOL,
};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;

fn account(mint: Pubkey, amount: u64, decimals: u8) -> ParsedTokenAccount {
    ParsedTokenAccount {
        account: Pubkey::new_unique(),
        mint,
        amount,
        decimals,
    }
}

fn fetcher(rpc: MockRpc, source: MockMetadataSource) -> HoldingsFetcher {
    HoldingsFetcher::new(Arc::new(rpc), Arc::new(source))
}

#[tokio::test]
async fn test_zero_balances_are_excluded() {
    let owner = Pubkey::new_unique();
    let empty_mint = Pubkey::new_unique();
    let held_mint = Pubkey::new_unique();
    let rpc = MockRpc::new()
        .with_token_account(owner, ProgramVariant::Legacy, account(empty_mint, 0, 6))
        .with_token_account(owner, ProgramVariant::Legacy, account(held_mint, 2_500_000, 6));

    let holdings = fetcher(rpc, MockMetadataSource::new()).list_holdings(&owner).await;

    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].mint, held_mint);
    assert_eq!(holdings[0].balance, Decimal::from_str("2.5").unwrap());
    assert!(holdings.iter().all(|h| h.mint != empty_mint));
}

#[tokio::test]
async fn test_missing_or_failed_metadata_uses_sentinels() {
    let owner = Pubkey::new_unique();
    let no_metadata = Pubkey::new_unique();
    let unreadable = Pubkey::new_unique();
    let dead_link = Pubkey::new_unique();
    let rpc = MockRpc::new()
        .with_token_account(owner, ProgramVariant::Legacy, account(no_metadata, 1, 0))
        .with_token_account(owner, ProgramVariant::Extended, account(unreadable, 1, 0))
        .with_token_account(owner, ProgramVariant::Extended, account(dead_link, 1, 0))
        .with_failing_mint(unreadable)
        .with_mint_metadata(
            dead_link,
            OnChainMetadata {
                name: "Linked".to_string(),
                symbol: "LNK".to_string(),
                uri: "https://gateway.pinata.cloud/ipfs/missing".to_string(),
            },
        );

    let holdings = fetcher(rpc, MockMetadataSource::new()).list_holdings(&owner).await;

    assert_eq!(holdings.len(), 3);
    for holding in &holdings {
        assert_eq!(holding.name, UNKNOWN_NAME);
        assert_eq!(holding.symbol, UNKNOWN_SYMBOL);
        assert_eq!(holding.image, "");
    }
}

#[tokio::test]
async fn test_metadata_is_resolved_through_uri() {
    let owner = Pubkey::new_unique();
    let mint = Pubkey::new_unique();
    let uri = "https://gateway.pinata.cloud/ipfs/QmToken";
    let rpc = MockRpc::new()
        .with_token_account(owner, ProgramVariant::Extended, account(mint, 100_000_000_000, 9))
        .with_mint_metadata(
            mint,
            OnChainMetadata {
                name: "On Chain".to_string(),
                symbol: "ONC".to_string(),
                uri: uri.to_string(),
            },
        );
    let source = MockMetadataSource::new().with_document(
        uri,
        OffChainMetadata {
            name: None,
            symbol: Some("JSN".to_string()),
            image: Some("https://robohash.org/JSN.png?size=400x400".to_string()),
            description: None,
        },
    );

    let holdings = fetcher(rpc, source).list_holdings(&owner).await;

    assert_eq!(holdings.len(), 1);
    let holding = &holdings[0];
    assert_eq!(holding.name, "On Chain");
    assert_eq!(holding.symbol, "JSN");
    assert_eq!(holding.image, "https://robohash.org/JSN.png?size=400x400");
    assert_eq!(holding.program, ProgramVariant::Extended);
    assert_eq!(holding.balance, Decimal::from(100));
    assert!(!holding.has_unknown_metadata());
}

#[tokio::test]
async fn test_failed_variant_does_not_hide_the_other() {
    let owner = Pubkey::new_unique();
    let legacy_mint = Pubkey::new_unique();
    let rpc = MockRpc::new()
        .with_token_account(owner, ProgramVariant::Legacy, account(legacy_mint, 7, 0))
        .with_token_account(owner, ProgramVariant::Extended, account(Pubkey::new_unique(), 7, 0))
        .with_failing_variant(ProgramVariant::Extended);

    let holdings = fetcher(rpc, MockMetadataSource::new()).list_holdings(&owner).await;

    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].mint, legacy_mint);
}

#[tokio::test]
async fn test_order_is_variant_then_rpc_order() {
    let owner = Pubkey::new_unique();
    let mints: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
    let rpc = MockRpc::new()
        .with_token_account(owner, ProgramVariant::Extended, account(mints[2], 1, 0))
        .with_token_account(owner, ProgramVariant::Extended, account(mints[3], 1, 0))
        .with_token_account(owner, ProgramVariant::Legacy, account(mints[0], 1, 0))
        .with_token_account(owner, ProgramVariant::Legacy, account(mints[1], 1, 0));

    let holdings = fetcher(rpc, MockMetadataSource::new()).list_holdings(&owner).await;

    let listed: Vec<Pubkey> = holdings.iter().map(|h| h.mint).collect();
    assert_eq!(listed, mints);
}
