mod common;

use blockchain::mock::{ConfirmBehavior, MockRpc, MockSigner, SignBehavior};
use blockchain::{SubmissionOutcome, SubmissionState};
use common::{harness, harness_with, settings, TestStore, ONE_SOL};
use notification::ToastKind;
use shared::Error;
use tokens::{CreateTokenRequest, MetadataTier, ServiceSettings};

fn funded_signer() -> (MockRpc, MockSigner) {
    let signer = MockSigner::new();
    let rpc = MockRpc::new().with_balance(signer.pubkey(), 2 * ONE_SOL);
    (rpc, signer)
}

#[tokio::test]
async fn test_create_token_runs_both_steps() {
    let (rpc, signer) = funded_signer();
    let h = harness(rpc, signer, TestStore::pinning("QmPrimary"));

    let report = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.metadata_tier, MetadataTier::Primary);
    assert_eq!(report.metadata_uri, "https://gateway.pinata.cloud/ipfs/QmPrimary");
    assert_eq!(h.rpc.sent_transactions().len(), 2);

    let handed = h.signer.handed_over();
    assert_eq!(handed.len(), 2);
    // create account, metadata pointer, initialize mint, write metadata
    assert_eq!(handed[0].len(), 4);
    assert_eq!(handed[0][0].program_id, solana_sdk::system_program::id());
    assert!(handed[0][1..].iter().all(|op| op.program_id == spl_token_2022::id()));
    // token account, then supply
    assert_eq!(handed[1].len(), 2);
    assert_eq!(handed[1][0].program_id, spl_associated_token_account::id());
    assert_eq!(handed[1][1].program_id, spl_token_2022::id());

    let successes: Vec<String> = h
        .notifier
        .terminal()
        .into_iter()
        .filter(|t| t.kind == ToastKind::Success)
        .map(|t| t.message)
        .collect();
    assert_eq!(
        successes,
        vec![
            format!("Token mint created successfully! Mint address: {}", report.mint),
            "100 tokens minted successfully!".to_string(),
        ]
    );
    assert!(h.notifier.active_loading().is_empty());
}

#[tokio::test]
async fn test_supply_step_skipped_when_mint_rejected() {
    let (rpc, signer) = funded_signer();
    let h = harness(rpc, signer.with_behavior(SignBehavior::Reject), TestStore::pinning("QmPrimary"));

    let report = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap();

    assert_eq!(
        report.mint_outcome,
        SubmissionOutcome::Failed {
            reason: blockchain::FailureReason::UserRejected,
            signature: None,
        }
    );
    assert!(report.supply_outcome.is_none());
    assert_eq!(h.signer.handed_over().len(), 1);
    assert_eq!(h.rpc.network_writes(), 0);
    assert_eq!(h.rpc.checkpoint_requests(), 1);
}

#[tokio::test]
async fn test_supply_step_skipped_when_mint_times_out() {
    let (rpc, signer) = funded_signer();
    let h = harness(
        rpc.with_confirm_behavior(ConfirmBehavior::Hang),
        signer,
        TestStore::pinning("QmPrimary"),
    );

    let report = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap();

    assert_eq!(report.mint_outcome.state(), SubmissionState::TimedOut);
    assert!(report.mint_outcome.signature().is_some());
    assert!(report.supply_outcome.is_none());
    assert_eq!(h.rpc.sent_transactions().len(), 1);
}

#[tokio::test]
async fn test_supply_step_skipped_when_mint_fails_on_chain() {
    let (rpc, signer) = funded_signer();
    let details = serde_json::json!({ "InstructionError": [2, { "Custom": 0 }] });
    let h = harness(
        rpc.with_confirm_behavior(ConfirmBehavior::ExecutionError(details.clone())),
        signer,
        TestStore::pinning("QmPrimary"),
    );

    let report = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap();

    assert_eq!(report.mint_outcome.state(), SubmissionState::Failed);
    assert!(report.supply_outcome.is_none());
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_metadata_failure_stops_before_chain_work() {
    let (rpc, signer) = funded_signer();
    let store = TestStore::failing();
    let h = harness(rpc, signer, store.clone());

    let err = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MetadataUploadFailed(_)));
    // user document, then the default document
    assert_eq!(store.uploads(), 2);
    assert_eq!(h.rpc.checkpoint_requests(), 0);
    assert_eq!(h.rpc.network_writes(), 0);
    assert!(h.signer.handed_over().is_empty());
    assert_eq!(
        h.notifier.terminal().last().map(|t| t.message.clone()),
        Some("Failed to create metadata. Please try again later.".to_string())
    );
}

#[tokio::test]
async fn test_environment_cid_is_last_resort() {
    let (rpc, signer) = funded_signer();
    let settings = ServiceSettings {
        default_metadata_cid: Some("QmEnvironment".to_string()),
        ..settings()
    };
    let h = harness_with(rpc, signer, TestStore::failing(), settings);

    let report = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap();

    assert_eq!(report.metadata_tier, MetadataTier::EnvironmentCid);
    assert!(report.metadata_uri.ends_with("/ipfs/QmEnvironment"));
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_missing_name_is_rejected_locally() {
    let (rpc, signer) = funded_signer();
    let store = TestStore::pinning("QmPrimary");
    let h = harness(rpc, signer, store.clone());

    let err = h
        .service
        .create_token(CreateTokenRequest::new("", "LTC"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::InvalidInput("Token name and symbol are required".to_string())
    );
    assert_eq!(store.uploads(), 0);
    assert_eq!(h.rpc.network_writes(), 0);
    assert_eq!(h.notifier.count(ToastKind::Error), 1);
}

#[tokio::test]
async fn test_create_requires_wallet() {
    let h = harness(MockRpc::new(), MockSigner::disconnected(), TestStore::pinning("QmPrimary"));

    let err = h
        .service
        .create_token(CreateTokenRequest::new("Lattice Coin", "LTC"))
        .await
        .unwrap_err();

    assert_eq!(err, Error::NotConnected);
    assert_eq!(h.notifier.terminal().len(), 1);
}
