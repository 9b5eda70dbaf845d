#![allow(dead_code)]

use async_trait::async_trait;
use blockchain::mock::{MockMetadataSource, MockRpc, MockSigner};
use blockchain::{HoldingsFetcher, SubmitOptions};
use notification::RecordingNotifier;
use shared::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokens::metadata::MetadataBlob;
use tokens::{MetadataStore, ServiceSettings, TokenService};

/// Pins everything under a fixed identifier, or fails every upload
pub struct TestStore {
    cid: Option<String>,
    uploads: AtomicUsize,
}

impl TestStore {
    pub fn pinning(cid: &str) -> Arc<Self> {
        Arc::new(Self {
            cid: Some(cid.to_string()),
            uploads: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            cid: None,
            uploads: AtomicUsize::new(0),
        })
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for TestStore {
    async fn upload(&self, _blob: &MetadataBlob) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.cid
            .clone()
            .ok_or_else(|| Error::MetadataUploadFailed("pinning service unavailable".to_string()))
    }
}

pub struct Harness {
    pub rpc: Arc<MockRpc>,
    pub signer: Arc<MockSigner>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<TestStore>,
    pub service: TokenService,
}

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        submit: SubmitOptions {
            confirm_timeout: Duration::from_millis(200),
            sign_timeout: Duration::from_millis(200),
            ..SubmitOptions::default()
        },
        ..ServiceSettings::default()
    }
}

pub fn harness(rpc: MockRpc, signer: MockSigner, store: Arc<TestStore>) -> Harness {
    harness_with(rpc, signer, store, settings())
}

pub fn harness_with(
    rpc: MockRpc,
    signer: MockSigner,
    store: Arc<TestStore>,
    settings: ServiceSettings,
) -> Harness {
    let rpc = Arc::new(rpc);
    let signer = Arc::new(signer);
    let notifier = Arc::new(RecordingNotifier::new());
    let holdings = Arc::new(HoldingsFetcher::new(rpc.clone(), Arc::new(MockMetadataSource::new())));
    let service = TokenService::new(
        rpc.clone(),
        signer.clone(),
        notifier.clone(),
        store.clone(),
        holdings,
        settings,
    );
    Harness {
        rpc,
        signer,
        notifier,
        store,
        service,
    }
}

pub const ONE_SOL: u64 = 1_000_000_000;
