//! Platform assembly
//!
//! Wires the ledger, fairness manager, game orchestrator, payments and the
//! Coaster engine around one shared store.

use crate::{
    coaster::{CoasterCore, CoasterEngine, CoasterHandle},
    config::{ConfigLoader, WagerConfig},
    errors::WagerResult,
    fairness::FairnessManager,
    games::GameProcessor,
    hooks::HookRegistry,
    ledger::{Ledger, PaymentService},
    orchestrator::Orchestrator,
    store::{MemoryStore, Store},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Running set of services. The Coaster engine task is live until
/// [`Platform::shutdown`].
pub struct Platform {
    pub config: WagerConfig,
    pub ledger: Arc<Ledger>,
    pub fairness: Arc<FairnessManager>,
    pub orchestrator: Arc<Orchestrator>,
    pub payments: Arc<PaymentService>,
    pub coaster: CoasterHandle,
    coaster_task: JoinHandle<()>,
}

impl Platform {
    pub async fn shutdown(self) {
        self.coaster.shutdown();
        if let Err(e) = self.coaster_task.await {
            error!(error = %e, "Coaster engine task ended abnormally");
        }
    }
}

pub struct PlatformFactory;

impl PlatformFactory {
    /// In-memory platform. Must be called from inside a Tokio runtime.
    pub fn build(config: WagerConfig) -> WagerResult<Platform> {
        Self::build_with(config, Arc::new(MemoryStore::new()), HookRegistry::new())
    }

    pub fn build_with<S>(config: WagerConfig, store: Arc<S>, hooks: HookRegistry) -> WagerResult<Platform>
    where
        S: Store + 'static,
    {
        ConfigLoader::new().validate(&config)?;

        let ledger = Arc::new(Ledger::new());
        let fairness = Arc::new(FairnessManager::new(config.fairness.clone(), store.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            GameProcessor::new(config.games.clone()),
            fairness.clone(),
            ledger.clone(),
            store.clone(),
            hooks,
        ));
        let payments = Arc::new(PaymentService::new(
            config.payments.clone(),
            ledger.clone(),
            store.clone(),
        ));

        let core = CoasterCore::new(
            config.coaster.clone(),
            ledger.clone(),
            store.clone(),
            store,
            Utc::now(),
        );
        let (coaster, coaster_task) = CoasterEngine::spawn(core);

        info!(
            rtp = config.games.rtp,
            coaster_enabled = config.coaster.enabled,
            payments_enabled = config.payments.enabled,
            "Platform assembled"
        );

        Ok(Platform {
            config,
            ledger,
            fairness,
            orchestrator,
            payments,
            coaster,
            coaster_task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_default_platform() {
        let platform = PlatformFactory::build(WagerConfig::default()).unwrap();
        let status = platform.coaster.status().await.unwrap();
        assert!(status.enabled);
        assert_eq!(status.price, platform.config.coaster.baseline_price);
        platform.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = WagerConfig::default();
        config.games.rtp = 1.5;
        assert!(PlatformFactory::build(config).is_err());
    }
}
