//! Detector assembly.
//!
//! Builds the resolvers, cache warmer, validation engine and batch
//! processor from one [`DetectorConfig`] and a set of collaborators, so the
//! warmer and processor share the same caches and in-flight registries.

use std::sync::Arc;

use fraudscreen_resolver::{CacheWarmer, Resolvers, WarmReport};
use fraudscreen_types::{
    Account, ClassificationSink, Clock, CycleOutcome, DetectorConfig, Device, EntityService,
    Identity, Result, TransactionStore, UnverifiedSource,
};
use fraudscreen_validation::{FraudHistoryIndex, ValidationEngine};

use crate::processor::BatchProcessor;

/// Every external dependency the detector talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identities: Arc<dyn EntityService<Identity>>,
    pub accounts: Arc<dyn EntityService<Account>>,
    pub devices: Arc<dyn EntityService<Device>>,
    pub store: Arc<dyn TransactionStore>,
    pub source: Arc<dyn UnverifiedSource>,
    pub sink: Arc<dyn ClassificationSink>,
    pub clock: Arc<dyn Clock>,
}

/// A fully wired screening pipeline.
pub struct Detector {
    config: DetectorConfig,
    resolvers: Resolvers,
    warmer: CacheWarmer,
    processor: BatchProcessor,
}

impl Detector {
    /// Validate `config` and wire the pipeline.
    ///
    /// # Errors
    /// [`FraudError::Configuration`](fraudscreen_types::FraudError::Configuration)
    /// if the config is unusable.
    pub fn new(config: DetectorConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let resolvers = Resolvers::new(
            collaborators.identities,
            collaborators.accounts,
            collaborators.devices,
            &config,
        );
        let warmer = CacheWarmer::new(
            resolvers.clone(),
            Arc::clone(&collaborators.store),
            Arc::clone(&collaborators.clock),
            config.warm_window,
        );
        let engine = ValidationEngine::new(
            FraudHistoryIndex::new(Arc::clone(&collaborators.store)),
            &config.rules,
            collaborators.clock,
        );
        let processor = BatchProcessor::new(
            collaborators.source,
            collaborators.sink,
            collaborators.store,
            resolvers.clone(),
            engine,
            config.batch_size,
        );

        tracing::info!(
            batch_size = config.batch_size,
            interval_ms = config.cycle_interval.as_millis(),
            cache_ttl_secs = config.cache.ttl.as_secs(),
            "Detector assembled"
        );

        Ok(Self {
            config,
            resolvers,
            warmer,
            processor,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    pub fn processor(&self) -> &BatchProcessor {
        &self.processor
    }

    /// Best-effort cache warm-up. Never fails.
    pub fn warm(&self) -> WarmReport {
        self.warmer.warm()
    }

    pub fn run_cycle(&self) -> Result<CycleOutcome> {
        self.processor.run_cycle()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fraudscreen_types::{FraudError, SystemClock};

    use super::*;
    use crate::memory::{
        InMemoryEntityService, InMemoryQueue, InMemoryTransactionStore, RecordingSink,
    };

    fn collaborators() -> Collaborators {
        Collaborators {
            identities: Arc::new(InMemoryEntityService::<Identity>::new()),
            accounts: Arc::new(InMemoryEntityService::<Account>::new()),
            devices: Arc::new(InMemoryEntityService::<Device>::new()),
            store: Arc::new(InMemoryTransactionStore::new()),
            source: Arc::new(InMemoryQueue::new()),
            sink: Arc::new(RecordingSink::new()),
            clock: Arc::new(SystemClock),
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = DetectorConfig {
            batch_size: 0,
            ..DetectorConfig::default()
        };
        let err = Detector::new(config, collaborators()).err();
        assert!(matches!(err, Some(FraudError::Configuration(_))));
    }

    #[test]
    fn idle_pipeline_warms_and_idles() {
        let detector = Detector::new(DetectorConfig::default(), collaborators()).unwrap();
        let report = detector.warm();
        assert_eq!(report.transactions, 0);
        assert!(!report.failed);
        assert_eq!(detector.run_cycle().unwrap(), CycleOutcome::Idle);
        assert_eq!(detector.config().cycle_interval, Duration::from_millis(1_000));
    }
}
