//! The investigation control plane.
//!
//! Built once at startup from `SleuthConfig` and passed by reference to every
//! caller. Owns the validator, the discovery engine, the result cache and the
//! query coalescer; nothing here is global.

use sleuth_shared::discovery::{DiscoveryEngine, DiscoveryWalk};
use sleuth_shared::phase::DebuggingSession;
use sleuth_shared::safety::{CommandSafetyValidator, CommandValidation};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::coalescer::{QueryCoalescer, SharedResult};
use crate::config::SleuthConfig;

/// Background expiry sweep; aborted when dropped
pub struct SweepTask(JoinHandle<()>);

impl SweepTask {
    pub fn abort(&self) {
        self.0.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ControlPlane {
    config: SleuthConfig,
    validator: CommandSafetyValidator,
    discovery: DiscoveryEngine,
    cache: Arc<ResultCache>,
    coalescer: Arc<QueryCoalescer>,
}

impl ControlPlane {
    pub fn new(config: SleuthConfig) -> Self {
        info!(
            max_entries = config.cache.max_entries,
            ttl_secs = config.cache.ttl_secs,
            grace_ms = config.coalescer.grace_ms,
            "control plane ready"
        );
        Self {
            validator: CommandSafetyValidator::new(config.safety.clone()),
            discovery: DiscoveryEngine::new(),
            cache: Arc::new(ResultCache::from_config(&config.cache)),
            coalescer: Arc::new(QueryCoalescer::from_config(&config.coalescer)),
            config,
        }
    }

    pub fn config(&self) -> &SleuthConfig {
        &self.config
    }

    pub fn validator(&self) -> &CommandSafetyValidator {
        &self.validator
    }

    pub fn discovery(&self) -> &DiscoveryEngine {
        &self.discovery
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn coalescer(&self) -> &Arc<QueryCoalescer> {
        &self.coalescer
    }

    /// Validate a proposed command, logging anything that is not allowed
    pub fn check_command(&self, command: &str) -> CommandValidation {
        let validation = self.validator.validate_command(command);
        if !validation.is_allowed() {
            debug!(
                verdict = validation.verdict.as_str(),
                rule = validation.rule.as_deref().unwrap_or("-"),
                "command not allowed: {}",
                validation.reason
            );
        }
        validation
    }

    /// New session with the configured retry budget
    pub fn session(&self, query: &str) -> DebuggingSession {
        DebuggingSession::new(query, self.config.investigation.max_retries)
    }

    pub fn discovery_walk(&self, resource_name: &str, query_context: &str) -> DiscoveryWalk {
        DiscoveryWalk::new(self.discovery.generate(resource_name, query_context))
    }

    /// Coalesced, cached computation of `query`
    pub async fn investigate<F, Fut>(&self, query: &str, compute: F) -> SharedResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let cache = Arc::clone(&self.cache);
        self.coalescer
            .execute(query, |q| async move {
                cache.get_or_compute(&q, compute).await.map(|(results, _)| results)
            })
            .await
    }

    /// Like `investigate`, with a similarity lookup using `embed` on exact misses
    pub async fn investigate_semantic<F, Fut, E, EFut>(
        &self,
        query: &str,
        compute: F,
        embed: E,
    ) -> SharedResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
        E: FnOnce(String) -> EFut,
        EFut: Future<Output = anyhow::Result<Vec<f32>>>,
    {
        let cache = Arc::clone(&self.cache);
        self.coalescer
            .execute(query, |q| async move {
                cache
                    .get_or_compute_semantic(&q, compute, embed)
                    .await
                    .map(|(results, _)| results)
            })
            .await
    }

    /// Periodic `cleanup_expired`. None when the sweep is disabled.
    pub fn spawn_expiry_sweep(&self) -> Option<SweepTask> {
        let secs = self.config.cache.sweep_interval_secs;
        if secs == 0 {
            return None;
        }
        let cache = Arc::clone(&self.cache);
        let period = Duration::from_secs(secs);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = cache.cleanup_expired().await;
                if removed > 0 {
                    debug!(removed, "expiry sweep");
                }
            }
        });
        Some(SweepTask(handle))
    }
}

impl Default for ControlPlane {
    fn default() -> Self {
        Self::new(SleuthConfig::default())
    }
}
