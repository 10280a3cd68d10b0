use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use aigw_common::GatewayError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::{protocol_family, supports_model};
use crate::config::{PoolSettings, ProviderConfig};
use crate::health::HealthChecker;
use crate::persist::{DebouncedSaver, PersistError, PoolStore};

/// Round-robin cursors wrap here rather than overflowing.
const CURSOR_WRAP: u64 = 1 << 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    /// Selection without usage bookkeeping (admin probes, dry runs).
    pub skip_usage_count: bool,
}

/// Cross-protocol override keyed by the originally requested model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFallback {
    pub provider_type: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct FallbackSelection {
    pub config: ProviderConfig,
    pub actual_provider_type: String,
    pub is_fallback: bool,
    /// Set when a model-fallback mapping rewrote the outbound model; the
    /// caller must rewrite the request's model field.
    pub actual_model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolTypeStats {
    pub provider_type: String,
    pub total: usize,
    pub healthy: usize,
    pub disabled: usize,
    pub unhealthy: usize,
    pub total_usage: u64,
}

/// Everything behind the manager's single lock. One lock for all pools is
/// the multi-threaded substitute for the source system's event-loop
/// atomicity: cursor advances, health transitions, and usage counters
/// never interleave.
#[derive(Debug, Default)]
pub struct PoolState {
    pub(crate) pools: HashMap<String, Vec<ProviderConfig>>,
    cursors: HashMap<String, u64>,
    fallback_chains: HashMap<String, Vec<String>>,
    model_fallbacks: HashMap<String, ModelFallback>,
}

pub struct ProviderPoolManager {
    state: Arc<RwLock<PoolState>>,
    settings: PoolSettings,
    saver: Arc<DebouncedSaver>,
}

impl ProviderPoolManager {
    pub fn new(settings: PoolSettings) -> Self {
        let saver = Arc::new(DebouncedSaver::new(settings.save_debounce));
        Self {
            state: Arc::new(RwLock::new(PoolState::default())),
            settings,
            saver,
        }
    }

    /// Build a manager from the persisted pool document and start the
    /// debounced flush task against the same store.
    pub async fn load_from_store(
        store: Arc<dyn PoolStore>,
        settings: PoolSettings,
    ) -> Result<Self, PersistError> {
        let doc = store.read().await?;
        let mut pools = HashMap::with_capacity(doc.len());
        for (provider_type, entry) in doc {
            let configs: Vec<ProviderConfig> = serde_json::from_value(entry)?;
            pools.insert(provider_type, configs);
        }

        let manager = Self::new(settings);
        manager.state.write().await.pools = pools;
        manager.spawn_persistence(store);
        Ok(manager)
    }

    /// Start flushing pending mutations to `store`. Without this the
    /// manager runs in-memory only (tests, dry runs).
    pub fn spawn_persistence(&self, store: Arc<dyn PoolStore>) {
        self.saver
            .clone()
            .spawn_flush_task(store, self.state.clone());
    }

    /// Replace every pool wholesale and reset the round-robin cursors.
    /// Invoked by credential auto-linking when new accounts appear.
    pub async fn reload(&self, pools: HashMap<String, Vec<ProviderConfig>>) {
        let types: Vec<String> = {
            let mut state = self.state.write().await;
            let mut types: HashSet<String> = state.pools.keys().cloned().collect();
            types.extend(pools.keys().cloned());
            state.pools = pools;
            state.cursors.clear();
            types.into_iter().collect()
        };
        for provider_type in types {
            self.saver.schedule_immediate(&provider_type).await;
        }
    }

    /// Insert or replace (by uuid) an account in a pool.
    pub async fn add_provider(&self, provider_type: &str, config: ProviderConfig) {
        {
            let mut state = self.state.write().await;
            let pool = state.pools.entry(provider_type.to_string()).or_default();
            match pool.iter_mut().find(|entry| entry.uuid == config.uuid) {
                Some(existing) => *existing = config,
                None => pool.push(config),
            }
        }
        self.saver.schedule_immediate(provider_type).await;
    }

    pub async fn remove_provider(&self, provider_type: &str, uuid: Uuid) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            match state.pools.get_mut(provider_type) {
                Some(pool) => {
                    let before = pool.len();
                    pool.retain(|entry| entry.uuid != uuid);
                    before != pool.len()
                }
                None => false,
            }
        };
        if removed {
            self.saver.schedule_immediate(provider_type).await;
        }
        removed
    }

    /// Round-robin selection among healthy, enabled, model-capable
    /// accounts of one type. Returns a snapshot of the chosen entry.
    pub async fn select_provider(
        &self,
        provider_type: &str,
        requested_model: Option<&str>,
        opts: SelectOptions,
    ) -> Option<ProviderConfig> {
        let snapshot = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let pool = state.pools.get_mut(provider_type)?;

            let candidates: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.is_selectable(requested_model))
                .map(|(index, _)| index)
                .collect();
            if candidates.is_empty() {
                return None;
            }

            // Cursor advances modulo the live candidate count, not pool size.
            let cursor = state
                .cursors
                .entry(provider_type.to_string())
                .or_insert(0);
            let chosen = candidates[(*cursor % candidates.len() as u64) as usize];
            *cursor = (*cursor + 1) % CURSOR_WRAP;

            let entry = &mut pool[chosen];
            if !opts.skip_usage_count {
                entry.last_used = Some(OffsetDateTime::now_utc());
                entry.usage_count += 1;
            }
            entry.clone()
        };

        if !opts.skip_usage_count {
            self.saver.schedule(provider_type).await;
        }
        Some(snapshot)
    }

    /// Two-level fallback selection.
    ///
    /// Priority 1 walks the type's fallback chain (same protocol family,
    /// static model support, cycle-guarded). Priority 2 consults the
    /// model-fallback mapping for the originally requested model, then
    /// that target type's own chain, before giving up.
    pub async fn select_provider_with_fallback(
        &self,
        provider_type: &str,
        requested_model: Option<&str>,
        opts: SelectOptions,
    ) -> Option<FallbackSelection> {
        let primary_family = protocol_family(provider_type);
        let chain = self.get_fallback_chain(provider_type).await;

        let mut tried: HashSet<String> = HashSet::new();
        let mut candidates = vec![provider_type.to_string()];
        candidates.extend(chain);

        for (position, candidate) in candidates.into_iter().enumerate() {
            if !tried.insert(candidate.clone()) {
                continue;
            }
            if !self.has_pool(&candidate).await {
                continue;
            }
            if position > 0 {
                if protocol_family(&candidate) != primary_family {
                    tracing::debug!(
                        candidate = %candidate,
                        "skipping fallback candidate from a different protocol family"
                    );
                    continue;
                }
                if let Some(model) = requested_model
                    && !supports_model(&candidate, model)
                {
                    continue;
                }
            }
            if let Some(config) = self
                .select_provider(&candidate, requested_model, opts)
                .await
            {
                return Some(FallbackSelection {
                    config,
                    is_fallback: position > 0,
                    actual_provider_type: candidate,
                    actual_model: None,
                });
            }
        }

        // Priority 2: model-fallback mapping for the original model name.
        let mapping = {
            let model = requested_model?;
            let state = self.state.read().await;
            state.model_fallbacks.get(model).cloned()?
        };

        if let Some(config) = self
            .select_provider(&mapping.provider_type, Some(&mapping.model), opts)
            .await
        {
            return Some(FallbackSelection {
                config,
                actual_provider_type: mapping.provider_type,
                is_fallback: true,
                actual_model: Some(mapping.model),
            });
        }

        let target_family = protocol_family(&mapping.provider_type);
        tried.insert(mapping.provider_type.clone());
        for candidate in self.get_fallback_chain(&mapping.provider_type).await {
            if !tried.insert(candidate.clone()) {
                continue;
            }
            if !self.has_pool(&candidate).await {
                continue;
            }
            if protocol_family(&candidate) != target_family {
                continue;
            }
            if !supports_model(&candidate, &mapping.model) {
                continue;
            }
            if let Some(config) = self
                .select_provider(&candidate, Some(&mapping.model), opts)
                .await
            {
                return Some(FallbackSelection {
                    config,
                    actual_provider_type: candidate,
                    is_fallback: true,
                    actual_model: Some(mapping.model),
                });
            }
        }

        None
    }

    /// Fallback selection that surfaces exhaustion as the structured
    /// gateway error callers return to clients. The manager never retries
    /// across providers on its own.
    pub async fn require_provider(
        &self,
        provider_type: &str,
        requested_model: Option<&str>,
        opts: SelectOptions,
    ) -> Result<FallbackSelection, GatewayError> {
        self.select_provider_with_fallback(provider_type, requested_model, opts)
            .await
            .ok_or_else(|| GatewayError::no_provider(provider_type, requested_model))
    }

    pub async fn mark_provider_unhealthy(
        &self,
        provider_type: &str,
        uuid: Uuid,
        error_message: Option<&str>,
    ) {
        let found = {
            let mut state = self.state.write().await;
            match find_entry(&mut state, provider_type, uuid) {
                Some(entry) => {
                    let now = OffsetDateTime::now_utc();
                    entry.error_count += 1;
                    entry.last_error_time = Some(now);
                    entry.last_used = Some(now);
                    entry.last_error_message = error_message.map(str::to_string);
                    if entry.error_count >= self.settings.max_error_count {
                        if entry.is_healthy {
                            tracing::warn!(
                                provider_type = %provider_type,
                                uuid = %uuid,
                                error_count = entry.error_count,
                                "marking provider unhealthy"
                            );
                        }
                        entry.is_healthy = false;
                    }
                    true
                }
                None => false,
            }
        };
        if found {
            self.saver.schedule(provider_type).await;
        } else {
            tracing::warn!(provider_type = %provider_type, uuid = %uuid, "mark unhealthy: unknown provider");
        }
    }

    /// `reset_usage_count` distinguishes explicit recovery (true: wipe the
    /// usage counter) from routine still-healthy confirmations (false:
    /// count the probe as usage so history is preserved).
    pub async fn mark_provider_healthy(
        &self,
        provider_type: &str,
        uuid: Uuid,
        reset_usage_count: bool,
        health_check_model: Option<&str>,
    ) {
        let found = {
            let mut state = self.state.write().await;
            match find_entry(&mut state, provider_type, uuid) {
                Some(entry) => {
                    let now = OffsetDateTime::now_utc();
                    entry.is_healthy = true;
                    entry.error_count = 0;
                    entry.last_error_time = None;
                    entry.last_error_message = None;
                    entry.last_health_check_time = Some(now);
                    entry.last_health_check_model = health_check_model.map(str::to_string);
                    if reset_usage_count {
                        entry.usage_count = 0;
                    } else {
                        entry.usage_count += 1;
                        entry.last_used = Some(now);
                    }
                    true
                }
                None => false,
            }
        };
        if found {
            self.saver.schedule(provider_type).await;
        } else {
            tracing::warn!(provider_type = %provider_type, uuid = %uuid, "mark healthy: unknown provider");
        }
    }

    /// Failure-path bookkeeping: health-check fields are stamped even when
    /// the probe failed.
    pub(crate) async fn stamp_health_check(&self, provider_type: &str, uuid: Uuid, model: &str) {
        let found = {
            let mut state = self.state.write().await;
            match find_entry(&mut state, provider_type, uuid) {
                Some(entry) => {
                    entry.last_health_check_time = Some(OffsetDateTime::now_utc());
                    entry.last_health_check_model = Some(model.to_string());
                    true
                }
                None => false,
            }
        };
        if found {
            self.saver.schedule(provider_type).await;
        }
    }

    pub async fn reset_provider_counters(&self, provider_type: &str, uuid: Uuid) {
        let found = {
            let mut state = self.state.write().await;
            match find_entry(&mut state, provider_type, uuid) {
                Some(entry) => {
                    entry.usage_count = 0;
                    entry.error_count = 0;
                    entry.last_error_time = None;
                    entry.last_error_message = None;
                    true
                }
                None => false,
            }
        };
        if found {
            self.saver.schedule(provider_type).await;
        }
    }

    pub async fn disable_provider(&self, provider_type: &str, uuid: Uuid) {
        self.set_disabled(provider_type, uuid, true).await;
    }

    pub async fn enable_provider(&self, provider_type: &str, uuid: Uuid) {
        self.set_disabled(provider_type, uuid, false).await;
    }

    async fn set_disabled(&self, provider_type: &str, uuid: Uuid, disabled: bool) {
        let found = {
            let mut state = self.state.write().await;
            match find_entry(&mut state, provider_type, uuid) {
                Some(entry) => {
                    // Disabling only excludes from selection; health state
                    // is left as-is for when the account comes back.
                    entry.is_disabled = disabled;
                    true
                }
                None => false,
            }
        };
        if found {
            self.saver.schedule_immediate(provider_type).await;
        } else {
            tracing::warn!(provider_type = %provider_type, uuid = %uuid, "enable/disable: unknown provider");
        }
    }

    pub async fn get_provider_stats(&self) -> Vec<PoolTypeStats> {
        let state = self.state.read().await;
        let mut stats: Vec<PoolTypeStats> = state
            .pools
            .iter()
            .map(|(provider_type, pool)| PoolTypeStats {
                provider_type: provider_type.clone(),
                total: pool.len(),
                healthy: pool
                    .iter()
                    .filter(|entry| entry.is_healthy && !entry.is_disabled)
                    .count(),
                disabled: pool.iter().filter(|entry| entry.is_disabled).count(),
                unhealthy: pool.iter().filter(|entry| !entry.is_healthy).count(),
                total_usage: pool.iter().map(|entry| entry.usage_count).sum(),
            })
            .collect();
        stats.sort_by(|a, b| a.provider_type.cmp(&b.provider_type));
        stats
    }

    pub async fn is_all_providers_unhealthy(&self, provider_type: &str) -> bool {
        let state = self.state.read().await;
        match state.pools.get(provider_type) {
            Some(pool) if !pool.is_empty() => pool
                .iter()
                .all(|entry| !entry.is_healthy || entry.is_disabled),
            _ => false,
        }
    }

    pub async fn get_fallback_chain(&self, provider_type: &str) -> Vec<String> {
        let state = self.state.read().await;
        state
            .fallback_chains
            .get(provider_type)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set_fallback_chain(&self, provider_type: &str, chain: Vec<String>) {
        let mut state = self.state.write().await;
        state
            .fallback_chains
            .insert(provider_type.to_string(), chain);
    }

    pub async fn get_model_fallback(&self, model: &str) -> Option<ModelFallback> {
        let state = self.state.read().await;
        state.model_fallbacks.get(model).cloned()
    }

    pub async fn set_model_fallback(&self, model: &str, target: ModelFallback) {
        let mut state = self.state.write().await;
        state.model_fallbacks.insert(model.to_string(), target);
    }

    pub async fn provider_types(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut types: Vec<String> = state.pools.keys().cloned().collect();
        types.sort();
        types
    }

    async fn has_pool(&self, provider_type: &str) -> bool {
        let state = self.state.read().await;
        state.pools.contains_key(provider_type)
    }

    /// Sweep every pool member sequentially (bounded concurrency 1, so a
    /// sweep never bursts provider quotas). Unhealthy members inside the
    /// cooldown window are skipped; one probe failure never aborts the
    /// rest of the sweep.
    pub async fn perform_health_checks(&self, checker: &HealthChecker, is_init: bool) {
        let snapshot: Vec<(String, Vec<ProviderConfig>)> = {
            let state = self.state.read().await;
            state
                .pools
                .iter()
                .map(|(provider_type, pool)| (provider_type.clone(), pool.clone()))
                .collect()
        };

        for (provider_type, pool) in snapshot {
            for config in pool {
                if !config.is_healthy
                    && !is_init
                    && let Some(last_error) = config.last_error_time
                {
                    let elapsed = OffsetDateTime::now_utc() - last_error;
                    if elapsed.whole_seconds()
                        < self.settings.health_check_interval.as_secs() as i64
                    {
                        continue;
                    }
                }

                let Some(report) = checker
                    .check_provider_health(&provider_type, &config, is_init)
                    .await
                else {
                    continue;
                };

                if report.success {
                    // Recovery path always resets usage history.
                    self.mark_provider_healthy(&provider_type, config.uuid, true, Some(&report.model))
                        .await;
                } else {
                    tracing::warn!(
                        provider_type = %provider_type,
                        uuid = %config.uuid,
                        error = report.error_message.as_deref().unwrap_or("unknown"),
                        "health probe failed"
                    );
                    self.mark_provider_unhealthy(
                        &provider_type,
                        config.uuid,
                        report.error_message.as_deref(),
                    )
                    .await;
                    self.stamp_health_check(&provider_type, config.uuid, &report.model)
                        .await;
                }
            }
        }
    }
}

fn find_entry<'a>(
    state: &'a mut PoolState,
    provider_type: &str,
    uuid: Uuid,
) -> Option<&'a mut ProviderConfig> {
    state
        .pools
        .get_mut(provider_type)?
        .iter_mut()
        .find(|entry| entry.uuid == uuid)
}
