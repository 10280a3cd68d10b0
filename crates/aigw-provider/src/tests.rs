use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::{BackendCaller, BackendError, ByteStream};
use crate::config::{PoolSettings, ProviderConfig};
use crate::health::HealthChecker;
use crate::manager::{ModelFallback, ProviderPoolManager, SelectOptions};
use crate::persist::{PersistError, PoolFileStore, PoolStore};

fn account(name: &str) -> ProviderConfig {
    let mut config = ProviderConfig::new(Uuid::new_v4());
    config.custom_name = Some(name.to_string());
    config.credential = json!({ "apiKey": name });
    config
}

async fn manager_with_pool(
    provider_type: &str,
    configs: Vec<ProviderConfig>,
) -> ProviderPoolManager {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    manager
        .reload(HashMap::from([(provider_type.to_string(), configs)]))
        .await;
    manager
}

// --- selection ---

#[tokio::test]
async fn round_robin_is_fair_and_rotational() {
    let accounts = vec![account("a"), account("b"), account("c")];
    let names: Vec<String> = accounts
        .iter()
        .map(|config| config.custom_name.clone().unwrap())
        .collect();
    let manager = manager_with_pool("gemini-cli-oauth", accounts).await;

    let mut picks = Vec::new();
    for _ in 0..9 {
        let config = manager
            .select_provider("gemini-cli-oauth", None, SelectOptions::default())
            .await
            .expect("candidate available");
        picks.push(config.custom_name.unwrap());
    }

    for name in &names {
        assert_eq!(picks.iter().filter(|pick| *pick == name).count(), 3);
    }
    // Sequence is a rotation of the pool order.
    assert_eq!(picks[0..3], picks[3..6]);
    assert_eq!(picks[3..6], picks[6..9]);
}

#[tokio::test]
async fn excluded_model_never_selected_even_alone() {
    let mut only = account("only");
    only.not_supported_models = vec!["gemini-2.5-pro".to_string()];
    let manager = manager_with_pool("gemini-cli-oauth", vec![only]).await;

    let picked = manager
        .select_provider(
            "gemini-cli-oauth",
            Some("gemini-2.5-pro"),
            SelectOptions::default(),
        )
        .await;
    assert!(picked.is_none());

    // Other models still reach the account.
    assert!(
        manager
            .select_provider(
                "gemini-cli-oauth",
                Some("gemini-2.5-flash"),
                SelectOptions::default(),
            )
            .await
            .is_some()
    );
}

#[tokio::test]
async fn pool_of_three_with_one_exclusion_alternates_the_other_two() {
    let mut second = account("two");
    second.not_supported_models = vec!["gemini-2.5-pro".to_string()];
    let accounts = vec![account("one"), second, account("three")];
    let manager = manager_with_pool("gemini-cli-oauth", accounts).await;

    let mut picks = Vec::new();
    for _ in 0..10 {
        let config = manager
            .select_provider(
                "gemini-cli-oauth",
                Some("gemini-2.5-pro"),
                SelectOptions::default(),
            )
            .await
            .expect("two candidates remain");
        picks.push(config.custom_name.unwrap());
    }

    assert!(picks.iter().all(|pick| pick != "two"));
    assert_eq!(picks.iter().filter(|pick| *pick == "one").count(), 5);
    assert_eq!(picks.iter().filter(|pick| *pick == "three").count(), 5);
    // Strict alternation between the two remaining candidates.
    for window in picks.windows(2) {
        assert_ne!(window[0], window[1]);
    }
}

#[tokio::test]
async fn selection_tracks_usage_unless_skipped() {
    let config = account("a");
    let manager = manager_with_pool("claude-custom", vec![config]).await;

    manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();
    manager
        .select_provider(
            "claude-custom",
            None,
            SelectOptions {
                skip_usage_count: true,
            },
        )
        .await
        .unwrap();

    let stats = manager.get_provider_stats().await;
    assert_eq!(stats[0].total_usage, 1);
}

#[tokio::test]
async fn disabled_accounts_are_excluded_but_keep_health_state() {
    let config = account("a");
    let uuid = config.uuid;
    let manager = manager_with_pool("claude-custom", vec![config]).await;

    manager.disable_provider("claude-custom", uuid).await;
    assert!(
        manager
            .select_provider("claude-custom", None, SelectOptions::default())
            .await
            .is_none()
    );
    assert!(manager.is_all_providers_unhealthy("claude-custom").await);

    manager.enable_provider("claude-custom", uuid).await;
    assert!(
        manager
            .select_provider("claude-custom", None, SelectOptions::default())
            .await
            .is_some()
    );
}

// --- health marking ---

#[tokio::test]
async fn unhealthy_exactly_at_max_error_count() {
    let config = account("a");
    let uuid = config.uuid;
    let manager = manager_with_pool("openai-qwen-oauth", vec![config]).await;

    manager
        .mark_provider_unhealthy("openai-qwen-oauth", uuid, Some("boom 1"))
        .await;
    manager
        .mark_provider_unhealthy("openai-qwen-oauth", uuid, Some("boom 2"))
        .await;
    // One short of the threshold: still selectable.
    assert!(
        manager
            .select_provider("openai-qwen-oauth", None, SelectOptions::default())
            .await
            .is_some()
    );

    manager
        .mark_provider_unhealthy("openai-qwen-oauth", uuid, Some("boom 3"))
        .await;
    assert!(
        manager
            .select_provider("openai-qwen-oauth", None, SelectOptions::default())
            .await
            .is_none()
    );
    assert!(manager.is_all_providers_unhealthy("openai-qwen-oauth").await);
}

#[tokio::test]
async fn mark_healthy_preserves_or_resets_usage_history() {
    let config = account("a");
    let uuid = config.uuid;
    let manager = manager_with_pool("claude-custom", vec![config]).await;

    manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();

    // Routine confirmation: usage history must not be erased.
    manager
        .mark_provider_healthy("claude-custom", uuid, false, Some("claude-3-5-haiku-20241022"))
        .await;
    let stats = manager.get_provider_stats().await;
    assert_eq!(stats[0].total_usage, 2);

    // Explicit recovery wipes the counter.
    manager
        .mark_provider_healthy("claude-custom", uuid, true, None)
        .await;
    let stats = manager.get_provider_stats().await;
    assert_eq!(stats[0].total_usage, 0);
}

#[tokio::test]
async fn mark_healthy_clears_error_state() {
    let config = account("a");
    let uuid = config.uuid;
    let manager = manager_with_pool("claude-custom", vec![config]).await;

    for attempt in 0..3 {
        manager
            .mark_provider_unhealthy("claude-custom", uuid, Some(&format!("err {attempt}")))
            .await;
    }
    assert!(
        manager
            .select_provider("claude-custom", None, SelectOptions::default())
            .await
            .is_none()
    );

    manager
        .mark_provider_healthy("claude-custom", uuid, true, None)
        .await;
    let config = manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .expect("recovered");
    assert_eq!(config.error_count, 0);
    assert!(config.last_error_message.is_none());
}

// --- fallback ---

#[tokio::test]
async fn fallback_chain_skips_other_protocol_families() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let mut qwen = account("qwen");
    qwen.is_healthy = false;
    manager
        .reload(HashMap::from([
            ("openai-qwen-oauth".to_string(), vec![qwen]),
            ("claude-kiro-oauth".to_string(), vec![account("kiro")]),
            ("openai-iflow".to_string(), vec![account("iflow")]),
        ]))
        .await;
    manager
        .set_fallback_chain(
            "openai-qwen-oauth",
            vec!["claude-kiro-oauth".to_string(), "openai-iflow".to_string()],
        )
        .await;

    let selection = manager
        .select_provider_with_fallback(
            "openai-qwen-oauth",
            Some("qwen3-max"),
            SelectOptions::default(),
        )
        .await
        .expect("iflow serves qwen3-max");
    // The healthy Claude-family candidate is never chosen from an
    // OpenAI-family chain.
    assert_eq!(selection.actual_provider_type, "openai-iflow");
    assert!(selection.is_fallback);
    assert_eq!(selection.actual_model, None);
}

#[tokio::test]
async fn fallback_chain_respects_static_model_capability() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let mut qwen = account("qwen");
    qwen.is_healthy = false;
    manager
        .reload(HashMap::from([
            ("openai-qwen-oauth".to_string(), vec![qwen]),
            ("openai-iflow".to_string(), vec![account("iflow")]),
        ]))
        .await;
    manager
        .set_fallback_chain("openai-qwen-oauth", vec!["openai-iflow".to_string()])
        .await;

    // iflow's capability list does not contain this model.
    let selection = manager
        .select_provider_with_fallback(
            "openai-qwen-oauth",
            Some("qwen3-coder-flash"),
            SelectOptions::default(),
        )
        .await;
    assert!(selection.is_none());
}

#[tokio::test]
async fn primary_selection_is_not_a_fallback() {
    let manager = manager_with_pool("openai-qwen-oauth", vec![account("a")]).await;
    let selection = manager
        .select_provider_with_fallback("openai-qwen-oauth", None, SelectOptions::default())
        .await
        .unwrap();
    assert!(!selection.is_fallback);
    assert_eq!(selection.actual_provider_type, "openai-qwen-oauth");
}

#[tokio::test]
async fn model_mapping_rewrites_model_when_chain_is_exhausted() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let mut custom = account("custom");
    custom.is_healthy = false;
    manager
        .reload(HashMap::from([
            ("openai-custom".to_string(), vec![custom]),
            ("claude-kiro-oauth".to_string(), vec![account("kiro")]),
        ]))
        .await;
    manager
        .set_model_fallback(
            "gpt-5",
            ModelFallback {
                provider_type: "claude-kiro-oauth".to_string(),
                model: "claude-sonnet-4-5".to_string(),
            },
        )
        .await;

    let selection = manager
        .select_provider_with_fallback("openai-custom", Some("gpt-5"), SelectOptions::default())
        .await
        .expect("mapping target is healthy");
    assert_eq!(selection.actual_provider_type, "claude-kiro-oauth");
    assert_eq!(selection.actual_model.as_deref(), Some("claude-sonnet-4-5"));
    assert!(selection.is_fallback);
}

#[tokio::test]
async fn model_mapping_walks_target_chain_with_family_guard() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let mut custom = account("custom");
    custom.is_healthy = false;
    let mut kiro = account("kiro");
    kiro.is_healthy = false;
    manager
        .reload(HashMap::from([
            ("openai-custom".to_string(), vec![custom]),
            ("claude-kiro-oauth".to_string(), vec![kiro]),
            ("claude-custom".to_string(), vec![account("cc")]),
        ]))
        .await;
    manager
        .set_model_fallback(
            "gpt-5",
            ModelFallback {
                provider_type: "claude-kiro-oauth".to_string(),
                model: "claude-sonnet-4-5".to_string(),
            },
        )
        .await;
    manager
        .set_fallback_chain("claude-kiro-oauth", vec!["claude-custom".to_string()])
        .await;

    let selection = manager
        .select_provider_with_fallback("openai-custom", Some("gpt-5"), SelectOptions::default())
        .await
        .expect("target's own chain serves the mapped model");
    assert_eq!(selection.actual_provider_type, "claude-custom");
    assert_eq!(selection.actual_model.as_deref(), Some("claude-sonnet-4-5"));
}

#[tokio::test]
async fn exhaustion_surfaces_a_structured_error() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let err = manager
        .require_provider("openai-custom", Some("gpt-5"), SelectOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, aigw_common::ErrorCode::NoProviderAvailable);
    assert!(err.message.contains("openai-custom"));
    assert!(err.message.contains("gpt-5"));
}

#[tokio::test]
async fn exhausted_fallback_returns_none() {
    let manager = ProviderPoolManager::new(PoolSettings::default());
    let mut only = account("only");
    only.is_healthy = false;
    manager
        .reload(HashMap::from([("openai-custom".to_string(), vec![only])]))
        .await;

    assert!(
        manager
            .select_provider_with_fallback("openai-custom", Some("gpt-5"), SelectOptions::default())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn reload_resets_round_robin_cursors() {
    let accounts = vec![account("a"), account("b")];
    let snapshot = accounts.clone();
    let manager = manager_with_pool("claude-custom", accounts).await;

    let first = manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();
    manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();
    manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();

    manager
        .reload(HashMap::from([("claude-custom".to_string(), snapshot)]))
        .await;
    let after_reload = manager
        .select_provider("claude-custom", None, SelectOptions::default())
        .await
        .unwrap();
    assert_eq!(after_reload.custom_name, first.custom_name);
}

// --- persistence ---

#[derive(Default)]
struct CountingStore {
    doc: Mutex<serde_json::Map<String, JsonValue>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicUsize,
}

impl CountingStore {
    fn with_doc(doc: serde_json::Map<String, JsonValue>) -> Self {
        Self {
            doc: Mutex::new(doc),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PoolStore for CountingStore {
    async fn read(&self) -> Result<serde_json::Map<String, JsonValue>, PersistError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.doc.lock().await.clone())
    }

    async fn write(&self, doc: serde_json::Map<String, JsonValue>) -> Result<(), PersistError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) > 0 {
            self.fail_writes.fetch_sub(1, Ordering::SeqCst);
            return Err(PersistError::Io(std::io::Error::other("disk full")));
        }
        *self.doc.lock().await = doc;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_mutations_into_one_read_modify_write() {
    let gemini = vec![account("g1"), account("g2")];
    let kiro = vec![account("k1")];
    let kiro_uuid = kiro[0].uuid;

    let mut doc = serde_json::Map::new();
    doc.insert(
        "gemini-cli-oauth".to_string(),
        serde_json::to_value(&gemini).unwrap(),
    );
    doc.insert(
        "claude-kiro-oauth".to_string(),
        serde_json::to_value(&kiro).unwrap(),
    );
    // A type owned by some other tool; must survive the flush untouched.
    doc.insert(
        "other-type".to_string(),
        json!([{ "uuid": "00000000-0000-0000-0000-00000000aaaa", "vendorSpecific": true }]),
    );

    let store = Arc::new(CountingStore::with_doc(doc));
    let manager = ProviderPoolManager::load_from_store(
        store.clone(),
        PoolSettings {
            save_debounce: Duration::from_millis(1000),
            ..PoolSettings::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    // Burst of mutations across two types inside one debounce window.
    for _ in 0..4 {
        manager
            .select_provider("gemini-cli-oauth", None, SelectOptions::default())
            .await
            .unwrap();
    }
    manager
        .mark_provider_unhealthy("claude-kiro-oauth", kiro_uuid, Some("upstream 500"))
        .await;

    tokio::time::sleep(Duration::from_millis(2500)).await;

    // One read-modify-write covering both dirty types.
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    let doc = store.doc.lock().await.clone();
    let gemini_entries: Vec<ProviderConfig> =
        serde_json::from_value(doc["gemini-cli-oauth"].clone()).unwrap();
    assert_eq!(
        gemini_entries.iter().map(|entry| entry.usage_count).sum::<u64>(),
        4
    );
    let kiro_entries: Vec<ProviderConfig> =
        serde_json::from_value(doc["claude-kiro-oauth"].clone()).unwrap();
    assert_eq!(kiro_entries[0].error_count, 1);
    assert_eq!(
        kiro_entries[0].last_error_message.as_deref(),
        Some("upstream 500")
    );
    // Untouched foreign entry, unknown fields included.
    assert_eq!(doc["other-type"][0]["vendorSpecific"], true);
}

#[tokio::test(start_paused = true)]
async fn failed_flush_keeps_pending_set_and_retries() {
    let store = Arc::new(CountingStore::default());
    store.fail_writes.store(1, Ordering::SeqCst);

    let manager = ProviderPoolManager::new(PoolSettings {
        save_debounce: Duration::from_millis(1000),
        ..PoolSettings::default()
    });
    manager.spawn_persistence(store.clone());

    manager.add_provider("claude-custom", account("a")).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;

    // First attempt failed, the retry carried the same data through.
    assert!(store.writes.load(Ordering::SeqCst) >= 2);
    let doc = store.doc.lock().await.clone();
    assert!(doc.contains_key("claude-custom"));
}

#[tokio::test]
async fn pool_file_store_round_trips_atomically() {
    let path = std::env::temp_dir().join(format!("aigw-pools-{}.json", Uuid::new_v4()));
    let store = PoolFileStore::new(&path);

    let mut doc = serde_json::Map::new();
    doc.insert(
        "gemini-cli-oauth".to_string(),
        serde_json::to_value(vec![account("g")]).unwrap(),
    );
    store.write(doc).await.unwrap();

    let pools = store.load().await.unwrap();
    assert_eq!(pools["gemini-cli-oauth"].len(), 1);
    assert_eq!(
        pools["gemini-cli-oauth"][0].custom_name.as_deref(),
        Some("g")
    );

    tokio::fs::remove_file(&path).await.unwrap();
    // Missing file reads as an empty pool set.
    assert!(store.load().await.unwrap().is_empty());
}

// --- health checking ---

struct ScriptedCaller {
    calls: AtomicUsize,
    fail_next: AtomicUsize,
}

impl ScriptedCaller {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BackendCaller for ScriptedCaller {
    async fn generate(
        &self,
        _provider_type: &str,
        _config: &ProviderConfig,
        _model: &str,
        _body: JsonValue,
    ) -> Result<JsonValue, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(BackendError::http(503, "upstream unavailable"));
        }
        Ok(json!({ "ok": true }))
    }

    async fn generate_stream(
        &self,
        _provider_type: &str,
        _config: &ProviderConfig,
        _model: &str,
        _body: JsonValue,
    ) -> Result<ByteStream, BackendError> {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(rx)
    }
}

#[tokio::test]
async fn accounts_not_opted_in_are_skipped_unless_forced() {
    let caller = Arc::new(ScriptedCaller::new());
    let checker = HealthChecker::new(caller.clone(), Duration::from_secs(5));

    let config = account("a");
    assert!(
        checker
            .check_provider_health("claude-custom", &config, false)
            .await
            .is_none()
    );
    assert_eq!(caller.calls.load(Ordering::SeqCst), 0);

    let report = checker
        .check_provider_health("claude-custom", &config, true)
        .await
        .expect("forced probe runs");
    assert!(report.success);
    assert_eq!(report.model, "claude-3-5-haiku-20241022");
}

#[tokio::test]
async fn unknown_provider_type_is_an_explicit_failure() {
    let checker = HealthChecker::new(Arc::new(ScriptedCaller::new()), Duration::from_secs(5));
    let mut config = account("a");
    config.check_health = true;

    let report = checker
        .check_provider_health("mystery-backend", &config, false)
        .await
        .expect("failure, not healthy-by-default");
    assert!(!report.success);
    assert!(
        report
            .error_message
            .unwrap()
            .contains("no default health-check model")
    );
}

#[tokio::test]
async fn dual_format_probe_falls_back_to_second_shape() {
    let caller = Arc::new(ScriptedCaller::new());
    caller.fail_next.store(1, Ordering::SeqCst);
    let checker = HealthChecker::new(caller.clone(), Duration::from_secs(5));

    let mut config = account("a");
    config.check_health = true;
    let report = checker
        .check_provider_health("openai-iflow", &config, false)
        .await
        .unwrap();
    assert!(report.success);
    // First (chat) shape failed, second (contents) shape succeeded.
    assert_eq!(caller.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn sweep_marks_failures_and_respects_cooldown() {
    let caller = Arc::new(ScriptedCaller::new());
    caller.fail_next.store(100, Ordering::SeqCst);
    let checker = HealthChecker::new(caller.clone(), Duration::from_secs(5));

    let mut config = account("a");
    config.check_health = true;
    let uuid = config.uuid;
    let manager = manager_with_pool("openai-qwen-oauth", vec![config]).await;

    // Threshold is three consecutive failures.
    for _ in 0..3 {
        manager.perform_health_checks(&checker, false).await;
    }
    assert!(manager.is_all_providers_unhealthy("openai-qwen-oauth").await);

    // Unhealthy and inside the cooldown window: the next sweep must not
    // probe again.
    let probes_so_far = caller.calls.load(Ordering::SeqCst);
    manager.perform_health_checks(&checker, false).await;
    assert_eq!(caller.calls.load(Ordering::SeqCst), probes_so_far);

    // Recovery goes through the reset-usage path.
    caller.fail_next.store(0, Ordering::SeqCst);
    manager.perform_health_checks(&checker, true).await;
    let recovered = manager
        .select_provider("openai-qwen-oauth", None, SelectOptions::default())
        .await
        .expect("healthy again");
    assert_eq!(recovered.uuid, uuid);
    assert_eq!(recovered.error_count, 0);
    assert_eq!(recovered.last_health_check_model.as_deref(), Some("qwen3-coder-flash"));
}

#[tokio::test]
async fn failed_probe_still_stamps_health_check_fields() {
    let caller = Arc::new(ScriptedCaller::new());
    caller.fail_next.store(100, Ordering::SeqCst);
    let checker = HealthChecker::new(caller, Duration::from_secs(5));

    let mut config = account("a");
    config.check_health = true;
    let manager = manager_with_pool("gemini-cli-oauth", vec![config]).await;

    manager.perform_health_checks(&checker, false).await;

    let stats_config = manager
        .select_provider("gemini-cli-oauth", None, SelectOptions::default())
        .await
        .expect("one failure does not unhealth the account");
    assert_eq!(stats_config.error_count, 1);
    assert!(stats_config.last_health_check_time.is_some());
    assert_eq!(
        stats_config.last_health_check_model.as_deref(),
        Some("gemini-2.5-flash")
    );
    assert!(
        stats_config
            .last_error_message
            .unwrap()
            .contains("upstream unavailable")
    );
}
