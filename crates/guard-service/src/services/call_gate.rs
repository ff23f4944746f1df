//! Call gate - process-wide rate limiter and memoizing cache
//!
//! Every language model call goes through one [`CallGate`]. Results are
//! cached by `(text, schema, system prompt)` for the life of the process,
//! and actual underlying calls are spaced at least `60 / rpm` seconds
//! apart across all callers.
//!
//! The cache and the limiter have separate locks. A cache hit only takes
//! the cache lock briefly, so it never queues behind callers waiting for
//! their slot. The limiter lock covers check, sleep and record of the
//! last-call instant, and is released before the call itself runs.
//! Waiting for a slot is unbounded; `call_timeout` applies to the call.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use guard_common::CallGateConfig;
use guard_core::DomainError;

/// Memoization key of one gated call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    text: String,
    schema: String,
    system_prompt: String,
}

impl CallKey {
    /// Key for a structured call
    pub fn new(text: impl Into<String>, schema: &Value, system_prompt: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            schema: schema.to_string(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Key for a plain text call
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            schema: String::new(),
            system_prompt: String::new(),
        }
    }
}

/// Shared rate limiter and result cache
#[derive(Debug)]
pub struct CallGate {
    interval: Duration,
    call_timeout: Duration,
    cache: Mutex<HashMap<CallKey, Value>>,
    last_call: Mutex<Option<Instant>>,
}

impl CallGate {
    /// Create a gate with an explicit spacing and per-call bound
    pub fn new(interval: Duration, call_timeout: Duration) -> Self {
        Self {
            interval,
            call_timeout,
            cache: Mutex::new(HashMap::new()),
            last_call: Mutex::new(None),
        }
    }

    /// Create a gate from configuration (`interval = 60 / rpm`)
    pub fn from_config(config: &CallGateConfig) -> Self {
        Self::new(config.min_interval(), config.call_timeout())
    }

    /// Minimum spacing between two underlying calls
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of memoized results
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Run `call` through the gate
    ///
    /// With `use_cache`, a previous successful result for `key` is returned
    /// without polling `call`. Otherwise the caller is delayed until the
    /// interval since the last underlying call has elapsed, then `call`
    /// runs under the call timeout. Failed calls are not cached but still
    /// count toward the rate limit. Two concurrent misses on the same key
    /// may both reach the model; the later result wins the cache slot.
    #[instrument(skip_all, fields(use_cache = use_cache))]
    pub async fn execute<F>(&self, key: CallKey, use_cache: bool, call: F) -> Result<Value, DomainError>
    where
        F: Future<Output = Result<Value, DomainError>>,
    {
        if use_cache {
            if let Some(hit) = self.cached(&key).await {
                debug!("Call gate cache hit");
                return Ok(hit);
            }
        }

        {
            let mut last_call = self.last_call.lock().await;
            // Filled while this caller queued for its slot
            if use_cache {
                if let Some(hit) = self.cached(&key).await {
                    debug!("Call gate cache hit after queueing");
                    return Ok(hit);
                }
            }
            if let Some(last) = *last_call {
                let ready_at = last + self.interval;
                let now = Instant::now();
                if ready_at > now {
                    debug!(wait = ?(ready_at - now), "Call gate delaying call");
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            *last_call = Some(Instant::now());
        }

        let result = tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                warn!(timeout = ?self.call_timeout, "Gated call timed out");
                DomainError::Timeout("language model call".into())
            })?;

        if let (true, Ok(value)) = (use_cache, &result) {
            self.cache.lock().await.insert(key, value.clone());
        }
        result
    }

    async fn cached(&self, key: &CallKey) -> Option<Value> {
        self.cache.lock().await.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn gate(rpm: u32) -> CallGate {
        CallGate::from_config(&CallGateConfig {
            requests_per_minute: rpm,
            call_timeout_secs: 600,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_keys_call_once() {
        let gate = gate(10);
        let calls = AtomicUsize::new(0);
        let schema = json!({"required": ["agreed"]});

        for _ in 0..3 {
            let key = CallKey::new("please let me in", &schema, "judge");
            let value = gate
                .execute(key, true, async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"agreed": true}))
                })
                .await
                .unwrap();
            assert_eq!(value["agreed"], true);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.cached_len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_includes_schema_and_prompt() {
        let gate = gate(600);
        let calls = AtomicUsize::new(0);
        let keys = [
            CallKey::new("text", &json!({"a": 1}), "p1"),
            CallKey::new("text", &json!({"a": 2}), "p1"),
            CallKey::new("text", &json!({"a": 1}), "p2"),
        ];

        for key in keys {
            gate.execute(key, true, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncached_calls_always_run() {
        let gate = gate(600);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            gate.execute(CallKey::text("welcome"), false, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("hi"))
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(gate.cached_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_by_interval() {
        let gate = gate(10);
        assert_eq!(gate.interval(), Duration::from_secs(6));

        let mut started = Vec::new();
        for i in 0..4 {
            let value = gate
                .execute(CallKey::text(format!("msg {i}")), true, async {
                    started.push(Instant::now());
                    Ok(Value::Null)
                })
                .await;
            assert!(value.is_ok());
        }

        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(6));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_holds_across_tasks() {
        let gate = Arc::new(gate(10));
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let started = Arc::clone(&started);
                tokio::spawn(async move {
                    gate.execute(CallKey::text(format!("task {i}")), true, async move {
                        started.lock().unwrap().push(Instant::now());
                        Ok(Value::Null)
                    })
                    .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut started = started.lock().unwrap().clone();
        started.sort();
        assert_eq!(started.len(), 3);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(6));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_count_but_are_not_cached() {
        let gate = gate(10);
        let calls = AtomicUsize::new(0);
        let key = CallKey::text("flaky");

        let first = gate
            .execute(key.clone(), true, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::LlmError("boom".into()))
            })
            .await;
        assert!(first.is_err());

        let before = Instant::now();
        let second = gate
            .execute(key, true, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("ok"))
            })
            .await;
        assert!(second.is_ok());
        assert!(Instant::now() - before >= Duration::from_secs(6));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_longer_than_timeout_is_delayed_not_dropped() {
        // 12 calls at 6s spacing queue for 66s, past the 60s call bound
        let gate = Arc::new(CallGate::from_config(&CallGateConfig {
            requests_per_minute: 10,
            call_timeout_secs: 60,
        }));
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let started = Arc::clone(&started);
                tokio::spawn(async move {
                    gate.execute(CallKey::text(format!("applicant {i}")), true, async move {
                        started.lock().unwrap().push(Instant::now());
                        Ok(json!({"agreed": true}))
                    })
                    .await
                })
            })
            .collect();

        let mut failures = 0;
        for handle in handles {
            if handle.await.unwrap().is_err() {
                failures += 1;
            }
        }

        assert_eq!(failures, 0);
        let mut started = started.lock().unwrap().clone();
        started.sort();
        assert_eq!(started.len(), 12);
        assert!(started[11] - started[0] >= Duration::from_secs(66));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_does_not_wait_for_queued_callers() {
        let gate = Arc::new(gate(10));
        gate.execute(CallKey::text("cached"), true, async { Ok(json!("first")) })
            .await
            .unwrap();

        // Holds the limiter until its 6s slot opens
        let other = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                gate.execute(CallKey::text("other"), true, async { Ok(json!("second")) })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let before = Instant::now();
        let hit = gate
            .execute(CallKey::text("cached"), true, async {
                Err(DomainError::LlmError("must not be called".into()))
            })
            .await
            .unwrap();

        assert_eq!(hit, json!("first"));
        assert_eq!(Instant::now() - before, Duration::ZERO);
        other.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let gate = CallGate::new(Duration::from_secs(1), Duration::from_secs(5));

        let result = gate
            .execute(CallKey::text("slow"), true, async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Value::Null)
            })
            .await;

        assert!(matches!(result, Err(DomainError::Timeout(_))));
        assert_eq!(gate.cached_len().await, 0);
    }
}
