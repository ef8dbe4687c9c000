//! Tool Registry (spec §4.4) — maps `(ToolType, name)` to a registered
//! `Tool` implementation, with a small insertion-ordered cache in front of
//! the lookup so repeated resolutions for the same step don't re-walk the
//! registry's maps on every call.

use crate::Tool;
use recipe_core::{EngineError, EngineResult, ToolType};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

const DEFAULT_TOOL_NAME: &str = "default";

fn cache_key(tool_type: ToolType, name: &str) -> String {
    format!("{tool_type}::{name}")
}

struct CacheEntry {
    tool: Arc<dyn Tool>,
    inserted_at: Instant,
}

/// Hand-rolled insertion-ordered cache, evicting the oldest entry once
/// `max_size` is exceeded and lazily dropping entries older than `ttl` on
/// read. Small and dependency-free rather than pulling in the `lru` crate
/// for what is, at registry scale, a handful of entries.
struct ResolveCache {
    order: Vec<String>,
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
    ttl: Duration,
}

impl ResolveCache {
    fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
            max_size,
            ttl,
        }
    }

    fn get(&mut self, key: &str) -> Option<Arc<dyn Tool>> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);
        if expired {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
            return None;
        }
        self.entries.get(key).map(|e| e.tool.clone())
    }

    fn put(&mut self, key: String, tool: Arc<dyn Tool>) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(
            key,
            CacheEntry {
                tool,
                inserted_at: Instant::now(),
            },
        );
        while self.order.len() > self.max_size {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Registration + resolution point for every tool a recipe step can name
/// (spec §4.4). Built-ins register under `name = "default"`; hosts may
/// register named overrides (e.g. a project-specific `shell` sandbox)
/// that `resolve` prefers over the default.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    cache: std::sync::Mutex<ResolveCache>,
}

/// Registry cache tuning (spec §6 `maxCacheSize`/`cacheTimeoutMs`).
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub max_size: usize,
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: 64,
            ttl: Duration::from_secs(300),
        }
    }
}

impl ToolRegistry {
    pub fn new(cache_options: CacheOptions) -> Self {
        Self {
            tools: HashMap::new(),
            cache: std::sync::Mutex::new(ResolveCache::new(
                cache_options.max_size,
                cache_options.ttl,
            )),
        }
    }

    /// Register `tool` under `(tool_type, name)`. Registering the same key
    /// twice replaces the previous entry and invalidates the cache, since a
    /// stale `Arc` would otherwise keep serving the old implementation.
    pub fn register(&mut self, tool_type: ToolType, name: &str, tool: Arc<dyn Tool>) {
        self.tools.insert(cache_key(tool_type, name), tool);
        self.cache.lock().unwrap().clear();
    }

    pub fn register_default(&mut self, tool_type: ToolType, tool: Arc<dyn Tool>) {
        self.register(tool_type, DEFAULT_TOOL_NAME, tool);
    }

    /// Resolve the tool for `tool_type`, preferring an override registered
    /// under `name` and falling back to the default implementation.
    pub fn resolve(&self, tool_type: ToolType, name: Option<&str>) -> EngineResult<Arc<dyn Tool>> {
        let key = cache_key(tool_type, name.unwrap_or(DEFAULT_TOOL_NAME));
        if let Some(cached) = self.cache.lock().unwrap().get(&key) {
            return Ok(cached);
        }

        let resolved = name
            .and_then(|n| self.tools.get(&cache_key(tool_type, n)))
            .or_else(|| self.tools.get(&cache_key(tool_type, DEFAULT_TOOL_NAME)))
            .cloned()
            .ok_or_else(|| EngineError::ToolNotFound {
                tool_type,
                name: name.unwrap_or(DEFAULT_TOOL_NAME).to_string(),
            })?;

        self.cache.lock().unwrap().put(key, resolved.clone());
        Ok(resolved)
    }

    pub fn reset(&mut self) {
        self.tools.clear();
        self.cache.lock().unwrap().clear();
    }

    /// Registry snapshot for the `recipe tools` CLI subcommand (spec §6.1).
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.tools.len(),
            cached: self.cache.lock().unwrap().len(),
        }
    }

    /// Every registered `(toolType, name)` key, sorted, for `recipe tools
    /// list` (spec §6.1).
    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tools.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered: usize,
    pub cached: usize,
}

static GLOBAL_REGISTRY: OnceLock<std::sync::Mutex<ToolRegistry>> = OnceLock::new();

/// Process-wide registry, built with the built-in tools on first access.
/// `OnceLock` rather than `once_cell`: the workspace targets a Rust edition
/// where it is stable std, so no extra dependency is worth pulling in.
pub fn global_registry() -> &'static std::sync::Mutex<ToolRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| std::sync::Mutex::new(crate::builtins::registry_with_builtins()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use recipe_core::{EngineResult, ExecutionContext, Step};
    use serde_json::Value;

    struct StubTool;

    #[async_trait]
    impl Tool for StubTool {
        fn validate(&self, _step: &Step) -> EngineResult<()> {
            Ok(())
        }

        async fn execute(&self, _step: &Step, _ctx: &ExecutionContext) -> EngineResult<Value> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn resolve_falls_back_to_default_when_name_unregistered() {
        let mut registry = ToolRegistry::new(CacheOptions::default());
        registry.register_default(ToolType::Shell, Arc::new(StubTool));
        let resolved = registry.resolve(ToolType::Shell, Some("nonexistent"));
        assert!(resolved.is_ok());
    }

    #[test]
    fn resolve_errors_when_tool_type_never_registered() {
        let registry = ToolRegistry::new(CacheOptions::default());
        let err = registry.resolve(ToolType::Ai, None).unwrap_err();
        assert_eq!(err.kind(), "TOOL_NOT_FOUND");
    }

    #[test]
    fn cache_evicts_oldest_entry_past_capacity() {
        let mut cache = ResolveCache::new(2, Duration::from_secs(60));
        cache.put("a".into(), Arc::new(StubTool));
        cache.put("b".into(), Arc::new(StubTool));
        cache.put("c".into(), Arc::new(StubTool));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn cache_entry_expires_after_ttl() {
        let mut cache = ResolveCache::new(8, Duration::from_millis(0));
        cache.put("a".into(), Arc::new(StubTool));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn registered_keys_are_sorted_tool_type_name_pairs() {
        let mut registry = ToolRegistry::new(CacheOptions::default());
        registry.register_default(ToolType::Ai, Arc::new(StubTool));
        registry.register_default(ToolType::Shell, Arc::new(StubTool));
        assert_eq!(registry.registered_keys(), vec!["ai::default", "shell::default"]);
    }

    #[test]
    fn reset_clears_registrations_and_cache() {
        let mut registry = ToolRegistry::new(CacheOptions::default());
        registry.register_default(ToolType::Shell, Arc::new(StubTool));
        registry.resolve(ToolType::Shell, None).unwrap();
        registry.reset();
        assert_eq!(registry.stats().registered, 0);
        assert_eq!(registry.stats().cached, 0);
    }
}
