//! Animation descriptor cache
//!
//! Pure memoization keyed by the semantic inputs of a spin. A miss can always
//! recompute the identical descriptor, so the cache only saves work.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::Serialize;
use serde_json::Value;

use crate::error::SpinError;

pub use crate::plan::AnimationDescriptor;

/// Rebuild objects with sorted keys, recursively
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Stable key for `(kind, params)`; field order never matters
pub fn generate_key<P: Serialize + ?Sized>(kind: &str, params: &P) -> Result<String, SpinError> {
    let value = serde_json::to_value(params).map_err(|e| SpinError::KeySerialization(e.to_string()))?;
    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SpinError::KeySerialization(e.to_string()))?;
    Ok(format!("{kind}:{json}"))
}

/// Descriptor memo with optional LRU cap
#[derive(Debug, Default)]
pub struct AnimationCache {
    entries: HashMap<String, AnimationDescriptor>,
    /// Least recently used first
    recency: VecDeque<String>,
    capacity: Option<usize>,
    hits: u64,
    misses: u64,
}

impl AnimationCache {
    /// Unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache that evicts the least recently used entry past `capacity`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&AnimationDescriptor> {
        if self.entries.contains_key(key) {
            self.hits += 1;
            self.touch(key);
            self.entries.get(key)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn set(&mut self, key: String, descriptor: AnimationDescriptor) {
        if self.entries.insert(key.clone(), descriptor).is_some() {
            self.touch(&key);
            return;
        }
        self.recency.push_back(key);
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                let Some(oldest) = self.recency.pop_front() else { break };
                self.entries.remove(&oldest);
                log::debug!("Evicted animation descriptor {oldest}");
            }
        }
    }

    /// Cached descriptor, or compute, store and return it
    pub fn get_or_try_insert_with<F>(&mut self, key: &str, compute: F) -> Result<AnimationDescriptor, SpinError>
    where
        F: FnOnce() -> Result<AnimationDescriptor, SpinError>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit.clone());
        }
        let descriptor = compute()?;
        self.set(key.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanRequest, plan_spin};
    use crate::profile::{ProfileName, ProfileSet};
    use proptest::prelude::*;
    use serde_json::json;

    fn request(outcome: &str) -> PlanRequest {
        PlanRequest {
            outcomes: vec![outcome.to_string()],
            profiles: vec![ProfileName::RegularSpin],
            stagger_ms: None,
            symbols: vec!["Pistol".into(), "SMG".into(), "LMG".into()],
        }
    }

    #[test]
    fn test_key_ignores_field_order() {
        let a = generate_key("wheel", &json!({ "outcome": 7, "duration": 3000, "nested": { "b": 1, "a": 2 } }))
            .unwrap();
        let b = generate_key("wheel", &json!({ "nested": { "a": 2, "b": 1 }, "duration": 3000, "outcome": 7 }))
            .unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("wheel:"));
    }

    #[test]
    fn test_key_separates_kinds() {
        let params = json!({ "outcome": 7 });
        assert_ne!(
            generate_key("wheel", &params).unwrap(),
            generate_key("slot", &params).unwrap()
        );
    }

    #[test]
    fn test_hit_matches_fresh_computation() {
        let profiles = ProfileSet::builtin();
        let req = request("SMG");
        let key = req.cache_key().unwrap();
        let mut cache = AnimationCache::new();

        let first = cache.get_or_try_insert_with(&key, || plan_spin(&req, &profiles)).unwrap();
        let second = cache
            .get_or_try_insert_with(&key, || panic!("should be a cache hit"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second, plan_spin(&req, &profiles).unwrap());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = AnimationCache::new();
        let result = cache.get_or_try_insert_with("k", || Err(SpinError::Empty));
        assert_eq!(result.unwrap_err(), SpinError::Empty);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let profiles = ProfileSet::builtin();
        let mut cache = AnimationCache::with_capacity(2);
        for outcome in ["Pistol", "SMG"] {
            let req = request(outcome);
            cache.set(req.cache_key().unwrap(), plan_spin(&req, &profiles).unwrap());
        }
        let pistol = request("Pistol").cache_key().unwrap();
        // Touch Pistol so SMG becomes the eviction candidate
        assert!(cache.get(&pistol).is_some());

        let req = request("LMG");
        cache.set(req.cache_key().unwrap(), plan_spin(&req, &profiles).unwrap());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&pistol).is_some());
        assert!(cache.get(&request("SMG").cache_key().unwrap()).is_none());
    }

    proptest! {
        #[test]
        fn key_is_stable(outcome in "[A-Za-z0-9 ]{0,16}", duration in 0u32..20_000) {
            let params = json!({ "outcome": outcome, "duration": duration });
            prop_assert_eq!(generate_key("wheel", &params).unwrap(), generate_key("wheel", &params).unwrap());
        }
    }
}
