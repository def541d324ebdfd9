//! Parsing and validation of composed keys such as `words|uppercase|logger`.

use crate::core::descriptor::{Kind, TypeDescriptor};
use crate::core::error::{CatalogError, Result};
use crate::core::registration::Registration;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

/// Joins the names of a composed key. Illegal inside plain names.
pub const SEPARATOR: char = '|';

pub fn is_composed(key: &str) -> bool {
    key.contains(SEPARATOR)
}

/// Splits a composed key into trimmed segment names.
pub fn split(key: &str) -> Result<Vec<&str>> {
    key.split(SEPARATOR)
        .map(str::trim)
        .enumerate()
        .map(|(position, segment)| {
            if segment.is_empty() {
                Err(CatalogError::InvalidComposition {
                    key: key.to_string(),
                    position,
                    kind: None,
                    reason: "empty segment".to_string(),
                })
            } else {
                Ok(segment)
            }
        })
        .collect()
}

/// The cache key for a split composed key: trimmed segments joined by `|`.
pub(crate) fn canonical(segments: &[&str]) -> String {
    segments.join("|")
}

/// Validates the stage kinds and builds the derived registration.
///
/// Only the first stage may be a source, only the last may be a sink, and
/// everything in between must be a transform.
pub(crate) fn compose(key: &str, stages: Vec<Arc<Registration>>) -> Result<Registration> {
    let (first, last) = match (stages.first(), stages.last()) {
        (Some(first), Some(last)) => (first.descriptor(), last.descriptor()),
        _ => {
            return Err(CatalogError::InvalidComposition {
                key: key.to_string(),
                position: 0,
                kind: None,
                reason: "no stages".to_string(),
            });
        }
    };
    let final_position = stages.len() - 1;

    for (position, stage) in stages.iter().enumerate() {
        let kind = stage.kind();
        let reason = match kind {
            Kind::Transform => continue,
            Kind::Source if position == 0 => continue,
            Kind::Sink if position == final_position => continue,
            Kind::Source => "a source may only appear first",
            Kind::Sink => "a sink may only appear last",
        };
        return Err(CatalogError::InvalidComposition {
            key: key.to_string(),
            position,
            kind: Some(kind),
            reason: reason.to_string(),
        });
    }

    let kind = match (first.kind(), last.kind()) {
        (Kind::Source, _) => Kind::Source,
        (_, Kind::Sink) => Kind::Sink,
        _ => Kind::Transform,
    };
    let descriptor = TypeDescriptor::derived(kind, first.input_shape(), last.output_shape());

    log::debug!("Composed '{}' into {} stages ({})", key, stages.len(), descriptor);
    Ok(Registration::pipeline(key.to_string(), descriptor, stages))
}

/// Derived pipelines keyed by their canonical composed key, so hot keys are
/// parsed and validated once.
///
/// Holds at most `capacity` pipelines and drops the oldest insertion first.
pub(crate) struct CompositionCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    pipelines: HashMap<String, Arc<Registration>>,
    order: VecDeque<String>,
}

impl CompositionCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<Registration>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pipelines
            .get(key)
            .cloned()
    }

    pub(crate) fn insert(&self, key: String, pipeline: Arc<Registration>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.pipelines.contains_key(&key) {
            inner.pipelines.insert(key, pipeline);
            return;
        }
        while inner.pipelines.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.pipelines.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.pipelines.insert(key, pipeline);
    }

    /// Drops every cached pipeline that names `name` as a segment.
    pub(crate) fn evict(&self, name: &str) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let uses = |key: &str| key.split(SEPARATOR).any(|segment| segment == name);

        let before = inner.pipelines.len();
        inner.pipelines.retain(|key, _| !uses(key));
        inner.order.retain(|key| !uses(key));
        let evicted = before - inner.pipelines.len();
        if evicted > 0 {
            log::debug!("Evicted {} cached pipeline(s) using '{}'", evicted, name);
        }
        evicted
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pipelines
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::Shape;
    use crate::core::value::Value;

    fn transform(name: &str) -> Arc<Registration> {
        Arc::new(Registration::transform(Shape::String, Shape::Integer, |v: Value| Ok(v)).named(name.into()))
    }

    fn source(name: &str) -> Arc<Registration> {
        Arc::new(Registration::source(Shape::String, || Ok(Value::from("x"))).named(name.into()))
    }

    fn sink(name: &str) -> Arc<Registration> {
        Arc::new(Registration::sink(Shape::Integer, |_: Value| Ok(())).named(name.into()))
    }

    #[test]
    fn test_split_trims_and_rejects_empty_segments() {
        assert_eq!(split("a | b|c").unwrap(), vec!["a", "b", "c"]);
        match split("a||b").unwrap_err() {
            CatalogError::InvalidComposition { position, kind, .. } => {
                assert_eq!(position, 1);
                assert_eq!(kind, None);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(split("a|").is_err());
    }

    #[test]
    fn test_source_transform_sink_is_closed() {
        let reg = compose("s|t|k", vec![source("s"), transform("t"), sink("k")]).unwrap();
        assert_eq!(reg.kind(), Kind::Source);
        assert_eq!(reg.descriptor().input_tag(), "none");
        assert_eq!(reg.descriptor().output_tag(), "none");
        assert_eq!(reg.stages().len(), 3);
        assert_eq!(reg.name(), "s|t|k");
    }

    #[test]
    fn test_derived_shapes() {
        let reg = compose("t|k", vec![transform("t"), sink("k")]).unwrap();
        assert_eq!(reg.kind(), Kind::Sink);
        assert_eq!(reg.descriptor().input_shape(), Some(Shape::String));

        let reg = compose("s|t", vec![source("s"), transform("t")]).unwrap();
        assert_eq!(reg.kind(), Kind::Source);
        assert_eq!(reg.descriptor().output_shape(), Some(Shape::Integer));
    }

    #[test]
    fn test_source_out_of_position() {
        match compose("t|s", vec![transform("t"), source("s")]).unwrap_err() {
            CatalogError::InvalidComposition { position, kind, .. } => {
                assert_eq!(position, 1);
                assert_eq!(kind, Some(Kind::Source));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sink_out_of_position() {
        let err = compose("k|t", vec![sink("k"), transform("t")]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidComposition { position: 0, kind: Some(Kind::Sink), .. }
        ));
    }

    #[test]
    fn test_cache_eviction_by_segment() {
        let cache = CompositionCache::new(8);
        let pipeline = Arc::new(compose("a|b", vec![transform("a"), transform("b")]).unwrap());
        cache.insert("a|b".into(), pipeline.clone());
        cache.insert("b|c".into(), pipeline);
        assert_eq!(cache.evict("a"), 1);
        assert!(cache.get("a|b").is_none());
        assert!(cache.get("b|c").is_some());
        assert_eq!(cache.evict("b"), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_drops_oldest_at_capacity() {
        let cache = CompositionCache::new(2);
        let pipeline = Arc::new(compose("a|b", vec![transform("a"), transform("b")]).unwrap());
        for key in ["a|b", "b|a", "a|a"] {
            cache.insert(key.into(), Arc::clone(&pipeline));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a|b").is_none());
        assert!(cache.get("a|a").is_some());

        cache.insert("a|a".into(), Arc::clone(&pipeline));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b|a").is_some());

        let disabled = CompositionCache::new(0);
        disabled.insert("a|b".into(), pipeline);
        assert_eq!(disabled.len(), 0);
    }

    #[test]
    fn test_canonical_key_ignores_whitespace() {
        assert_eq!(canonical(&split(" a |b  | c").unwrap()), "a|b|c");
    }
}
