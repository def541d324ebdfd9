use crate::core::composition::{self, CompositionCache, SEPARATOR};
use crate::core::config::{CatalogConfig, RegistrationPolicy};
use crate::core::error::{CatalogError, Result};
use crate::core::invoker::Invoker;
use crate::core::registration::Registration;
use crate::core::telemetry::Telemetry;
use crate::core::value::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entries = HashMap<String, Arc<Registration>>;

/// A concurrent store of [`Registration`]s keyed by name.
///
/// Reads share a read lock and never wait on each other; `register` and
/// `unregister` hold the write lock only for the map mutation. Lookups hand
/// out `Arc<Registration>` snapshots, so invocation happens outside any lock
/// and a pipeline resolved before an `unregister` keeps working.
pub struct FunctionCatalog {
    entries: RwLock<Entries>,
    cache: CompositionCache,
    config: CatalogConfig,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionCatalog {
    /// Creates an empty catalog with the strict registration policy.
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    pub fn with_config(config: CatalogConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            cache: CompositionCache::new(config.max_cached_pipelines),
            config,
            telemetry: None,
        }
    }

    /// Telemetry handed to every [`invoker`](Self::invoker).
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Stores `registration` under `name`.
    pub fn register(&self, name: impl Into<String>, registration: Registration) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        let registration = Arc::new(registration.named(name.clone()));

        let mut entries = self.write_entries();
        self.store(&mut entries, name, registration)
    }

    /// Stores the registration already known as `existing` under `alias` as
    /// well. Both names share one registration.
    pub fn register_alias(&self, existing: &str, alias: impl Into<String>) -> Result<()> {
        let alias = alias.into();
        validate_name(&alias)?;

        let mut entries = self.write_entries();
        let registration = entries
            .get(existing)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                name: existing.to_string(),
            })?;
        self.store(&mut entries, alias, registration)
    }

    fn store(&self, entries: &mut Entries, name: String, registration: Arc<Registration>) -> Result<()> {
        match entries.entry(name) {
            Entry::Vacant(slot) => {
                log::debug!("Registered '{}' ({})", slot.key(), registration.descriptor());
                slot.insert(registration);
            }
            Entry::Occupied(mut slot) => match self.config.policy {
                RegistrationPolicy::Strict => {
                    return Err(CatalogError::DuplicateName {
                        name: slot.key().clone(),
                    });
                }
                RegistrationPolicy::Replace => {
                    log::warn!("Replacing the function registered as '{}'", slot.key());
                    slot.insert(registration);
                    self.cache.evict(slot.key());
                }
            },
        }
        Ok(())
    }

    /// Removes `name`. Absent names are ignored.
    ///
    /// Pipelines already handed out keep their stages; cached pipelines that
    /// name `name` are dropped.
    pub fn unregister(&self, name: &str) -> Option<Arc<Registration>> {
        let mut entries = self.write_entries();
        let removed = entries.remove(name);
        if removed.is_some() {
            self.cache.evict(name);
            log::debug!("Unregistered '{}'", name);
        }
        removed
    }

    /// Resolves a plain name or a composed key such as `words|uppercase`.
    ///
    /// A plain name returns the stored registration itself. An empty name
    /// resolves to the configured default definition, or to the only
    /// registration when exactly one is stored.
    pub fn lookup(&self, name: &str) -> Result<Arc<Registration>> {
        let entries = self.read_entries();
        let key = match name.trim() {
            "" => self.default_definition(&entries)?,
            key => key.to_string(),
        };

        if !composition::is_composed(&key) {
            return entries
                .get(&key)
                .cloned()
                .ok_or(CatalogError::NotFound { name: key });
        }

        let segments = composition::split(&key)?;
        let key = composition::canonical(&segments);
        if self.config.composition_cache {
            if let Some(pipeline) = self.cache.get(&key) {
                return Ok(pipeline);
            }
        }

        let stages = segments
            .into_iter()
            .map(|segment| {
                entries
                    .get(segment)
                    .cloned()
                    .ok_or_else(|| CatalogError::NotFound {
                        name: segment.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let pipeline = Arc::new(composition::compose(&key, stages)?);

        // Inserted under the read lock so a concurrent unregister evicts it.
        if self.config.composition_cache {
            self.cache.insert(key, Arc::clone(&pipeline));
        }
        Ok(pipeline)
    }

    pub(crate) fn default_definition(&self, entries: &Entries) -> Result<String> {
        if let Some(definition) = &self.config.default_definition {
            return Ok(definition.clone());
        }

        // The registration's own name may already be unregistered while an
        // alias keeps it alive, so answer with a key still in the map.
        let mut keys = entries.iter();
        let only = keys
            .next()
            .filter(|(_, first)| keys.all(|(_, reg)| Arc::ptr_eq(first, reg)));
        match only {
            Some((key, _)) => Ok(key.clone()),
            None => Err(CatalogError::NotFound {
                name: String::new(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    /// Every plain name currently registered, aliases included.
    pub fn names(&self) -> BTreeSet<String> {
        self.read_entries().keys().cloned().collect()
    }

    /// Number of plain names currently registered, aliases included.
    pub fn size(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Every name that resolves to the same registration as `name`.
    pub fn aliases_of(&self, name: &str) -> Result<BTreeSet<String>> {
        let entries = self.read_entries();
        let target = entries.get(name).ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
        })?;
        Ok(entries
            .iter()
            .filter(|(_, reg)| Arc::ptr_eq(reg, target))
            .map(|(alias, _)| alias.clone())
            .collect())
    }

    /// An [`Invoker`] configured from this catalog's settings.
    pub fn invoker(&self) -> Invoker {
        let mut invoker = Invoker::new();
        if let Some(accept) = &self.config.default_accept {
            invoker = invoker.with_default_accept(accept.clone());
        }
        if let Some(telemetry) = &self.telemetry {
            invoker = invoker.with_telemetry(Arc::clone(telemetry));
        }
        invoker
    }

    /// Looks up `name` and invokes it. The catalog lock is released before the
    /// unit runs.
    pub fn invoke(
        &self,
        name: &str,
        payload: impl Into<Value>,
        content_type: Option<&str>,
    ) -> Result<Option<Value>> {
        let registration = self.lookup(name)?;
        self.invoker().invoke(&registration, payload, content_type)
    }

    /// Flushes the configured telemetry. Also runs when the catalog drops.
    pub fn flush_telemetry(&self) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.flush();
        }
    }

    pub(crate) fn read_entries(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn cached_pipelines(&self) -> usize {
        self.cache.len()
    }
}

impl Drop for FunctionCatalog {
    fn drop(&mut self) {
        self.flush_telemetry();
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(SEPARATOR) {
        "name contains the composition separator '|'"
    } else if name.trim() != name {
        "name has surrounding whitespace"
    } else {
        return Ok(());
    };
    Err(CatalogError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
