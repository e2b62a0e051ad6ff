use crate::error::{StoreError, StoreResult};
use crate::world::item_types::{ItemDefinition, ItemRepository};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counters for definition lookups since the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub served_from_memory: u64,
    pub disk_lookups: u64,
    pub definitions_loaded: u64,
    pub definitions_evicted: u64,
}

impl LookupStats {
    pub fn lookups(&self) -> u64 {
        self.served_from_memory + self.disk_lookups
    }

    /// Share of lookups answered without touching the definition directory.
    pub fn memory_ratio(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.served_from_memory as f64 / total as f64,
        }
    }

    /// Disk lookups that produced no definition.
    pub fn failed_loads(&self) -> u64 {
        self.disk_lookups.saturating_sub(self.definitions_loaded)
    }
}

/// Lazily loads one definition per `<id>.yaml` file, keeping the most
/// recently used ones in memory.
pub struct DefinitionCache {
    cache: LruCache<u32, Arc<ItemDefinition>>,
    backing_path: PathBuf,
    stats: LookupStats,
}

impl DefinitionCache {
    pub fn new(capacity: usize, backing_path: PathBuf) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        DefinitionCache {
            cache: LruCache::new(capacity),
            backing_path,
            stats: LookupStats::default(),
        }
    }

    pub fn backing_path(&self) -> &Path {
        &self.backing_path
    }

    /// Cached definition, loading it from disk on a miss.
    pub fn get_definition(&mut self, id: u32) -> StoreResult<Arc<ItemDefinition>> {
        if let Some(cached) = self.cache.get(&id) {
            self.stats.served_from_memory += 1;
            return Ok(Arc::clone(cached));
        }

        self.stats.disk_lookups += 1;
        let definition = Arc::new(self.load_definition(id)?);
        self.stats.definitions_loaded += 1;

        if let Some((evicted, _)) = self.cache.push(id, Arc::clone(&definition)) {
            if evicted != id {
                self.stats.definitions_evicted += 1;
                tracing::trace!(evicted, "definition evicted");
            }
        }
        Ok(definition)
    }

    fn load_definition(&self, id: u32) -> StoreResult<ItemDefinition> {
        let path = self.backing_path.join(format!("{id}.yaml"));
        if !path.exists() {
            return Err(StoreError::UnknownDefinition(id));
        }
        let content = std::fs::read_to_string(&path).map_err(|err| StoreError::io(&path, err))?;
        let definition: ItemDefinition =
            serde_yaml::from_str(&content).map_err(|err| StoreError::yaml(path.display().to_string(), err))?;
        if definition.id != id {
            return Err(StoreError::Config(format!(
                "{} declares item {} instead of {}",
                path.display(),
                definition.id,
                id
            )));
        }
        Ok(definition)
    }

    pub fn stats(&self) -> &LookupStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = LookupStats::default();
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl ItemRepository for DefinitionCache {
    fn lookup(&mut self, id: u32) -> Option<Arc<ItemDefinition>> {
        match self.get_definition(id) {
            Ok(definition) => Some(definition),
            Err(StoreError::UnknownDefinition(_)) => None,
            Err(err) => {
                tracing::warn!(id, error = %err, "definition load failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_cache(tag: &str, ids: &[u32], capacity: usize) -> DefinitionCache {
        let temp_dir = std::env::temp_dir().join(format!("satchel-defcache-{tag}-{}", std::process::id()));
        fs::create_dir_all(&temp_dir).unwrap();
        for id in ids {
            let content = format!("id: {id}\nname: Item {id}\nsize: 1\n");
            fs::write(temp_dir.join(format!("{id}.yaml")), content).unwrap();
        }
        DefinitionCache::new(capacity, temp_dir)
    }

    #[test]
    fn second_lookup_is_served_from_memory() {
        let mut cache = temp_cache("memory", &[1001], 4);
        assert!(cache.is_empty());

        let first = cache.get_definition(1001).unwrap();
        assert_eq!(first.name, "Item 1001");
        assert_eq!(cache.stats().disk_lookups, 1);
        assert_eq!(cache.stats().served_from_memory, 0);

        let second = cache.get_definition(1001).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().served_from_memory, 1);
        assert_eq!(cache.len(), 1);
        assert!((cache.stats().memory_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn capacity_bounds_residency() {
        let ids = [1, 2, 3, 4, 5];
        let mut cache = temp_cache("evict", &ids, 3);
        for id in ids {
            cache.get_definition(id).unwrap();
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().definitions_evicted, 2);
        assert_eq!(cache.stats().definitions_loaded, 5);

        cache.reset_stats();
        assert_eq!(cache.stats().definitions_loaded, 0);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_definition_is_not_an_error_for_lookup() {
        let mut cache = temp_cache("missing", &[], 2);
        assert!(matches!(cache.get_definition(77), Err(StoreError::UnknownDefinition(77))));
        assert!(cache.lookup(77).is_none());
        assert_eq!(cache.stats().disk_lookups, 2);
        assert_eq!(cache.stats().failed_loads(), 2);
        assert_eq!(cache.stats().lookups(), 2);
    }

    #[test]
    fn mismatched_id_is_rejected() {
        let mut cache = temp_cache("mismatch", &[], 2);
        fs::write(cache.backing_path().join("9.yaml"), "id: 10\nname: Wrong\n").unwrap();
        assert!(matches!(cache.get_definition(9), Err(StoreError::Config(_))));
    }

    #[test]
    fn instantiate_through_repository() {
        let mut cache = temp_cache("instantiate", &[2002], 2);
        let item = cache.instantiate(2002, 3).unwrap();
        assert_eq!(item.id(), 2002);
        assert_eq!(item.charges(), 3);
    }
}
