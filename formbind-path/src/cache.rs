use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::TypeId;
use core::fmt;
use std::collections::HashMap;
use std::sync::LazyLock;

use formbind_core::Shape;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{Path, PathError, parse_path};

type Resolved = Result<Arc<Path>, PathError>;

/// Memoizes [`parse_path`] per type and key.
///
/// Both valid paths and errors are kept, so an unknown key costs one walk
/// no matter how many times it is submitted. Entries are never evicted:
/// the number of distinct keys is bounded by the types a program binds.
///
/// Two threads that miss on the same key at once both parse it and the
/// last one to finish wins. Since parsing only looks at shapes, both
/// results are identical.
#[derive(Default)]
pub struct PathCache {
    entries: RwLock<HashMap<TypeId, HashMap<Box<str>, Resolved>>>,
}

static GLOBAL: LazyLock<PathCache> = LazyLock::new(PathCache::new);

impl PathCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static PathCache {
        &GLOBAL
    }

    /// Resolves `key` against `shape`, parsing it on first use.
    pub fn resolve(&self, key: &str, shape: &'static Shape) -> Result<Arc<Path>, PathError> {
        let id = shape.id();

        // Fast path: read lock only
        if let Some(resolved) = self.lookup(id, key) {
            trace!(key, %shape, "path cache hit");
            return resolved;
        }

        let resolved = parse_path(key, shape).map(Arc::new);
        match &resolved {
            Ok(path) => debug!(key, %shape, steps = path.len(), "caching path"),
            Err(err) => debug!(%err, "caching invalid path"),
        }

        self.entries
            .write()
            .entry(id)
            .or_default()
            .insert(key.into(), resolved.clone());
        resolved
    }

    /// Returns `true` if an outcome for `key` on `shape` is cached.
    pub fn contains(&self, key: &str, shape: &'static Shape) -> bool {
        self.lookup(shape.id(), key).is_some()
    }

    /// Number of cached outcomes, valid or not.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached outcome.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn lookup(&self, id: TypeId, key: &str) -> Option<Resolved> {
        self.entries.read().get(&id)?.get(key).cloned()
    }
}

impl fmt::Debug for PathCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathCache")
            .field("entries", &self.len())
            .finish()
    }
}
