use crate::{encoding::Mode, layout::RecordLayout, record::Record};
use dashmap::DashMap;
use std::{any::TypeId, sync::Arc};

/// Process-lifetime cache of resolved record layouts, keyed by type and mode.
///
/// Lookups for different types never contend on the same lock for long: the shard
/// guard is dropped before a layout is resolved, so two threads may resolve the same
/// type at once. The first insert wins and both get an identical layout.
#[derive(Debug, Default)]
pub struct LayoutCache {
    layouts: DashMap<(TypeId, Mode), Arc<RecordLayout>>,
}

impl LayoutCache {
    pub fn new() -> Self { Self::default() }

    /// The layout of `R` in `mode`, resolving it on first use.
    pub fn layout<R: Record>(&self, mode: Mode) -> Arc<RecordLayout> {
        let key = (TypeId::of::<R>(), mode);
        if let Some(layout) = self.layouts.get(&key) {
            return Arc::clone(layout.value());
        }

        let info = R::record_info();
        let resolved = Arc::new(RecordLayout::resolve(&info, mode));
        tracing::debug!(record = info.name, ?mode, fields = resolved.len(), "resolved record layout");

        Arc::clone(self.layouts.entry(key).or_insert(resolved).value())
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize { self.layouts.len() }

    pub fn is_empty(&self) -> bool { self.layouts.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use std::thread;

    #[derive(Record, Default)]
    struct Sample {
        pub a: u8,
        pub b: String,
    }

    #[test]
    fn resolved_once_per_mode() {
        let cache = LayoutCache::new();
        assert!(cache.is_empty());
        let first = cache.layout::<Sample>(Mode::Map);
        let second = cache.layout::<Sample>(Mode::Map);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.layout::<Sample>(Mode::Array);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_use() {
        let cache = Arc::new(LayoutCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.layout::<Sample>(Mode::Map).len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2);
        }
        assert_eq!(cache.len(), 1);
    }
}
