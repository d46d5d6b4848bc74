//! Reads the current value of every allowlisted entity.

use crate::allowlist::Allowlist;
use crate::source::EntitySource;
use cdcsync_codec::Value;
use std::sync::Arc;

/// Current values of monitored entities, in allowlist order.
pub type Entities = Vec<(String, Value)>;

/// Produces current entity values from an [`EntitySource`].
#[derive(Clone)]
pub struct EntityEnumerator {
    source: Arc<dyn EntitySource>,
}

impl EntityEnumerator {
    /// Creates an enumerator over `source`.
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self { source }
    }

    /// Resolves every name in `allowlist`, in order.
    ///
    /// Undefined names map to [`Value::Null`]. The source is only read.
    pub fn enumerate(&self, allowlist: &Allowlist) -> Entities {
        allowlist
            .iter()
            .map(|name| {
                let value = self.source.resolve(name).unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    /// Number of entities `enumerate` would produce, without reading them.
    pub fn count(&self, allowlist: &Allowlist) -> usize {
        allowlist.len()
    }
}

impl std::fmt::Debug for EntityEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityEnumerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;

    #[test]
    fn enumerate_preserves_allowlist_order() {
        let source: MapSource = [
            ("B", Value::Int(2)),
            ("A", Value::Int(1)),
        ]
        .into_iter()
        .collect();
        let enumerator = EntityEnumerator::new(Arc::new(source));
        let allowlist: Allowlist = ["B", "MISSING", "A"].into_iter().collect();

        let entities = enumerator.enumerate(&allowlist);
        assert_eq!(
            entities,
            vec![
                ("B".to_string(), Value::Int(2)),
                ("MISSING".to_string(), Value::Null),
                ("A".to_string(), Value::Int(1)),
            ]
        );
        assert_eq!(enumerator.count(&allowlist), 3);
    }

    #[test]
    fn enumerate_empty_allowlist() {
        let enumerator = EntityEnumerator::new(Arc::new(MapSource::new()));
        assert!(enumerator.enumerate(&Allowlist::new()).is_empty());
        assert_eq!(enumerator.count(&Allowlist::new()), 0);
    }
}
