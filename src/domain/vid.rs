//! Vehicle identity resolution — maps opaque external identifiers
//! (id tags, MAC addresses, vehicle ids, QR codes, ...) onto a single
//! stable internal VID.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

const VID_PREFIX: &str = "VID:";

/// Format the next counter value as `VID:%010X`.
fn format_vid(counter: u64) -> String {
    format!("{VID_PREFIX}{counter:010X}")
}

/// Bidirectional identity table.
///
/// Forward: `(source_type, source_value) -> VID`.
/// Reverse: `VID -> set of (source_type, source_value)`.
///
/// Every forward entry's VID is guaranteed to appear in the reverse table
/// with the same pair — maintained by `resolve` and `merge` together.
pub struct IdentityTable {
    forward: DashMap<(String, String), String>,
    reverse: DashMap<String, Vec<(String, String)>>,
    counter: AtomicU64,
}

/// Shared, reference-counted identity table.
pub type SharedIdentityTable = Arc<IdentityTable>;

impl IdentityTable {
    pub fn new() -> Self {
        Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
            counter: AtomicU64::new(1),
        }
    }

    pub fn shared() -> SharedIdentityTable {
        Arc::new(Self::new())
    }

    /// Resolve `(source_type, source_value)` to a stable VID.
    ///
    /// A value that already looks like a VID (`VID:` prefix) is adopted
    /// verbatim instead of allocating a new counter value.
    pub fn resolve(&self, source_type: &str, source_value: &str) -> String {
        let key = (source_type.to_string(), source_value.to_string());

        // `entry` locks the shard holding this exact key for the duration of
        // the closure, so two concurrent resolves of the same pair can't
        // both decide the pair is absent and allocate distinct VIDs for it.
        let mut newly_allocated = None;
        let vid = self
            .forward
            .entry(key.clone())
            .or_insert_with(|| {
                let vid = if source_value.starts_with(VID_PREFIX) {
                    source_value.to_string()
                } else {
                    let n = self.counter.fetch_add(1, Ordering::SeqCst);
                    format_vid(n)
                };
                newly_allocated = Some(vid.clone());
                vid
            })
            .clone();

        if newly_allocated.is_some() {
            self.reverse.entry(vid.clone()).or_default().push(key);
        }

        vid
    }

    /// Merge `temp_vid` into `permanent_vid`.
    ///
    /// Every `(source_type, source_value)` pair currently resolving to
    /// `temp_vid` is re-pointed at `permanent_vid`; `temp_vid` then has no
    /// entry in the reverse table. A no-op when both ids are equal, and
    /// idempotent — merging an already-merged `temp_vid` a second time is
    /// also a no-op because the reverse entry is gone after the first merge.
    pub fn merge(&self, temp_vid: &str, permanent_vid: &str) {
        if temp_vid == permanent_vid {
            return;
        }

        let Some((_, pairs)) = self.reverse.remove(temp_vid) else {
            return;
        };

        let mut target = self.reverse.entry(permanent_vid.to_string()).or_default();
        for pair in pairs {
            self.forward.insert(pair.clone(), permanent_vid.to_string());
            target.push(pair);
        }
    }

    /// All `(source_type, source_value)` pairs currently resolving to `vid`.
    #[cfg(test)]
    pub fn sources_of(&self, vid: &str) -> Vec<(String, String)> {
        self.reverse
            .get(vid)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_stable() {
        let table = IdentityTable::new();
        let a = table.resolve("id_tag", "TAG1");
        let b = table.resolve("id_tag", "TAG1");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_pairs_get_distinct_vids() {
        let table = IdentityTable::new();
        let a = table.resolve("id_tag", "TAG1");
        let b = table.resolve("id_tag", "TAG2");
        assert_ne!(a, b);
    }

    #[test]
    fn vid_shaped_value_is_adopted_verbatim() {
        let table = IdentityTable::new();
        let vid = table.resolve("vid", "VID:000000002A");
        assert_eq!(vid, "VID:000000002A");
    }

    #[test]
    fn counter_format_is_zero_padded_hex() {
        let table = IdentityTable::new();
        let vid = table.resolve("id_tag", "TAG1");
        assert_eq!(vid, "VID:0000000001");
    }

    #[test]
    fn merge_redirects_future_resolves() {
        let table = IdentityTable::new();
        let temp = table.resolve("mac", "AA:BB:CC:DD:EE:FF");
        let perm = table.resolve("id_tag", "TAG1");
        table.merge(&temp, &perm);

        assert_eq!(table.resolve("mac", "AA:BB:CC:DD:EE:FF"), perm);
        assert!(table.sources_of(&temp).is_empty());
    }

    #[test]
    fn merge_self_is_noop() {
        let table = IdentityTable::new();
        let vid = table.resolve("id_tag", "TAG1");
        table.merge(&vid, &vid);
        assert_eq!(table.resolve("id_tag", "TAG1"), vid);
    }

    #[test]
    fn merge_is_idempotent() {
        let table = IdentityTable::new();
        let temp = table.resolve("mac", "AA:BB:CC:DD:EE:FF");
        let perm = table.resolve("id_tag", "TAG1");
        table.merge(&temp, &perm);
        table.merge(&temp, &perm);
        assert_eq!(table.resolve("mac", "AA:BB:CC:DD:EE:FF"), perm);
    }
}
