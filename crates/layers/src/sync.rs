use std::collections::BTreeMap;

use scene::store::EntityStore;
use serde::Serialize;
use tracing::debug;

use crate::marker::{MarkerKey, VisualMarker};
use crate::surface::{MapSurface, SurfaceError};

/// Operations applied by one reconciliation pass.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncStats {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.removed
    }

    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }
}

/// Visual markers the store should currently be shown as.
///
/// Buildings are always present. Features appear only for the selected
/// building and only when `show_features` is set. Analysis markers are
/// present while the store holds them.
pub fn desired_markers(
    store: &EntityStore,
    show_features: bool,
) -> BTreeMap<MarkerKey, VisualMarker> {
    let mut out = BTreeMap::new();
    let selected = store.selected();

    for b in store.buildings() {
        let m = VisualMarker::for_building(b, selected == Some(&b.id));
        out.insert(m.key.clone(), m);
    }

    if show_features && let Some(id) = selected {
        for f in store.features(id) {
            let m = VisualMarker::for_feature(f);
            out.insert(m.key.clone(), m);
        }
    }

    let context = store.selected_building().map(|b| b.name.as_str());
    for a in store.analysis_markers() {
        let m = VisualMarker::for_analysis(a, context);
        out.insert(m.key.clone(), m);
    }

    out
}

/// Keyed reconciler between the entity store and the markers on a
/// [`MapSurface`].
///
/// Remembers, per live marker, the attribute hash it was last rendered with.
/// A pass removes, creates, and updates only what differs, so running it
/// twice without a store change performs no surface calls the second time.
#[derive(Debug, Default)]
pub struct AnnotationSync {
    live: BTreeMap<MarkerKey, blake3::Hash>,
}

impl AnnotationSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.live.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MarkerKey> + '_ {
        self.live.keys()
    }

    /// Reconcile the surface with `store`.
    ///
    /// If the surface is not ready nothing is attempted and nothing is
    /// remembered; the next pass starts from the same state. A create that
    /// hits an existing marker is retried as an update, and an update of a
    /// marker the surface lost is retried as a create. Any other failure
    /// aborts the pass; markers handled before it stay recorded.
    pub fn sync(
        &mut self,
        store: &EntityStore,
        show_features: bool,
        surface: &mut dyn MapSurface,
    ) -> Result<SyncStats, SurfaceError> {
        if !surface.is_ready() {
            return Err(SurfaceError::Unavailable);
        }

        let desired = desired_markers(store, show_features);
        let mut stats = SyncStats::default();

        let stale: Vec<MarkerKey> = self
            .live
            .keys()
            .filter(|k| !desired.contains_key(*k))
            .cloned()
            .collect();
        for key in stale {
            match surface.remove_marker(&key) {
                // Already gone on the renderer side; forget it too.
                Ok(()) | Err(SurfaceError::UnknownMarker(_)) => {}
                Err(e) => return Err(e),
            }
            self.live.remove(&key);
            stats.removed += 1;
        }

        for (key, marker) in &desired {
            let hash = marker.attribute_hash();
            match self.live.get(key) {
                None => match surface.create_marker(marker) {
                    Ok(()) => stats.created += 1,
                    Err(SurfaceError::DuplicateMarker(_)) => {
                        surface.update_marker(marker)?;
                        stats.updated += 1;
                    }
                    Err(e) => return Err(e),
                },
                Some(prev) if *prev != hash => match surface.update_marker(marker) {
                    Ok(()) => stats.updated += 1,
                    Err(SurfaceError::UnknownMarker(_)) => {
                        surface.create_marker(marker)?;
                        stats.created += 1;
                    }
                    Err(e) => return Err(e),
                },
                Some(_) => continue,
            }
            self.live.insert(key.clone(), hash);
        }

        debug!(
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed,
            live = self.live.len(),
            "annotations reconciled"
        );
        Ok(stats)
    }

    /// Remove every live marker from the surface.
    pub fn detach(&mut self, surface: &mut dyn MapSurface) -> Result<usize, SurfaceError> {
        if !surface.is_ready() {
            return Err(SurfaceError::Unavailable);
        }
        let keys: Vec<MarkerKey> = self.live.keys().cloned().collect();
        let mut removed = 0;
        for key in keys {
            match surface.remove_marker(&key) {
                Ok(()) | Err(SurfaceError::UnknownMarker(_)) => {}
                Err(e) => return Err(e),
            }
            self.live.remove(&key);
            removed += 1;
        }
        Ok(removed)
    }

    /// Forget all live markers without touching the surface, e.g. after the
    /// renderer was recreated and lost them.
    pub fn forget(&mut self) {
        self.live.clear();
    }
}
