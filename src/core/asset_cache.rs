use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::core::media::{MediaHandle, MediaLoader};
use crate::state::TimelineModel;

/// Per-clip decode handles, kept in step with the timeline's clip set.
pub struct AssetCache {
    handles: HashMap<Uuid, Box<dyn MediaHandle>>,
    /// Clips whose loader produced nothing; not retried until they leave the timeline.
    unloadable: HashSet<Uuid>,
    loader: Box<dyn MediaLoader>,
}

impl AssetCache {
    pub fn new(loader: Box<dyn MediaLoader>) -> Self {
        Self {
            handles: HashMap::new(),
            unloadable: HashSet::new(),
            loader,
        }
    }

    /// Create handles for clips seen for the first time and evict handles
    /// whose clip is gone.
    pub fn sync(&mut self, model: &TimelineModel) {
        let live: HashSet<Uuid> = model.clips().iter().map(|clip| clip.id).collect();

        let stale: Vec<Uuid> = self
            .handles
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(mut handle) = self.handles.remove(&id) {
                handle.pause();
                tracing::debug!(clip_id = %id, "Evicted media handle");
            }
        }
        self.unloadable.retain(|id| live.contains(id));

        for clip in model.clips() {
            if !clip.kind.needs_handle()
                || self.handles.contains_key(&clip.id)
                || self.unloadable.contains(&clip.id)
            {
                continue;
            }
            match self.loader.load(clip, model.clip_asset(clip)) {
                Some(handle) => {
                    tracing::debug!(clip_id = %clip.id, kind = ?clip.kind, "Created media handle");
                    self.handles.insert(clip.id, handle);
                }
                None => {
                    tracing::warn!(clip_id = %clip.id, name = %clip.name, "No media handle for clip");
                    self.unloadable.insert(clip.id);
                }
            }
        }
    }

    pub fn get(&self, clip_id: Uuid) -> Option<&dyn MediaHandle> {
        self.handles.get(&clip_id).map(|handle| handle.as_ref())
    }

    pub fn get_mut(&mut self, clip_id: Uuid) -> Option<&mut (dyn MediaHandle + 'static)> {
        self.handles.get_mut(&clip_id).map(|handle| handle.as_mut())
    }

    pub fn contains(&self, clip_id: Uuid) -> bool {
        self.handles.contains_key(&clip_id)
    }

    /// Let every handle progress by `dt` seconds.
    pub fn pump(&mut self, dt: f64) {
        for handle in self.handles.values_mut() {
            handle.pump(dt);
        }
    }

    pub fn pause_all(&mut self) {
        for handle in self.handles.values_mut() {
            handle.pause();
        }
    }

    pub fn clear(&mut self) {
        self.pause_all();
        self.handles.clear();
        self.unloadable.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
