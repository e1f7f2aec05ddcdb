//! Selection state shared by the canvas, the timeline and the inspector.

use uuid::Uuid;

/// At most one clip is selected at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    clip_id: Option<Uuid>,
}

impl Selection {
    /// Clear the selection.
    pub fn clear(&mut self) {
        self.clip_id = None;
    }

    /// Replace the selection with a single clip.
    pub fn select_clip(&mut self, clip_id: Uuid) {
        self.clip_id = Some(clip_id);
    }

    /// Return the selected clip, if any.
    pub fn clip(&self) -> Option<Uuid> {
        self.clip_id
    }

    pub fn is_selected(&self, clip_id: Uuid) -> bool {
        self.clip_id == Some(clip_id)
    }

    /// Drop the selection if the clip no longer exists.
    /// Returns true if the selection was cleared.
    pub fn retain(&mut self, exists: impl Fn(Uuid) -> bool) -> bool {
        match self.clip_id {
            Some(id) if !exists(id) => {
                self.clip_id = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_replaces_previous() {
        let mut selection = Selection::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        selection.select_clip(a);
        selection.select_clip(b);
        assert_eq!(selection.clip(), Some(b));
        assert!(!selection.is_selected(a));
    }

    #[test]
    fn test_retain_drops_missing_clip() {
        let mut selection = Selection::default();
        let a = Uuid::new_v4();
        selection.select_clip(a);
        assert!(!selection.retain(|id| id == a));
        assert!(selection.retain(|_| false));
        assert_eq!(selection.clip(), None);
    }
}
