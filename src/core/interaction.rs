//! Canvas pointer handling: display → canvas mapping, hit-testing and
//! drag-to-move.

use uuid::Uuid;

use crate::constants::{HIT_BOX_MEDIA, HIT_BOX_TEXT};
use crate::state::{Clip, ClipPatch, MediaKind, Selection, TimelineModel};

/// Where the canvas is displayed, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    /// A viewport showing the canvas 1:1 at the origin.
    pub fn identity(canvas: (f32, f32)) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: canvas.0,
            height: canvas.1,
        }
    }

    /// Map a client point into logical canvas coordinates.
    pub fn to_canvas(&self, client_x: f32, client_y: f32, canvas: (f32, f32)) -> (f32, f32) {
        let scale_x = if self.width > 0.0 { canvas.0 / self.width } else { 1.0 };
        let scale_y = if self.height > 0.0 { canvas.1 / self.height } else { 1.0 };
        ((client_x - self.left) * scale_x, (client_y - self.top) * scale_y)
    }
}

/// Approximate hit box of a clip: centre and size in canvas pixels.
/// Rotation is not taken into account.
fn hit_box(clip: &Clip, canvas: (f32, f32)) -> (f32, f32, f32, f32) {
    let (w, h) = if clip.kind == MediaKind::Text {
        HIT_BOX_TEXT
    } else {
        HIT_BOX_MEDIA
    };
    let scale = clip.properties.scale.abs();
    (
        canvas.0 / 2.0 + clip.properties.x,
        canvas.1 / 2.0 + clip.properties.y,
        w * scale,
        h * scale,
    )
}

/// Top-most visual clip under `point` at `time`.
pub fn hit_test(model: &TimelineModel, time: f64, canvas: (f32, f32), point: (f32, f32)) -> Option<Uuid> {
    model
        .active_clips(time)
        .into_iter()
        .rev()
        .filter(|clip| clip.kind.is_visual())
        .find(|clip| {
            let (cx, cy, w, h) = hit_box(clip, canvas);
            point.0 >= cx - w / 2.0
                && point.0 <= cx + w / 2.0
                && point.1 >= cy - h / 2.0
                && point.1 <= cy + h / 2.0
        })
        .map(|clip| clip.id)
}

/// Pointer position and clip position captured when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub clip_id: Uuid,
    pub pointer: (f32, f32),
    pub clip_position: (f32, f32),
}

/// Result of a pointer-down on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDown {
    /// A clip was hit and selected; `dragging` is false on locked tracks.
    Hit { clip_id: Uuid, dragging: bool },
    /// Empty space: the selection was cleared.
    Miss,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    canvas: (f32, f32),
    drag: Option<DragAnchor>,
}

impl InteractionController {
    pub fn new(canvas: (f32, f32)) -> Self {
        Self { canvas, drag: None }
    }

    pub fn canvas(&self) -> (f32, f32) {
        self.canvas
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag(&self) -> Option<&DragAnchor> {
        self.drag.as_ref()
    }

    /// Select the clip under `point` (canvas coordinates) and start dragging it.
    pub fn pointer_down(
        &mut self,
        model: &TimelineModel,
        time: f64,
        selection: &mut Selection,
        point: (f32, f32),
    ) -> PointerDown {
        self.drag = None;
        let Some(clip) = hit_test(model, time, self.canvas, point).and_then(|id| model.clip(id)) else {
            selection.clear();
            return PointerDown::Miss;
        };
        selection.select_clip(clip.id);

        let dragging = !model.is_track_locked(&clip.track_id);
        if dragging {
            self.drag = Some(DragAnchor {
                clip_id: clip.id,
                pointer: point,
                clip_position: (clip.properties.x, clip.properties.y),
            });
            tracing::debug!(clip_id = %clip.id, "Canvas drag started");
        }
        PointerDown::Hit {
            clip_id: clip.id,
            dragging,
        }
    }

    /// Move the dragged clip by the pointer delta. Returns whether the clip changed.
    pub fn pointer_move(&mut self, model: &mut TimelineModel, point: (f32, f32)) -> bool {
        let Some(anchor) = self.drag else {
            return false;
        };
        if !model.contains_clip(anchor.clip_id) {
            // Deleted mid-drag (e.g. by undo).
            self.drag = None;
            return false;
        }
        let dx = point.0 - anchor.pointer.0;
        let dy = point.1 - anchor.pointer.1;
        model.update_clip(
            anchor.clip_id,
            &ClipPatch::position(anchor.clip_position.0 + dx, anchor.clip_position.1 + dy),
        )
    }

    /// End the drag, returning the anchor if one was active.
    pub fn pointer_up(&mut self) -> Option<DragAnchor> {
        self.drag.take()
    }

    /// Pointer left the canvas; same as releasing.
    pub fn pointer_leave(&mut self) -> Option<DragAnchor> {
        self.pointer_up()
    }
}
