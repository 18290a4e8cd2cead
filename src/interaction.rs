//! Interaction state machine.
//!
//! Tracks the gesture in progress and routes pointer events to the geometry engine and
//! the store. The machine never touches history itself: every call returns an
//! [`Effect`] telling the caller whether a checkpoint is due.
//!
//! ```text
//! Idle --down(canvas, adjust)--> CreatingBox --up--> Idle (+box)
//! Idle --down(handle, adjust)--> ManipulatingBox --up--> Idle
//! Idle --begin_edit--> EditingBoxMeta --commit--> Idle
//! any --cancel--> Idle
//! ```

use crate::geometry::{create_from_anchor, finish_creation, resize};
use crate::model::{BoundingBox, BoxId, BoxPatch, Cursor, ImageSize, ManipulationHandle, Point, Rect};
use crate::store::AnnotationStore;

/// Whether box editing is enabled (mode key held) or the view is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pan/zoom only; boxes are locked.
    #[default]
    View,
    /// Create and adjust boxes.
    Adjust,
}

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty image area.
    Canvas,
    /// A handle of an existing box.
    Handle {
        box_id: BoxId,
        handle: ManipulationHandle,
    },
}

/// The image the events apply to.
#[derive(Debug, Clone, Copy)]
pub struct ImageContext<'a> {
    pub image_id: &'a str,
    pub size: ImageSize,
}

/// A label or class edit made while in [`InteractionState::EditingBoxMeta`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetaEdit {
    Label(Option<String>),
    Class(Option<u32>),
}

/// Current gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging out a new box from `anchor`.
    CreatingBox { anchor: Point, current: Point },
    /// Dragging a handle of an existing box.
    ///
    /// `original` is the box as it was at grab time. All frames are computed from it
    /// so that rounding does not accumulate across moves.
    ManipulatingBox {
        box_id: BoxId,
        handle: ManipulationHandle,
        anchor: Point,
        original: Rect,
    },
    /// Label/class overlay open for a box. Pointer geometry is not intercepted.
    EditingBoxMeta { box_id: BoxId },
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Event did not apply in the current state.
    Ignored,
    /// A gesture began.
    Started,
    /// The creation preview moved (store untouched).
    Preview,
    /// A box was updated live (no checkpoint).
    Updated,
    /// A new box was committed.
    Created(BoxId),
    /// A manipulation or meta edit ended.
    Finished { box_id: BoxId, changed: bool },
    /// Creation ended without a box (too small, or mode released).
    Discarded,
    /// The gesture was aborted and its effects rolled back.
    Cancelled,
}

impl Effect {
    /// Whether the caller should record a history checkpoint.
    pub fn needs_checkpoint(&self) -> bool {
        matches!(
            self,
            Effect::Created(_) | Effect::Finished { changed: true, .. }
        )
    }
}

/// The interaction state machine.
#[derive(Debug, Clone)]
pub struct Interaction {
    state: InteractionState,
    min_box_size: f32,
    active_class: Option<u32>,
}

impl Interaction {
    pub fn new(min_box_size: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            min_box_size,
            active_class: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn min_box_size(&self) -> f32 {
        self.min_box_size
    }

    /// Class given to newly created boxes.
    pub fn active_class(&self) -> Option<u32> {
        self.active_class
    }

    pub fn set_active_class(&mut self, class_id: Option<u32>) {
        self.active_class = class_id;
    }

    /// Pointer pressed at image point `point`.
    pub fn pointer_down(
        &mut self,
        ctx: ImageContext<'_>,
        store: &AnnotationStore,
        mode: Mode,
        target: PointerTarget,
        point: Point,
    ) -> Effect {
        if !ctx.size.is_known() {
            log::trace!("pointer_down ignored: dimensions of {:?} unknown", ctx.image_id);
            return Effect::Ignored;
        }
        if mode != Mode::Adjust || self.state != InteractionState::Idle {
            return Effect::Ignored;
        }

        match target {
            PointerTarget::Canvas => {
                log::debug!("Creating box from ({:.1}, {:.1})", point.x, point.y);
                self.state = InteractionState::CreatingBox {
                    anchor: point,
                    current: point,
                };
                Effect::Started
            }
            PointerTarget::Handle { box_id, handle } => {
                let Some(bbox) = store.state().find_box(ctx.image_id, box_id) else {
                    return Effect::Ignored;
                };
                log::debug!("Grabbed {handle:?} of box {box_id}");
                self.state = InteractionState::ManipulatingBox {
                    box_id,
                    handle,
                    anchor: point,
                    original: bbox.rect(),
                };
                Effect::Started
            }
        }
    }

    /// Pointer moved to image point `point`.
    pub fn pointer_move(
        &mut self,
        ctx: ImageContext<'_>,
        store: &mut AnnotationStore,
        point: Point,
    ) -> Effect {
        match &mut self.state {
            InteractionState::CreatingBox { current, .. } => {
                *current = point;
                Effect::Preview
            }
            InteractionState::ManipulatingBox {
                box_id,
                handle,
                anchor,
                original,
            } => {
                let box_id = *box_id;
                let rect = resize(original, *handle, point, *anchor, self.min_box_size, ctx.size);
                if store.state().find_box(ctx.image_id, box_id).is_none() {
                    log::debug!("Box {box_id} vanished during drag");
                    self.state = InteractionState::Idle;
                    return Effect::Cancelled;
                }
                store.update_box(ctx.image_id, box_id, &BoxPatch::rect(rect));
                Effect::Updated
            }
            _ => Effect::Ignored,
        }
    }

    /// Pointer released at image point `point`. Ends any gesture.
    pub fn pointer_up(
        &mut self,
        ctx: ImageContext<'_>,
        store: &mut AnnotationStore,
        mode: Mode,
        point: Point,
    ) -> Effect {
        // The release position is always applied, even if moves were throttled.
        if self.pointer_move(ctx, store, point) == Effect::Cancelled {
            return Effect::Cancelled;
        }

        match std::mem::take(&mut self.state) {
            InteractionState::CreatingBox { anchor, current } => {
                if mode != Mode::Adjust {
                    log::debug!("Box creation discarded: adjust mode released");
                    return Effect::Discarded;
                }
                let Some(rect) = finish_creation(anchor, current, self.min_box_size, ctx.size)
                else {
                    log::debug!("Box creation discarded: below minimum size");
                    return Effect::Discarded;
                };
                let box_id = store.next_box_id(ctx.image_id);
                let mut bbox = BoundingBox::new(box_id, rect).with_label(format!("box_{box_id}"));
                bbox.class_id = self.active_class;
                store.add_box(ctx.image_id, bbox);
                log::info!(
                    "Created box {box_id} at ({:.1}, {:.1}) {:.1}x{:.1}",
                    rect.left,
                    rect.top,
                    rect.width,
                    rect.height
                );
                Effect::Created(box_id)
            }
            InteractionState::ManipulatingBox {
                box_id, original, ..
            } => {
                let changed = store
                    .state()
                    .find_box(ctx.image_id, box_id)
                    .is_some_and(|b| b.rect() != original);
                log::info!("Finished manipulating box {box_id} (changed: {changed})");
                Effect::Finished { box_id, changed }
            }
            other => {
                self.state = other;
                Effect::Ignored
            }
        }
    }

    /// Abort the current gesture (Escape, or the mode key released).
    ///
    /// An in-progress creation is dropped; a manipulated box is restored to its
    /// grab-time geometry.
    pub fn cancel(&mut self, ctx: ImageContext<'_>, store: &mut AnnotationStore) -> Effect {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => Effect::Ignored,
            InteractionState::CreatingBox { .. } => {
                log::debug!("Box creation cancelled");
                Effect::Cancelled
            }
            InteractionState::ManipulatingBox {
                box_id, original, ..
            } => {
                log::debug!("Manipulation of box {box_id} cancelled");
                store.update_box(ctx.image_id, box_id, &BoxPatch::rect(original));
                Effect::Cancelled
            }
            InteractionState::EditingBoxMeta { .. } => Effect::Cancelled,
        }
    }

    /// Open the label/class editor for a box.
    pub fn begin_edit(
        &mut self,
        ctx: ImageContext<'_>,
        store: &AnnotationStore,
        box_id: BoxId,
    ) -> Effect {
        if self.state != InteractionState::Idle
            || store.state().find_box(ctx.image_id, box_id).is_none()
        {
            return Effect::Ignored;
        }
        self.state = InteractionState::EditingBoxMeta { box_id };
        Effect::Started
    }

    /// Apply a label/class edit and close the editor.
    pub fn commit_edit(
        &mut self,
        ctx: ImageContext<'_>,
        store: &mut AnnotationStore,
        edit: MetaEdit,
    ) -> Effect {
        let InteractionState::EditingBoxMeta { box_id } = self.state else {
            return Effect::Ignored;
        };
        self.state = InteractionState::Idle;

        let before = store.state().clone();
        match edit {
            MetaEdit::Label(label) => store.relabel(ctx.image_id, box_id, label),
            MetaEdit::Class(class_id) => store.reclass(ctx.image_id, box_id, class_id),
        };
        let changed = !store.state().ptr_eq(&before);
        Effect::Finished { box_id, changed }
    }

    /// Drop back to idle if the current gesture refers to `box_id` (box deleted).
    pub fn forget_box(&mut self, box_id: BoxId) {
        let refers = match self.state {
            InteractionState::ManipulatingBox { box_id: id, .. }
            | InteractionState::EditingBoxMeta { box_id: id } => id == box_id,
            _ => false,
        };
        if refers {
            self.state = InteractionState::Idle;
        }
    }

    /// Reset to idle without touching the store (image switch, state reload).
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Rectangle of the box being created, if any.
    pub fn preview(&self) -> Option<Rect> {
        match self.state {
            InteractionState::CreatingBox { anchor, current } => {
                Some(create_from_anchor(anchor, current))
            }
            _ => None,
        }
    }

    /// Box and handle currently grabbed, if any.
    pub fn active_handle(&self) -> Option<(BoxId, ManipulationHandle)> {
        match self.state {
            InteractionState::ManipulatingBox { box_id, handle, .. } => Some((box_id, handle)),
            _ => None,
        }
    }

    /// Box being dragged with its grab-time rectangle, if any.
    pub fn grabbed_original(&self) -> Option<(BoxId, Rect)> {
        match self.state {
            InteractionState::ManipulatingBox {
                box_id, original, ..
            } => Some((box_id, original)),
            _ => None,
        }
    }

    /// Box whose label/class editor is open, if any.
    pub fn editing_box(&self) -> Option<BoxId> {
        match self.state {
            InteractionState::EditingBoxMeta { box_id } => Some(box_id),
            _ => None,
        }
    }

    pub fn cursor(&self, mode: Mode) -> Cursor {
        match self.state {
            InteractionState::ManipulatingBox { handle, .. } => handle.cursor(),
            InteractionState::CreatingBox { .. } => Cursor::Crosshair,
            _ if mode == Mode::Adjust => Cursor::Crosshair,
            _ => Cursor::Default,
        }
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(crate::constants::MIN_BOX_SIZE)
    }
}
