//! The annotator session.
//!
//! [`Annotator`] wires the pieces together for one viewer: device pointer events are
//! mapped through the [`Viewport`], hit-tested against the current image's boxes, fed to
//! the [`Interaction`] machine, and completed gestures are checkpointed in [`History`].
//! The renderer reads a [`RenderFrame`] back after each event.
//!
//! Nothing here is global: a host creates as many sessions as it has viewers.


use std::collections::BTreeMap;

use web_time::Instant;

use crate::constants::{
    DEFAULT_POINTER_MOVE_HZ, DEFAULT_PROB_THRESHOLD, HANDLE_HIT_RADIUS, MIN_BOX_SIZE,
    NO_IMAGE_KEY,
};
use crate::detection::{self, Detection};
use crate::history::{History, HistoryConfig};
use crate::interaction::{Effect, ImageContext, Interaction, MetaEdit, Mode, PointerTarget};
use crate::keybindings::{KeyBindings, KeyCode, Modifiers, Shortcut};
use crate::model::{
    BoundingBox, BoxId, BoxPatch, Cursor, ImageSize, ManipulationHandle, Point, Rect,
    hit_test_handle,
};
use crate::store::{AnnotationStore, AnnotationsState};
use crate::throttle::MoveThrottle;
use crate::viewport::Viewport;

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub history: HistoryConfig,
    /// Smallest box side, in image pixels.
    pub min_box_size: f32,
    /// Pointer moves processed per second during a drag (0 = all).
    pub pointer_move_hz: u32,
    /// Handle grab radius, in device pixels.
    pub handle_hit_radius: f32,
    /// Detections must score strictly above this to be merged.
    pub detection_threshold: f32,
    /// Length of the workspace class list, when there is one. Class hotkeys past it
    /// do nothing.
    pub class_count: Option<usize>,
    pub keybindings: KeyBindings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            min_box_size: MIN_BOX_SIZE,
            pointer_move_hz: DEFAULT_POINTER_MOVE_HZ,
            handle_hit_radius: HANDLE_HIT_RADIUS,
            detection_threshold: DEFAULT_PROB_THRESHOLD,
            class_count: None,
            keybindings: KeyBindings::default(),
        }
    }
}

/// Everything the renderer needs to draw the current image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub image_id: String,
    pub image_size: ImageSize,
    /// Committed boxes in draw order.
    pub boxes: Vec<BoundingBox>,
    /// Rubber-band rectangle of a box being created.
    pub preview: Option<Rect>,
    /// Box and handle being dragged.
    pub active_handle: Option<(BoxId, ManipulationHandle)>,
    /// Box whose label/class editor is open.
    pub editing: Option<BoxId>,
    pub cursor: Cursor,
    pub mode: Mode,
    pub viewport: Viewport,
}

/// One annotation viewer: store, history, gesture state and view transform.
#[derive(Debug)]
pub struct Annotator {
    config: SessionConfig,
    store: AnnotationStore,
    history: History,
    interaction: Interaction,
    throttle: MoveThrottle,

    viewport: Viewport,
    /// Top-left of the image container, in device pixels.
    container_origin: Point,

    image_id: String,
    image_size: ImageSize,
    /// Dimensions of every image opened in this session.
    known_sizes: BTreeMap<String, ImageSize>,
    mode: Mode,
    /// Handle under the pointer while idle, for the cursor.
    hovered: Option<ManipulationHandle>,
}

impl Annotator {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_state(config, AnnotationsState::new())
    }

    /// Start a session on previously saved annotations.
    pub fn with_state(config: SessionConfig, state: AnnotationsState) -> Self {
        let mut history = History::with_config(config.history);
        history.checkpoint(&state);

        Self {
            store: AnnotationStore::from_state(state),
            history,
            interaction: Interaction::new(config.min_box_size),
            throttle: MoveThrottle::from_hz(config.pointer_move_hz),
            viewport: Viewport::identity(),
            container_origin: Point::new(0.0, 0.0),
            image_id: NO_IMAGE_KEY.to_string(),
            image_size: ImageSize::default(),
            known_sizes: BTreeMap::new(),
            mode: Mode::View,
            hovered: None,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The committed annotation state.
    pub fn state(&self) -> &AnnotationsState {
        self.store.state()
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn active_class(&self) -> Option<u32> {
        self.interaction.active_class()
    }

    /// Class given to boxes created from now on.
    pub fn set_active_class(&mut self, class_id: Option<u32>) {
        self.interaction.set_active_class(class_id);
    }

    /// Switch to another image. Any gesture in progress is abandoned.
    pub fn open_image(&mut self, image_id: &str, size: ImageSize) {
        self.cancel();
        self.image_id = image_id.to_string();
        self.image_size = size;
        self.hovered = None;
        if size.is_known() || !self.known_sizes.contains_key(image_id) {
            self.known_sizes.insert(image_id.to_string(), size);
        }
        self.store.ensure_annotation(image_id, size);
        log::info!("Opened {image_id:?} ({}x{})", size.width, size.height);
    }

    /// Update the pan/zoom transform and where the image container sits on screen.
    pub fn set_viewport(&mut self, viewport: Viewport, container_origin: Point) {
        if !viewport.is_valid() {
            log::warn!("Ignoring invalid viewport {viewport:?}");
            return;
        }
        self.viewport = viewport;
        self.container_origin = container_origin;
    }

    /// Fit the current image into a container of the given size.
    pub fn fit_to_container(&mut self, container_width: f32, container_height: f32) {
        self.viewport = Viewport::fit(self.image_size, container_width, container_height);
    }

    /// Centre and zoom onto a box of the current image. Returns false for unknown boxes.
    pub fn zoom_to_box(&mut self, box_id: BoxId, container_width: f32, container_height: f32) -> bool {
        let Some(rect) = self
            .store
            .state()
            .find_box(&self.image_id, box_id)
            .map(BoundingBox::rect)
        else {
            return false;
        };
        self.viewport = Viewport::zoom_to_box(rect, container_width, container_height);
        true
    }

    fn to_image(&self, device: Point) -> Point {
        self.viewport
            .to_image_space(device, self.container_origin, self.image_size)
    }

    /// Handle a key press. Returns true if the key did something.
    pub fn key_down(&mut self, key: KeyCode, modifiers: Modifiers) -> bool {
        if self.config.keybindings.is_mode_key(key) {
            if self.mode != Mode::Adjust {
                log::debug!("Adjust mode on");
                self.mode = Mode::Adjust;
            }
            return true;
        }

        let Some(shortcut) = self.config.keybindings.shortcut_for(key, modifiers) else {
            return false;
        };
        match shortcut {
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
            Shortcut::Cancel => self.cancel() != Effect::Ignored,
            Shortcut::DeleteSelected => match self.interaction.editing_box() {
                Some(box_id) => self.delete_box(box_id),
                None => false,
            },
            Shortcut::SelectClass(index)
                if self.config.class_count.is_some_and(|count| index >= count) =>
            {
                log::debug!("No class {index} in the class list");
                false
            }
            Shortcut::SelectClass(index) => {
                let class_id = u32::try_from(index).ok();
                log::debug!("Active class: {class_id:?}");
                self.set_active_class(class_id);
                true
            }
        }
    }

    /// Handle a key release. Releasing the mode key abandons any gesture.
    pub fn key_up(&mut self, key: KeyCode) -> bool {
        if !self.config.keybindings.is_mode_key(key) {
            return false;
        }
        log::debug!("Adjust mode off");
        self.mode = Mode::View;
        self.hovered = None;
        self.cancel();
        true
    }

    /// Pointer pressed at a device position.
    pub fn pointer_down(&mut self, device: Point) -> Effect {
        let point = self.to_image(device);
        let radius = self
            .viewport
            .device_to_image_distance(self.config.handle_hit_radius);
        let target = match hit_test_handle(self.store.boxes(&self.image_id), &point, radius) {
            Some((box_id, handle)) => PointerTarget::Handle { box_id, handle },
            None => PointerTarget::Canvas,
        };
        log::trace!("pointer_down {device:?} -> {point:?} on {target:?}");

        self.throttle.reset();
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        self.interaction
            .pointer_down(ctx, &self.store, self.mode, target, point)
    }

    /// Pointer moved to a device position.
    pub fn pointer_move(&mut self, device: Point) -> Effect {
        self.pointer_move_at(device, Instant::now())
    }

    /// Pointer moved, with an explicit event time for the throttle.
    pub fn pointer_move_at(&mut self, device: Point, now: Instant) -> Effect {
        let point = self.to_image(device);

        if self.interaction.is_idle() {
            self.hovered = match self.mode {
                Mode::Adjust => {
                    let radius = self
                        .viewport
                        .device_to_image_distance(self.config.handle_hit_radius);
                    hit_test_handle(self.store.boxes(&self.image_id), &point, radius)
                        .map(|(_, handle)| handle)
                }
                Mode::View => None,
            };
            return Effect::Ignored;
        }

        if !self.throttle.accept_at(now) {
            return Effect::Ignored;
        }
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        self.interaction.pointer_move(ctx, &mut self.store, point)
    }

    /// Pointer released at a device position. Checkpoints completed gestures.
    pub fn pointer_up(&mut self, device: Point) -> Effect {
        let point = self.to_image(device);
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        let effect = self
            .interaction
            .pointer_up(ctx, &mut self.store, self.mode, point);
        if effect.needs_checkpoint() {
            self.checkpoint();
        }
        effect
    }

    /// Abandon the gesture in progress, restoring any box being dragged.
    pub fn cancel(&mut self) -> Effect {
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        self.interaction.cancel(ctx, &mut self.store)
    }

    /// Restore the previous checkpoint. Returns false if already at the oldest.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        self.cancel();
        let restored = self.history.undo().cloned();
        self.restore(restored)
    }

    /// Re-apply the next checkpoint. Returns false if already at the newest.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        self.cancel();
        let restored = self.history.redo().cloned();
        self.restore(restored)
    }

    fn restore(&mut self, state: Option<AnnotationsState>) -> bool {
        let Some(state) = state else {
            return false;
        };
        self.store.replace(state);
        self.interaction.reset();
        self.ensure_opened_images();
        true
    }

    /// Opened images keep their record and dimensions even if a snapshot predates them.
    fn ensure_opened_images(&mut self) {
        self.store.ensure_annotation(&self.image_id, self.image_size);
        for (image_id, size) in &self.known_sizes {
            self.store.ensure_annotation(image_id, *size);
        }
    }

    /// Record the store in history. A box being dragged goes in at its grab-time
    /// rectangle, so only finished gestures reach the history.
    fn checkpoint(&mut self) {
        match self.interaction.grabbed_original() {
            Some((box_id, original)) => {
                let mut settled = AnnotationStore::from_state(self.store.state().clone());
                settled.update_box(&self.image_id, box_id, &BoxPatch::rect(original));
                self.history.checkpoint(settled.state());
            }
            None => self.history.checkpoint(self.store.state()),
        }
    }

    /// Run `edit` against the store and checkpoint if it changed anything.
    fn commit(&mut self, edit: impl FnOnce(&mut AnnotationStore)) -> bool {
        let before = self.store.state().clone();
        edit(&mut self.store);
        let changed = !self.store.state().ptr_eq(&before);
        if changed {
            self.checkpoint();
        }
        changed
    }

    /// Open the label/class editor for a box of the current image.
    pub fn begin_edit(&mut self, box_id: BoxId) -> Effect {
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        self.interaction.begin_edit(ctx, &self.store, box_id)
    }

    /// Apply an edit from the label/class editor and close it.
    pub fn commit_edit(&mut self, edit: MetaEdit) -> Effect {
        let ctx = ImageContext {
            image_id: &self.image_id,
            size: self.image_size,
        };
        let effect = self.interaction.commit_edit(ctx, &mut self.store, edit);
        if effect.needs_checkpoint() {
            self.checkpoint();
        }
        effect
    }

    /// Delete a box of the current image.
    pub fn delete_box(&mut self, box_id: BoxId) -> bool {
        self.interaction.forget_box(box_id);
        let image_id = self.image_id.clone();
        let deleted = self.commit(|store| {
            store.delete_box(&image_id, box_id);
        });
        if deleted {
            log::info!("Deleted box {box_id}");
        }
        deleted
    }

    /// Set or clear the label of a box of the current image.
    pub fn relabel(&mut self, box_id: BoxId, label: Option<String>) -> bool {
        let image_id = self.image_id.clone();
        self.commit(|store| {
            store.relabel(&image_id, box_id, label);
        })
    }

    /// Set or clear the class of a box of the current image.
    pub fn reclass(&mut self, box_id: BoxId, class_id: Option<u32>) -> bool {
        let image_id = self.image_id.clone();
        self.commit(|store| {
            store.reclass(&image_id, box_id, class_id);
        })
    }

    /// Set or remove an image-level label on the current image.
    pub fn set_image_label(&mut self, key: &str, value: Option<String>) -> bool {
        let image_id = self.image_id.clone();
        self.commit(|store| {
            store.set_image_label(&image_id, key, value);
        })
    }

    /// Append detector output to an image (not necessarily the open one).
    ///
    /// The whole batch is one undo step.
    pub fn merge_detections(&mut self, image_id: &str, detections: &[Detection]) -> Vec<BoxId> {
        let threshold = self.config.detection_threshold;
        let min_size = self.config.min_box_size;
        let size = self.known_sizes.get(image_id).copied().unwrap_or_default();
        let mut ids = Vec::new();
        self.commit(|store| {
            store.ensure_annotation(image_id, size);
            ids = detection::merge_detections(store, image_id, detections, threshold, min_size);
        });
        ids
    }

    /// Replace all annotations (workspace reload). History starts over.
    pub fn load_state(&mut self, state: AnnotationsState) {
        self.interaction.reset();
        self.store.replace(state);
        self.ensure_opened_images();
        self.history.reset(self.store.state());
        log::info!("Loaded annotations for {} images", self.store.state().len());
    }

    /// Snapshot for the renderer.
    pub fn frame(&self) -> RenderFrame {
        let cursor = match self.hovered {
            Some(handle) if self.interaction.is_idle() && self.mode == Mode::Adjust => {
                handle.cursor()
            }
            _ => self.interaction.cursor(self.mode),
        };

        RenderFrame {
            image_id: self.image_id.clone(),
            image_size: self.image_size,
            boxes: self.store.boxes(&self.image_id).to_vec(),
            preview: self.interaction.preview(),
            active_handle: self.interaction.active_handle(),
            editing: self.interaction.editing_box(),
            cursor,
            mode: self.mode,
            viewport: self.viewport,
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
