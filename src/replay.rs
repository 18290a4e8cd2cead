//! Scripted input replay.
//!
//! A script is a JSON array of [`ReplayEvent`]s, fed one by one to an [`Annotator`]
//! exactly as a UI would. Used by the headless binary and handy for reproducing
//! gesture bugs.
//!
//! ```json
//! [
//!   {"type": "open_image", "image": "cat.jpg"},
//!   {"type": "key_down", "key": "alt"},
//!   {"type": "pointer_down", "x": 20, "y": 20},
//!   {"type": "pointer_move", "x": 80, "y": 60},
//!   {"type": "pointer_up", "x": 80, "y": 60},
//!   {"type": "key_up", "key": "alt"}
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::interaction::{Effect, MetaEdit};
use crate::keybindings::{KeyCode, Modifiers};
use crate::model::{BoxId, ImageSize, Point};
use crate::session::Annotator;
use crate::viewport::Viewport;

/// One scripted input. Pointer positions are device pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    OpenImage {
        image: String,
    },
    Viewport {
        pan_x: f32,
        pan_y: f32,
        scale: f32,
        #[serde(default)]
        origin_x: f32,
        #[serde(default)]
        origin_y: f32,
    },
    /// Fit the image into a container of this size.
    Fit {
        width: f32,
        height: f32,
    },
    KeyDown {
        key: KeyCode,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp {
        key: KeyCode,
    },
    PointerDown {
        x: f32,
        y: f32,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp {
        x: f32,
        y: f32,
    },
    Cancel,
    Undo,
    Redo,
    ActiveClass {
        class_id: Option<u32>,
    },
    BeginEdit {
        box_id: BoxId,
    },
    CommitLabel {
        label: Option<String>,
    },
    CommitClass {
        class_id: Option<u32>,
    },
    DeleteBox {
        box_id: BoxId,
    },
    Relabel {
        box_id: BoxId,
        label: Option<String>,
    },
    Reclass {
        box_id: BoxId,
        class_id: Option<u32>,
    },
    ImageLabel {
        key: String,
        value: Option<String>,
    },
    Detections {
        image: String,
        detections: Vec<Detection>,
    },
}

/// Parse a replay script.
pub fn parse_script(json: &str) -> Result<Vec<ReplayEvent>, serde_json::Error> {
    serde_json::from_str(json)
}

/// What a replay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Events that changed something.
    pub applied: usize,
    /// Events that had no effect in the state they arrived in.
    pub ignored: usize,
}

/// Feed `events` to `annotator`. `dimensions` resolves an image name to its size when
/// an image is opened.
pub fn replay(
    annotator: &mut Annotator,
    events: &[ReplayEvent],
    mut dimensions: impl FnMut(&str) -> ImageSize,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (index, event) in events.iter().enumerate() {
        let applied = apply(annotator, event, &mut dimensions);
        log::trace!("Replay #{index} {event:?}: applied={applied}");
        if applied {
            summary.applied += 1;
        } else {
            summary.ignored += 1;
        }
    }
    log::info!(
        "Replayed {} events ({} ignored)",
        events.len(),
        summary.ignored
    );
    summary
}

fn apply(
    annotator: &mut Annotator,
    event: &ReplayEvent,
    dimensions: &mut impl FnMut(&str) -> ImageSize,
) -> bool {
    match event {
        ReplayEvent::OpenImage { image } => {
            let size = dimensions(image);
            annotator.open_image(image, size);
            true
        }
        ReplayEvent::Viewport {
            pan_x,
            pan_y,
            scale,
            origin_x,
            origin_y,
        } => {
            let viewport = Viewport::new(*pan_x, *pan_y, *scale);
            annotator.set_viewport(viewport, Point::new(*origin_x, *origin_y));
            annotator.viewport() == viewport
        }
        ReplayEvent::Fit { width, height } => {
            annotator.fit_to_container(*width, *height);
            true
        }
        ReplayEvent::KeyDown { key, modifiers } => annotator.key_down(*key, *modifiers),
        ReplayEvent::KeyUp { key } => annotator.key_up(*key),
        ReplayEvent::PointerDown { x, y } => {
            annotator.pointer_down(Point::new(*x, *y)) != Effect::Ignored
        }
        ReplayEvent::PointerMove { x, y } => {
            annotator.pointer_move(Point::new(*x, *y)) != Effect::Ignored
        }
        ReplayEvent::PointerUp { x, y } => {
            annotator.pointer_up(Point::new(*x, *y)) != Effect::Ignored
        }
        ReplayEvent::Cancel => annotator.cancel() != Effect::Ignored,
        ReplayEvent::Undo => annotator.undo(),
        ReplayEvent::Redo => annotator.redo(),
        ReplayEvent::ActiveClass { class_id } => {
            annotator.set_active_class(*class_id);
            true
        }
        ReplayEvent::BeginEdit { box_id } => annotator.begin_edit(*box_id) != Effect::Ignored,
        ReplayEvent::CommitLabel { label } => {
            annotator.commit_edit(MetaEdit::Label(label.clone())) != Effect::Ignored
        }
        ReplayEvent::CommitClass { class_id } => {
            annotator.commit_edit(MetaEdit::Class(*class_id)) != Effect::Ignored
        }
        ReplayEvent::DeleteBox { box_id } => annotator.delete_box(*box_id),
        ReplayEvent::Relabel { box_id, label } => annotator.relabel(*box_id, label.clone()),
        ReplayEvent::Reclass { box_id, class_id } => annotator.reclass(*box_id, *class_id),
        ReplayEvent::ImageLabel { key, value } => annotator.set_image_label(key, value.clone()),
        ReplayEvent::Detections { image, detections } => {
            !annotator.merge_detections(image, detections).is_empty()
        }
    }
}
