//! BBAT - Bounding Box Annotation Tool
//!
//! Headless core of an image annotation tool: maps pointer input through a pan/zoom
//! viewport, turns drags into box creation, move and resize gestures, keeps the
//! annotations as shareable immutable snapshots, and records completed gestures in a
//! bounded undo/redo history.
//!
//! [`Annotator`] is the entry point a UI drives; everything below it is usable on its own.

pub mod config;
pub mod constants;
pub mod detection;
pub mod format;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod replay;
pub mod session;
pub mod store;
pub mod throttle;
pub mod viewport;

pub use session::{Annotator, RenderFrame, SessionConfig};
pub use store::{AnnotationStore, AnnotationsState};
