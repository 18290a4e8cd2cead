//! Workspace persistence.
//!
//! An image directory is a workspace: its annotations, class list, image-label
//! vocabulary and detector settings live together in one JSON file next to the images.
//!
//! ```rust,ignore
//! use bbat::format::Workspace;
//!
//! let workspace = Workspace::open("data/street");
//! let mut file = workspace.load()?;
//! file.annotations = annotator.state().clone();
//! workspace.save(&file)?;
//! ```

mod error;
mod workspace;

pub use error::FormatError;
pub use workspace::{
    ClassEntry, DetectionSettings, IMAGE_EXTENSIONS, ImageLabelOption, WORKSPACE_FILENAME, Workspace,
    WorkspaceFile, is_image_file,
};
