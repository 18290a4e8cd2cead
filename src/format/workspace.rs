//! The `bbat.workspace` file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::FormatError;
use crate::constants::DEFAULT_PROB_THRESHOLD;
use crate::store::AnnotationsState;

/// Name of the workspace file inside an image directory.
pub const WORKSPACE_FILENAME: &str = "bbat.workspace";

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a file has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.rsplit_once('.').is_some_and(|(_, e)| e == *ext))
}

/// One image-level label and the values it may take (e.g. "weather": sunny, rain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLabelOption {
    pub label_title: String,
    #[serde(default)]
    pub label_options: Vec<String>,
}

/// One object class. A box's `classId` indexes the workspace class list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    /// Fields this version does not interpret (colours and the like), kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Object-detector settings stored with the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSettings {
    #[serde(default = "default_prob_threshold")]
    pub prob_threshold: f32,
    /// Whether detections are accepted without review.
    #[serde(default)]
    pub default_agree: bool,
    /// Path of the detector model, if one was picked.
    #[serde(default)]
    pub loaded_model: Option<String>,
}

fn default_prob_threshold() -> f32 {
    DEFAULT_PROB_THRESHOLD
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            prob_threshold: default_prob_threshold(),
            default_agree: false,
            loaded_model: None,
        }
    }
}

/// Contents of a workspace file. Every section is optional on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFile {
    #[serde(default)]
    pub annotations: AnnotationsState,
    #[serde(default)]
    pub class_list: Vec<ClassEntry>,
    #[serde(default)]
    pub image_label_options: Vec<ImageLabelOption>,
    #[serde(default)]
    pub detection: DetectionSettings,
}

impl WorkspaceFile {
    /// Parse and validate workspace JSON.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let file: Self = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    /// Name of the class a box's `classId` refers to.
    pub fn class_name(&self, class_id: u32) -> Option<&str> {
        let index = usize::try_from(class_id).ok()?;
        self.class_list.get(index).map(|c| c.name.as_str())
    }

    fn validate(&self) -> Result<(), FormatError> {
        let threshold = self.detection.prob_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FormatError::invalid_format(format!(
                "probThreshold {threshold} is outside [0, 1]"
            )));
        }

        for (image_id, annotation) in self.annotations.iter() {
            if let Some(bad) = annotation
                .boxes
                .iter()
                .find(|b| b.width < 0.0 || b.height < 0.0)
            {
                return Err(FormatError::invalid_coordinates(format!(
                    "box {} on {image_id:?} has negative size {}x{}",
                    bad.box_id, bad.width, bad.height
                )));
            }
        }
        Ok(())
    }
}

/// An image directory with its workspace file.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the workspace file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(WORKSPACE_FILENAME)
    }

    /// Read the workspace file. A missing file yields the defaults.
    pub fn load(&self) -> Result<WorkspaceFile, FormatError> {
        let path = self.path();
        if !path.exists() {
            log::debug!("No workspace file at {:?}, starting fresh", path);
            return Ok(WorkspaceFile::default());
        }

        let json = std::fs::read_to_string(&path)?;
        let file = WorkspaceFile::from_json(&json)?;
        log::info!(
            "Loaded workspace {:?} ({} annotated images)",
            path,
            file.annotations.len()
        );
        Ok(file)
    }

    /// Write `file`, merged over whatever the workspace file held before.
    ///
    /// Sections of `file` replace their stored counterparts; top-level keys this
    /// version does not know about are kept.
    pub fn save(&self, file: &WorkspaceFile) -> Result<(), FormatError> {
        let path = self.path();
        let mut merged = if path.exists() {
            match serde_json::from_str::<serde_json::Value>(&std::fs::read_to_string(&path)?)? {
                serde_json::Value::Object(previous) => previous,
                _ => {
                    return Err(FormatError::invalid_format(
                        "workspace file is not a JSON object",
                    ));
                }
            }
        } else {
            serde_json::Map::new()
        };

        // Through a string so f32 fields keep their short decimal form.
        let current = serde_json::from_str::<serde_json::Value>(&serde_json::to_string(file)?)?;
        if let serde_json::Value::Object(current) = current {
            merged.extend(current);
        }

        let json = serde_json::to_string_pretty(&merged)?;
        std::fs::write(&path, json)?;
        log::info!("Saved workspace {:?}", path);
        Ok(())
    }

    /// Image files in the directory, sorted by name.
    pub fn image_files(&self) -> Result<Vec<PathBuf>, FormatError> {
        let mut images = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_image = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_image_file);
            if path.is_file() && is_image {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, ImageSize, Rect};
    use crate::store::AnnotationStore;

    fn sample_state() -> AnnotationsState {
        let mut store = AnnotationStore::new();
        store.ensure_annotation("a.png", ImageSize::new(64, 48));
        store.add_box(
            "a.png",
            BoundingBox::new(1, Rect::new(1.0, 2.0, 20.0, 20.0)).with_label("box_1"),
        );
        store.state().clone()
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("test.png"));
        assert!(is_image_file("test.JPEG"));
        assert!(is_image_file("path/to/image.tif"));
        assert!(!is_image_file("test.txt"));
        assert!(!is_image_file("bbat.workspace"));
        assert!(!is_image_file("png"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = Workspace::open(dir.path()).load().expect("load");
        assert!(file.annotations.is_empty());
        assert!(file.image_label_options.is_empty());
        assert_eq!(file.detection.prob_threshold, 0.7);
        assert!(!file.detection.default_agree);
        assert_eq!(file.detection.loaded_model, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::open(dir.path());
        let file = WorkspaceFile {
            annotations: sample_state(),
            class_list: vec![ClassEntry::new("car"), ClassEntry::new("person")],
            image_label_options: vec![ImageLabelOption {
                label_title: "weather".into(),
                label_options: vec!["sunny".into(), "rain".into()],
            }],
            detection: DetectionSettings {
                prob_threshold: 0.5,
                ..DetectionSettings::default()
            },
        };
        workspace.save(&file).expect("save");
        assert_eq!(workspace.load().expect("load"), file);
    }

    #[test]
    fn test_save_merges_over_previous_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::open(dir.path());
        std::fs::write(
            workspace.path(),
            r#"{"annotations":{"old.png":{"boxes":[]}},"exportFormats":["coco"]}"#,
        )
        .expect("seed");

        let file = WorkspaceFile {
            annotations: sample_state(),
            ..WorkspaceFile::default()
        };
        workspace.save(&file).expect("save");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(workspace.path()).expect("read"))
                .expect("json");
        assert_eq!(raw["exportFormats"][0], "coco");
        assert_eq!(raw["classList"], serde_json::json!([]));
        assert!(raw["annotations"].get("old.png").is_none());
        assert_eq!(raw["annotations"]["a.png"]["boxes"][0]["boxId"], 1);
        assert_eq!(raw["detection"]["probThreshold"], 0.7);
    }

    #[test]
    fn test_reads_camel_case_file() {
        let json = r#"{
            "annotations": {
                "cat.jpg": {
                    "boxes": [{"boxId": 3, "left": 5, "top": 6, "width": 30, "height": 40, "classId": 1}],
                    "metadata": {"width": 320, "height": 240},
                    "labels": {"weather": "rain"}
                }
            },
            "imageLabelOptions": [{"labelTitle": "weather", "labelOptions": ["rain"]}],
            "detection": {"probThreshold": 0.4, "defaultAgree": true, "loadedModel": "yolo.onnx"}
        }"#;
        let file = WorkspaceFile::from_json(json).expect("parse");
        let cat = file.annotations.get("cat.jpg").expect("cat");
        assert_eq!(cat.size(), ImageSize::new(320, 240));
        assert_eq!(cat.boxes[0].class_id, Some(1));
        assert_eq!(cat.labels.get("weather").map(String::as_str), Some("rain"));
        assert!(file.detection.default_agree);
        assert_eq!(file.detection.loaded_model.as_deref(), Some("yolo.onnx"));
    }

    #[test]
    fn test_class_list_names_box_classes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::open(dir.path());
        std::fs::write(
            workspace.path(),
            r##"{"classList":[{"name":"car","color":"#ff0000"},{"name":"bike"}]}"##,
        )
        .expect("seed");

        let mut file = workspace.load().expect("load");
        assert_eq!(file.class_name(0), Some("car"));
        assert_eq!(file.class_name(1), Some("bike"));
        assert_eq!(file.class_name(2), None);

        file.class_list.push(ClassEntry::new("truck"));
        workspace.save(&file).expect("save");

        let reloaded = workspace.load().expect("reload");
        assert_eq!(reloaded.class_list, file.class_list);
        assert_eq!(reloaded.class_list[0].extra["color"], "#ff0000");
        assert_eq!(reloaded.class_name(2), Some("truck"));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let result = WorkspaceFile::from_json(r#"{"detection":{"probThreshold":3}}"#);
        assert!(matches!(result, Err(FormatError::InvalidFormat { .. })));
    }

    #[test]
    fn test_rejects_negative_box_size() {
        let json = r#"{"annotations":{"a.png":{"boxes":[{"boxId":1,"left":0,"top":0,"width":-5,"height":10}]}}}"#;
        let result = WorkspaceFile::from_json(json);
        assert!(matches!(result, Err(FormatError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_image_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.png", "a.JPG", "notes.txt", WORKSPACE_FILENAME] {
            std::fs::write(dir.path().join(name), b"").expect("touch");
        }
        std::fs::create_dir(dir.path().join("sub.png")).expect("mkdir");

        let names: Vec<_> = Workspace::open(dir.path())
            .image_files()
            .expect("list")
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
    }
}
