//! Headless BBAT runner.
//!
//! `bbat <image-dir> [script.json]` loads the directory's workspace, records the
//! dimensions of every image in it, replays the optional event script and saves the
//! workspace again.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use bbat::config::AppConfig;
use bbat::format::{FormatError, Workspace};
use bbat::model::ImageSize;
use bbat::{Annotator, replay};

fn main() -> ExitCode {
    let config = AppConfig::load_from_default_path().unwrap_or_default();
    let level = config.preferences.log_level.to_level_filter();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(dir) = args.next() else {
        eprintln!("usage: bbat <image-dir> [script.json]");
        return ExitCode::from(2);
    };
    let script = args.next();

    match run(Path::new(&dir), script.as_deref().map(Path::new), &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bbat error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(dir: &Path, script: Option<&Path>, config: &AppConfig) -> Result<(), FormatError> {
    let workspace = Workspace::open(dir);
    let mut file = workspace.load()?;

    let mut dimensions = BTreeMap::new();
    for path in workspace.image_files()? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let size = match image::image_dimensions(&path) {
            Ok((width, height)) => ImageSize::new(width, height),
            Err(e) => {
                log::warn!("Could not read dimensions of {:?}: {}", path, e);
                ImageSize::default()
            }
        };
        dimensions.insert(name.to_string(), size);
    }

    let mut session_config = config.session_config();
    // Scripted moves carry no timing, so none may be dropped.
    session_config.pointer_move_hz = 0;
    session_config.detection_threshold = file.detection.prob_threshold;
    if !file.class_list.is_empty() {
        session_config.class_count = Some(file.class_list.len());
    }

    let mut annotator = Annotator::with_state(session_config, file.annotations.clone());
    for (name, size) in &dimensions {
        annotator.open_image(name, *size);
    }

    if let Some(script) = script {
        let events = replay::parse_script(&std::fs::read_to_string(script)?)?;
        let summary = replay::replay(&mut annotator, &events, |image| {
            dimensions.get(image).copied().unwrap_or_default()
        });
        println!(
            "Replayed {} events ({} ignored)",
            summary.applied + summary.ignored,
            summary.ignored
        );
    }

    file.annotations = annotator.state().clone();
    for (image, annotation) in file.annotations.iter() {
        println!("{image}: {} boxes", annotation.boxes.len());
    }
    workspace.save(&file)
}
