//! File backed board views.
//!
//! Each board renders to `<output>/<id>.txt`. The first line names the
//! board's location, the rest is the rendered text. Removing a view deletes
//! its file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use holoboard_core::{Location, View, ViewFactory};
use tracing::warn;

pub struct FileViews {
    dir: PathBuf,
}

impl FileViews {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ViewFactory for FileViews {
    fn create_view(&self, id: &str) -> Box<dyn View> {
        Box::new(FileView {
            path: self.dir.join(format!("{}.txt", file_stem(id))),
            location: Location::default(),
            text: None,
        })
    }
}

/// Percent-encode characters that could escape the output directory. Distinct
/// ids always map to distinct file names.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for (i, c) in id.chars().enumerate() {
        match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => {
                stem.push_str(&format!("%{:02X}", c as u32));
            }
            '.' if i == 0 => stem.push_str("%2E"),
            c => stem.push(c),
        }
    }
    stem
}

struct FileView {
    path: PathBuf,
    location: Location,
    text: Option<String>,
}

impl FileView {
    fn write(&self) {
        let Some(text) = &self.text else {
            return;
        };
        let content = format!("# {}\n{}", self.location, text);
        if let Err(e) = fs::write(&self.path, content) {
            warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }
}

impl View for FileView {
    fn set_location(&mut self, location: &Location) {
        self.location = location.clone();
        self.write();
    }

    fn update_view(&mut self, text: &str) {
        self.text = Some(text.to_string());
        self.write();
    }

    fn remove_view(&mut self) {
        self.text = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
