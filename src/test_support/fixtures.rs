//! On-disk project fixtures.

use std::path::{Path, PathBuf};

use crate::builder::extension::ExtensionLayout;
use crate::core::descriptor::Precision;

/// A source tree laid out like the extension project.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Source layout
    pub layout: ExtensionLayout,
    /// Files to write (path relative to project root -> content)
    pub files: Vec<(PathBuf, String)>,
}

impl ProjectFixture {
    /// Native sources plus generated C for every binding source.
    pub fn complete() -> Self {
        let layout = ExtensionLayout::default();
        let mut files = Vec::new();

        for source in layout.native_source_paths() {
            files.push((source, "int cmf_placeholder(void) { return 0; }\n".to_string()));
        }

        for precision in Precision::ALL {
            for suffix in ["", "_plusblas"] {
                let stem = format!("cfuns_{}{}", precision, suffix);
                let dir = &layout.binding_dir;
                files.push((dir.join(format!("{}.pyx", stem)), "# binding\n".to_string()));
                files.push((dir.join(format!("{}.c", stem)), "/* generated */\n".to_string()));
            }
        }

        ProjectFixture { layout, files }
    }

    /// Drop a file from the fixture.
    pub fn without(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.files.retain(|(p, _)| p != path);
        self
    }

    /// Write all files below `base_path`.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<()> {
        for (path, content) in &self.files {
            let full = base_path.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(())
    }
}
