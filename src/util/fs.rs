//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Object file path for `source` inside `obj_dir`.
///
/// The source's directory is folded into the file name so that sources with
/// the same stem in different directories do not collide.
pub fn object_path(obj_dir: &Path, source: &Path, extension: &str) -> PathBuf {
    let flat: String = source
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_");
    obj_dir.join(format!("{}.{}", flat, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b");

        ensure_dir(&path).unwrap();
        assert!(path.is_dir());
        ensure_dir(&path).unwrap();
    }

    #[test]
    fn test_object_path_flattens_directories() {
        let obj = Path::new("build/obj");
        assert_eq!(
            object_path(obj, Path::new("src/common.c"), "o"),
            PathBuf::from("build/obj/src_common.o")
        );
        assert_eq!(
            object_path(obj, Path::new("cmfrec/cfuns_double.c"), "obj"),
            PathBuf::from("build/obj/cmfrec_cfuns_double.obj")
        );
    }
}
