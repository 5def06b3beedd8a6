//! Filesystem primitives for building and cleaning units.

use std::fs;
use std::path::Path;

use anyhow::Context;

/// Remove a file or directory tree. Returns whether anything was removed.
pub fn remove_path_if_exists(path: &Path) -> anyhow::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove file: {}", path.display()))?;
    }
    Ok(true)
}

/// Recursively copy `src` into `dst`, skipping top-level entries for which
/// `skip` returns true. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, skip: &dyn Fn(&Path) -> bool) -> anyhow::Result<usize> {
    let mut copied = 0;
    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read dir: {}", src.display()))?
    {
        let entry =
            entry.with_context(|| format!("Failed to read dir entry: {}", src.display()))?;
        let from = entry.path();
        if skip(&from) {
            continue;
        }
        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat dir entry: {}", from.display()))?;
        let to = dst.join(entry.file_name());

        if ty.is_dir() {
            fs::create_dir_all(&to)
                .with_context(|| format!("Failed to create directory: {}", to.display()))?;
            copied += copy_tree(&from, &to, &|_| false)?;
        } else if ty.is_file() {
            fs::copy(&from, &to).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    from.display(),
                    to.display()
                )
            })?;
            copied += 1;
        } else {
            anyhow::bail!("Unsupported filesystem entry type at {}", from.display());
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_tree_skips_top_level_entries_only() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("modules/net")).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("main.tf"), "# main").unwrap();
        fs::write(src.join("skip.me"), "").unwrap();
        fs::write(src.join("modules/net/skip.me"), "").unwrap();

        let copied = copy_tree(&src, &dst, &|p| p.ends_with("skip.me")).unwrap();

        assert_eq!(copied, 2);
        assert!(dst.join("main.tf").exists());
        assert!(!dst.join("skip.me").exists());
        assert!(dst.join("modules/net/skip.me").exists());
    }

    #[test]
    fn remove_missing_path_is_noop() {
        let temp = TempDir::new().unwrap();
        assert!(!remove_path_if_exists(&temp.path().join("missing")).unwrap());
    }
}
