//! Capability-based filesystem helpers built on `cap-std` and `camino`.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};

/// Read the whole file at `path`.
pub fn read_utf8_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, file_name) = open_dir_and_file(path)?;
    dir.read(file_name.as_str())
}

/// Ensure the parent directory of `path` exists so a database can be created
/// there.
///
/// Missing directories are created beneath the nearest existing ancestor.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let Some(anchor) = parent
        .ancestors()
        .find(|dir| dir.as_str().is_empty() || dir.is_dir())
    else {
        return Ok(());
    };
    if anchor == parent {
        return Ok(());
    }
    let missing = parent
        .strip_prefix(anchor)
        .map_err(|_| io::Error::other("parent path should extend its ancestor"))?;
    let anchor = if anchor.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        anchor
    };
    fs_utf8::Dir::open_ambient_dir(anchor, ambient_authority())?.create_dir_all(missing)
}

fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir")
    }

    #[rstest]
    fn creates_missing_parents() {
        let dir = TempDir::new().expect("temp dir");
        let target = utf8(&dir).join("nested/deeper/cities.db");
        ensure_parent_dir(&target).expect("create parents");
        assert!(target.parent().expect("parent").is_dir());
    }

    #[rstest]
    fn existing_parent_is_left_alone() {
        let dir = TempDir::new().expect("temp dir");
        ensure_parent_dir(&utf8(&dir).join("cities.db")).expect("existing parent");
        ensure_parent_dir(Utf8Path::new("cities.db")).expect("bare file name");
    }

    #[rstest]
    fn creates_parents_below_partially_existing_path() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir(dir.path().join("data")).expect("seed directory");
        let target = utf8(&dir).join("data/cache/cities.db");
        ensure_parent_dir(&target).expect("create parents");
        assert!(utf8(&dir).join("data/cache").is_dir());
    }

    #[rstest]
    fn reads_file_contents() {
        let dir = TempDir::new().expect("temp dir");
        let target = utf8(&dir).join("cities.json");
        std::fs::write(&target, b"[]").expect("write fixture");
        assert_eq!(read_utf8_file(&target).expect("read"), b"[]");
    }
}
