//! Capability-based filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use std::io::{self, Read};

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};

/// Read a whole UTF-8 text file using ambient authority.
///
/// # Errors
///
/// Returns the I/O error raised while opening or reading `path`, including
/// invalid UTF-8.
pub fn read_utf8_file(path: &Utf8Path) -> io::Result<String> {
    let mut file = fs_utf8::File::open_ambient(path, ambient_authority())?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(text)
}

/// Create the directory that will hold `path` when it does not exist yet.
///
/// # Errors
///
/// Returns the I/O error raised while opening the base directory or
/// creating the missing components.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let (base, relative) = match parent.strip_prefix("/") {
        Ok(relative) => (Utf8Path::new("/"), relative),
        Err(_) => (Utf8Path::new("."), parent),
    };
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())?.create_dir_all(relative)
}

/// Whether `path` names an existing regular file.
pub fn is_file(path: &Utf8Path) -> bool {
    fs_utf8::File::open_ambient(path, ambient_authority())
        .and_then(|file| file.metadata())
        .is_ok_and(|meta| meta.is_file())
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
    fn creates_nested_parent_directories() {
        let dir = TempDir::new().expect("temp dir");
        let target = utf8(&dir).join("a/b/probemon.db");
        ensure_parent_dir(&target).expect("create parents");
        assert!(target.parent().expect("parent").is_dir());
    }

    #[rstest]
    fn bare_file_name_needs_no_parent() {
        ensure_parent_dir(Utf8Path::new("probemon.db")).expect("nothing to create");
    }

    #[rstest]
    fn reads_back_text_and_reports_missing_files() {
        let dir = TempDir::new().expect("temp dir");
        let path = utf8(&dir).join("manuf");
        std::fs::write(&path, "00:00:0C\tCisco\n").expect("write fixture");
        assert_eq!(read_utf8_file(&path).expect("read"), "00:00:0C\tCisco\n");
        assert!(is_file(&path));
        let missing = utf8(&dir).join("absent");
        assert!(read_utf8_file(&missing).is_err());
        assert!(!is_file(&missing));
    }
}
