//! Whole-file writes. Bytes go to a temporary file next to the target, which
//! only takes the target's name once everything is on disk. A failed write
//! leaves nothing behind.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Writes `bytes` to `path`. Without `overwrite` an existing file fails with
/// [`io::ErrorKind::AlreadyExists`].
pub(crate) fn write_file(path: &Path, bytes: &[u8], overwrite: bool) -> io::Result<()> {
    write_file_with(path, overwrite, |file| file.write_all(bytes))
}

fn write_file_with(
    path: &Path,
    overwrite: bool,
    fill: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    fill(staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    let persisted = if overwrite {
        staged.persist(path)
    } else {
        staged.persist_noclobber(path)
    };
    persisted.map(drop).map_err(|e| e.error)
}

#[cfg(test)]
mod tests {
    use super::{write_file, write_file_with};
    use std::fs;
    use std::io::{self, ErrorKind, Write};

    fn entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn failed_writes_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pepito.secreta");
        let err = write_file_with(&target, false, |file| {
            file.write_all(b"half an artif")?;
            Err(io::Error::new(ErrorKind::Other, "disk full"))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(entries(dir.path()).is_empty());

        write_file(&target, b"whole artifact", false).expect("retry succeeds");
        assert_eq!(fs::read(&target).unwrap(), b"whole artifact");
    }

    #[test]
    fn existing_files_are_kept_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.json");
        write_file(&target, b"one", false).unwrap();

        let err = write_file(&target, b"two", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"one");
        assert_eq!(entries(dir.path()), vec!["doc.json".to_string()]);

        write_file(&target, b"three", true).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"three");
    }
}
