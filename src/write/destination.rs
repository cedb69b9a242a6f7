//! Archive destination derivation.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use super::EntrySource;
use crate::fs::FileSystem;
use crate::{Error, Result};

/// Extension of the final archive file.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Resolves where an archive built from `source` is written.
///
/// - An empty destination gives `<source-name>.zip` next to the source.
/// - A destination that is an existing directory, or ends in a path
///   separator, gives `<destination>/<source-name>.zip`.
/// - Anything else is used verbatim.
///
/// The source name is the file stem for files and the directory name for
/// directories. The parent directory of the result is created if missing.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if no name can be derived from the
/// source or the parent directory cannot be created.
pub fn derive_destination(
    fs: &dyn FileSystem,
    source: &EntrySource,
    destination: &Path,
) -> Result<PathBuf> {
    let archive_name =
        || -> Result<String> { Ok(format!("{}.{ARCHIVE_EXTENSION}", source.name()?)) };

    let resolved = if destination.as_os_str().is_empty() {
        source.root().with_file_name(archive_name()?)
    } else if ends_with_separator(destination)
        || fs.metadata(destination).is_ok_and(|m| m.is_dir())
    {
        destination.join(archive_name()?)
    } else {
        destination.to_path_buf()
    };

    if let Some(parent) = resolved.parent().filter(|p| !p.as_os_str().is_empty()) {
        match fs.metadata(parent) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::InvalidArgument(format!(
                    "destination parent {} is not a directory",
                    parent.display()
                )));
            }
            Err(_) => fs.create_dir_all(parent).map_err(|e| {
                Error::InvalidArgument(format!(
                    "cannot create destination directory {}: {}",
                    parent.display(),
                    e
                ))
            })?,
        }
    }

    Ok(resolved)
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .ends_with(['/', MAIN_SEPARATOR])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn setup() -> (MemoryFileSystem, EntrySource, EntrySource) {
        let fs = MemoryFileSystem::new();
        fs.write_file("/data/photos/a.jpg", b"a").unwrap();
        fs.write_file("/data/report.txt", b"r").unwrap();
        fs.create_dir_all(Path::new("/out")).unwrap();
        let dir = EntrySource::new(&fs, "/data/photos", true).unwrap();
        let file = EntrySource::new(&fs, "/data/report.txt", true).unwrap();
        (fs, dir, file)
    }

    #[test]
    fn test_empty_destination_is_next_to_source() {
        let (fs, dir, file) = setup();
        assert_eq!(
            derive_destination(&fs, &dir, Path::new("")).unwrap(),
            PathBuf::from("/data/photos.zip")
        );
        assert_eq!(
            derive_destination(&fs, &file, Path::new("")).unwrap(),
            PathBuf::from("/data/report.zip")
        );
    }

    #[test]
    fn test_directory_destination() {
        let (fs, dir, _) = setup();
        assert_eq!(
            derive_destination(&fs, &dir, Path::new("/out")).unwrap(),
            PathBuf::from("/out/photos.zip")
        );
        let created = derive_destination(&fs, &dir, Path::new("/new/place/")).unwrap();
        assert_eq!(created, PathBuf::from("/new/place/photos.zip"));
        assert!(fs.metadata(Path::new("/new/place")).unwrap().is_dir());
    }

    #[test]
    fn test_verbatim_destination() {
        let (fs, dir, _) = setup();
        assert_eq!(
            derive_destination(&fs, &dir, Path::new("/out/custom.zip")).unwrap(),
            PathBuf::from("/out/custom.zip")
        );
    }

    #[test]
    fn test_parent_collides_with_file() {
        let (fs, dir, _) = setup();
        let err = derive_destination(&fs, &dir, Path::new("/data/report.txt/x.zip")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }
}
