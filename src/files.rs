//! Capability-scoped file access shared by manifest and state handling.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

fn split(path: &Utf8Path) -> io::Result<(&Utf8Path, &str)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path is missing a filename")
    })?;
    Ok((parent, file_name))
}

/// Reads a UTF-8 file.
pub(crate) fn read(path: &Utf8Path) -> io::Result<String> {
    let (parent, file_name) = split(path)?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(file_name)
}

/// Returns `true` when `path` exists. A missing parent counts as absent.
pub(crate) fn exists(path: &Utf8Path) -> io::Result<bool> {
    let (parent, file_name) = split(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Writes `contents`, creating parent directories as needed.
pub(crate) fn write(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let (parent, file_name) = split(path)?;
    Dir::create_ambient_dir_all(parent, ambient_authority())?;
    Dir::open_ambient_dir(parent, ambient_authority())?.write(file_name, contents)
}

/// Removes a file. A file that is already gone is not an error.
pub(crate) fn remove(path: &Utf8Path) -> io::Result<()> {
    let (parent, file_name) = split(path)?;
    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    match dir.remove_file(file_name) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
