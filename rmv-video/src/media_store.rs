//! The media store layout: `$HOME/media/<folder>/<file>`, one level deep,
//! names restricted to a narrow character class.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VideoError};

pub const MAX_NAME_LEN: usize = 64;

fn name_is_valid(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && name != "."
        && name != ".."
}

pub fn validate_name(name: &str) -> Result<()> {
    if name_is_valid(name) {
        Ok(())
    } else {
        Err(VideoError::InvalidMediaName(name.to_string()))
    }
}

pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Opens the store at `$HOME/media`.
    pub fn open_default() -> Result<Self> {
        let home = std::env::var_os("HOME").ok_or_else(|| {
            VideoError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "HOME is not set"))
        })?;
        Self::open(Path::new(&home).join("media"))
    }

    pub fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(MediaStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_path(&self, folder: &str) -> Result<PathBuf> {
        validate_name(folder)?;
        Ok(self.root.join(folder))
    }

    pub fn file_path(&self, folder: &str, file: &str) -> Result<PathBuf> {
        validate_name(folder)?;
        validate_name(file)?;
        Ok(self.root.join(folder).join(file))
    }

    /// Lists the one-level-deep folder names under the store root.
    pub fn list_folders(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Lists the files within one folder (mixed images and videos).
    pub fn list_files(&self, folder: &str) -> Result<Vec<String>> {
        let path = self.folder_path(folder)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete_file(&self, folder: &str, file: &str) -> Result<()> {
        fs::remove_file(self.file_path(folder, file)?)?;
        Ok(())
    }

    pub fn delete_folder(&self, folder: &str) -> Result<()> {
        fs::remove_dir_all(self.folder_path(folder)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_accept_the_documented_character_class() {
        assert!(name_is_valid("chamber_07-clip.mp4"));
        assert!(!name_is_valid(""));
        assert!(!name_is_valid(&"a".repeat(MAX_NAME_LEN + 1)));
        assert!(!name_is_valid("../escape"));
        assert!(!name_is_valid("has space"));
    }

    #[test]
    fn store_lists_folders_and_files() {
        let dir = std::env::temp_dir().join(format!("rmv-video-test-{}", std::process::id()));
        let store = MediaStore::open(dir.clone()).unwrap();
        fs::create_dir_all(dir.join("clips")).unwrap();
        fs::write(dir.join("clips").join("a.png"), b"x").unwrap();
        fs::write(dir.join("clips").join("b.mp4"), b"y").unwrap();

        assert_eq!(store.list_folders().unwrap(), vec!["clips".to_string()]);
        assert_eq!(store.list_files("clips").unwrap(), vec!["a.png".to_string(), "b.mp4".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }
}
