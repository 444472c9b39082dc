use std::fs;
use std::path::{Path, PathBuf};

use chunkvec_core::{Document, Error, Metadata, Result};
use tracing::{debug, warn};

/// Loads UTF-8 `.txt` documents from a single file or a directory tree.
///
/// Directory entries are returned sorted by path so that default source ids
/// and chunk positions are reproducible across runs.
#[derive(Debug, Clone)]
pub struct TextFileLoader {
    path: PathBuf,
}

impl TextFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<Document>> {
        if self.path.is_dir() {
            let (files, skipped) = list_txt_files(&self.path);
            debug!(dir = %self.path.display(), files = files.len(), skipped, "loading directory");
            files.iter().map(|p| read_document(p)).collect()
        } else if self.path.is_file() && is_txt(&self.path) {
            Ok(vec![read_document(&self.path)?])
        } else {
            Err(Error::config(format!(
                "{} is neither a directory nor a .txt file",
                self.path.display()
            )))
        }
    }

    pub fn load_texts(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_iter().map(|d| d.text).collect())
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    let source = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let metadata = Metadata::new(source).with_path(path.to_string_lossy());
    Ok(Document::new(text, Some(metadata)))
}

fn is_txt(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("txt")
}

/// Sorted `.txt` paths under `root`, plus the number of entries that could not
/// be read. Unreadable entries are logged and left out.
fn list_txt_files(root: &Path) -> (Vec<PathBuf>, usize) {
    let mut txt_files = Vec::new();
    let mut skipped = 0;
    for entry in walkdir::WalkDir::new(root) {
        match entry {
            Ok(e) if e.file_type().is_file() && is_txt(e.path()) => txt_files.push(e.into_path()),
            Ok(_) => {}
            Err(err) => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!(path = %path, error = %err, "skipping unreadable entry");
                skipped += 1;
            }
        }
    }
    txt_files.sort();
    (txt_files, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_is_loaded_in_path_order() {
        let tmp = TempDir::new().expect("tmp");
        let dir = tmp.path();
        fs::create_dir(dir.join("sub")).expect("mkdir");
        fs::write(dir.join("b.txt"), "bravo").expect("write");
        fs::write(dir.join("a.txt"), "alpha").expect("write");
        fs::write(dir.join("sub").join("c.txt"), "charlie").expect("write");
        fs::write(dir.join("skip.md"), "not text").expect("write");

        let docs = TextFileLoader::new(dir).load().expect("load");
        let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "bravo", "charlie"]);

        let meta = docs[2].metadata.as_ref().expect("metadata");
        assert_eq!(meta.source, "c.txt");
        let expected = dir.join("sub").join("c.txt");
        assert_eq!(meta.path.as_deref().map(Path::new), Some(expected.as_path()));
    }

    #[test]
    fn single_file_is_one_document() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("note.txt");
        fs::write(&file, "Short text").expect("write");
        let texts = TextFileLoader::new(&file).load_texts().expect("load");
        assert_eq!(texts, vec!["Short text"]);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("bin.txt");
        fs::write(&file, [b'o', b'k', 0xff]).expect("write");
        let texts = TextFileLoader::new(&file).load_texts().expect("load");
        assert_eq!(texts, vec!["ok\u{fffd}"]);
    }

    #[test]
    fn unreadable_entries_are_counted() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("a.txt"), "alpha").expect("write");
        let (files, skipped) = list_txt_files(tmp.path());
        assert_eq!((files.len(), skipped), (1, 0));

        let (files, skipped) = list_txt_files(&tmp.path().join("gone"));
        assert!(files.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn other_paths_are_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("doc.pdf");
        fs::write(&file, "%PDF").expect("write");
        assert!(matches!(TextFileLoader::new(&file).load(), Err(Error::Configuration(_))));
        assert!(matches!(TextFileLoader::new(tmp.path().join("missing")).load(), Err(Error::Configuration(_))));
    }
}
