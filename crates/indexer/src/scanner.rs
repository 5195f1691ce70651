use crate::document::Document;
use crate::error::{IndexerError, Result};
use crate::pdf::load_pdf_document;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Page separator emitted by common PDF-to-text tools
const PAGE_BREAK: char = '\u{000C}';

const MAX_FILE_SIZE_BYTES: u64 = 16 * 1_048_576;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "pdf"];

const IGNORED_SCOPES: &[&str] = &[".git", ".cache", "node_modules", "target", "__pycache__"];

/// Scanner for text and PDF documents under a file or directory
pub struct DocumentScanner {
    root: PathBuf,
}

impl DocumentScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Collect document files in a stable order. An explicit file path is
    /// returned as-is regardless of its extension.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }
        if !self.root.is_dir() {
            return Err(IndexerError::InvalidPath(self.root.display().to_string()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !Self::is_ignored(entry));

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Ok(meta) = entry.metadata() {
                if meta.len() > MAX_FILE_SIZE_BYTES {
                    log::warn!(
                        "Skipping large document {} ({} bytes > {})",
                        path.display(),
                        meta.len(),
                        MAX_FILE_SIZE_BYTES
                    );
                    continue;
                }
            }

            if Self::is_document_file(path) {
                files.push(path.to_path_buf());
            }
        }

        log::info!("Found {} documents under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Source id for a scanned file: its path relative to the root with `/`
    /// separators, or the file name when the root is the file itself.
    #[must_use]
    pub fn source_name(&self, path: &Path) -> String {
        let relative = path
            .strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty());
        match relative {
            Some(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    /// Scan and read every document, page-split
    pub async fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in self.scan()? {
            let source = self.source_name(&path);
            documents.extend(load_document(&path, &source).await?);
        }
        Ok(documents)
    }

    fn is_document_file(path: &Path) -> bool {
        extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    fn is_ignored(entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || IGNORED_SCOPES.iter().any(|scope| name == *scope)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Read one document: PDFs page by page, anything else as text
pub async fn load_document(path: &Path, source: &str) -> Result<Vec<Document>> {
    if extension(path).as_deref() == Some("pdf") {
        load_pdf_document(path, source).await
    } else {
        load_text_document(path, source).await
    }
}

/// Read one text document; invalid UTF-8 is replaced rather than rejected.
async fn load_text_document(path: &Path, source: &str) -> Result<Vec<Document>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| IndexerError::io(path, err))?;
    let text = String::from_utf8_lossy(&bytes);
    let documents = split_pages(&text, source);
    log::debug!("Read {} ({} passages)", path.display(), documents.len());
    Ok(documents)
}

/// Split extracted text into passages. Form feeds mark pages, numbered from
/// one; text without form feeds is a single unpaged passage. Blank pages are
/// dropped but still counted.
#[must_use]
fn split_pages(text: &str, source: &str) -> Vec<Document> {
    if !text.contains(PAGE_BREAK) {
        if text.trim().is_empty() {
            return Vec::new();
        }
        return vec![Document::passage(source, None, text)];
    }

    text.split(PAGE_BREAK)
        .zip(1u32..)
        .filter(|(page, _)| !page.trim().is_empty())
        .map(|(page, number)| Document::passage(source, Some(number), page))
        .collect()
}
