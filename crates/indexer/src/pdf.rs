use crate::document::Document;
use crate::error::{IndexerError, Result};
use std::path::{Path, PathBuf};

/// Read a PDF into one passage per page. Pages are numbered from one in
/// document order; pages without extractable text are dropped but still
/// counted.
pub(crate) async fn load_pdf_document(path: &Path, source: &str) -> Result<Vec<Document>> {
    let owned: PathBuf = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || extract_pages(&owned))
        .await
        .map_err(|err| IndexerError::pdf(path, err))??;

    let documents: Vec<Document> = pages
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page, text)| Document::passage(source, Some(page), text))
        .collect();
    log::debug!("Read PDF {} ({} pages with text)", path.display(), documents.len());
    Ok(documents)
}

/// Text of every page, keyed by page number
fn extract_pages(path: &Path) -> Result<Vec<(u32, String)>> {
    let doc = lopdf::Document::load(path).map_err(|err| IndexerError::pdf(path, err))?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        match doc.extract_text(&[number]) {
            Ok(text) => pages.push((number, text)),
            Err(err) => log::warn!("Skipping page {number} of {}: {err}", path.display()),
        }
    }
    Ok(pages)
}
