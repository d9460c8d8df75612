use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::application::{CorpusBackend, SentenceSplitter};
use crate::domain::{
    collection_name_from_path, validate_collection_name, DomainError, IngestSummary,
};

const UTF8_BOM: &str = "\u{feff}";

/// Ingests documents: read, split into sentences, replace the collection.
pub struct AddDocumentUseCase {
    backend: Arc<dyn CorpusBackend>,
    splitter: Arc<dyn SentenceSplitter>,
}

impl AddDocumentUseCase {
    pub fn new(backend: Arc<dyn CorpusBackend>, splitter: Arc<dyn SentenceSplitter>) -> Self {
        Self { backend, splitter }
    }

    /// Adds a file under the collection named after its file stem.
    pub async fn execute(&self, path: &Path) -> Result<IngestSummary, DomainError> {
        let collection = collection_name_from_path(path)?;
        self.execute_as(path, &collection).await
    }

    pub async fn execute_as(
        &self,
        path: &Path,
        collection: &str,
    ) -> Result<IngestSummary, DomainError> {
        validate_collection_name(collection)?;
        let text = read_document(path).await?;
        debug!("Read {} bytes from {}", text.len(), path.display());
        self.execute_text(collection, &text).await
    }

    pub async fn execute_text(
        &self,
        collection: &str,
        text: &str,
    ) -> Result<IngestSummary, DomainError> {
        validate_collection_name(collection)?;
        let sentences = self.splitter.split(text);

        let count = self
            .backend
            .create_or_replace(collection, &sentences)
            .await
            .map_err(|e| e.in_context("add", collection))?;

        if count != sentences.len() as u64 {
            return Err(DomainError::backend(format!(
                "stored {} sentences but {} were split",
                count,
                sentences.len()
            ))
            .in_context("add", collection));
        }

        info!("Added collection '{}' ({} sentences)", collection, count);
        Ok(IngestSummary::new(collection, count))
    }

    /// Adds every file under `dir` whose extension is in `extensions`.
    ///
    /// Files are processed in path order and the first failure aborts the
    /// walk; collections added before it stay in place.
    pub async fn execute_dir(
        &self,
        dir: &Path,
        extensions: &[String],
    ) -> Result<Vec<IngestSummary>, DomainError> {
        let files = collect_documents(dir, extensions)?;
        info!("Found {} documents under {}", files.len(), dir.display());

        let start_time = Instant::now();
        let progress_bar = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress_bar.set_style(style.progress_chars("#>-"));
        }

        let mut summaries: Vec<IngestSummary> = Vec::with_capacity(files.len());
        for file in files {
            progress_bar.set_message(file.display().to_string());

            let summary = match self.execute(&file).await {
                Ok(summary) => summary,
                Err(e) => {
                    progress_bar.abandon_with_message("failed");
                    return Err(e);
                }
            };

            if summaries
                .iter()
                .any(|s| s.collection() == summary.collection())
            {
                warn!(
                    "{} replaced an earlier file with the same collection name '{}'",
                    file.display(),
                    summary.collection()
                );
                summaries.retain(|s| s.collection() != summary.collection());
            }
            summaries.push(summary);
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("done");
        info!(
            "Added {} collections in {:.2}s",
            summaries.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(summaries)
    }
}

/// Reads a document as UTF-8, dropping a leading BOM.
///
/// Invalid byte sequences are replaced rather than rejected.
pub async fn read_document(path: &Path) -> Result<String, DomainError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DomainError::io(path, e))?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "{} is not valid UTF-8, replacing invalid sequences",
                path.display()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Lists files under `dir` with one of `extensions`, sorted by path.
pub fn collect_documents(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DomainError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            match e.into_io_error() {
                Some(io) => DomainError::io(path, io),
                None => DomainError::invalid_input(format!(
                    "filesystem loop while walking {}",
                    path.display()
                )),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
