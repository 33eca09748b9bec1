//! Model artifact download (`spec.md` §4.3: `refresh_models()`).
//!
//! Streams each artifact to a `.part` file and renames on completion —
//! the same write-temp-then-rename discipline used throughout the examples
//! pack, generalized here from the original's buffered
//! `shutil.copyfileobj(r.raw, f)` to a true streaming download
//! (`reqwest::Response::bytes_stream()`), per `spec.md` §4.3's explicit
//! "no whole-file buffering" requirement.

use std::path::{Path, PathBuf};

use feminicide_common::ModelSpec;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::Result;

#[derive(Clone)]
pub struct ModelRegistry {
    http: reqwest::Client,
    model_dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            http: reqwest::Client::new(),
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Deterministic on-disk name for one artifact: `{prefix}_{stage}_{kind}.bin`.
    pub fn artifact_path(&self, filename_prefix: &str, stage: u8, kind: &str) -> PathBuf {
        self.model_dir.join(format!("{filename_prefix}_{stage}_{kind}.bin"))
    }

    /// Downloads every stage's vectorizer + model artifact for every spec in
    /// the catalog. Each spec's stage's `artifact_urls` is `[vectorizer_url,
    /// model_url]`, matching `ModelStage` construction from the central
    /// server's catalog response.
    pub async fn refresh_models(&self, specs: &[ModelSpec]) -> Result<()> {
        tokio::fs::create_dir_all(&self.model_dir).await?;

        for spec in specs {
            info!(model_id = spec.id, prefix = %spec.filename_prefix, "downloading model artifacts");
            self.download_stage(&spec.filename_prefix, 1, &spec.stage_1.artifact_urls).await?;
            if let Some(stage_2) = &spec.stage_2 {
                self.download_stage(&spec.filename_prefix, 2, &stage_2.artifact_urls).await?;
            }
        }
        Ok(())
    }

    async fn download_stage(&self, filename_prefix: &str, stage: u8, urls: &[String]) -> Result<()> {
        let kinds = ["vectorizer", "model"];
        for (url, kind) in urls.iter().zip(kinds) {
            let dest = self.artifact_path(filename_prefix, stage, kind);
            self.download_file(url, &dest).await?;
        }
        Ok(())
    }

    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        let part_path = dest.with_extension("part");
        let response = self.http.get(url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(&part_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part_path, dest).await?;
        Ok(())
    }
}
