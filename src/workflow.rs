use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{AnuvadError, Result};
use crate::language::Language;
use crate::localizer::Localizer;
use crate::orchestrator::StructureReport;

/// File-level driver for questionnaire translation.
pub struct Workflow<'a> {
    localizer: &'a Localizer,
}

impl<'a> Workflow<'a> {
    pub fn new(localizer: &'a Localizer) -> Self {
        Self { localizer }
    }

    /// Translate one questionnaire file into `output_path`
    pub async fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        language: Language,
    ) -> Result<StructureReport> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        if !input_path.exists() {
            return Err(AnuvadError::FileNotFound(input_path.display().to_string()));
        }

        let content = fs::read_to_string(input_path).await?;
        let mut form: Value = serde_json::from_str(&content)?;

        let report = self
            .localizer
            .structures()
            .translate_in_place(&mut form, language)
            .await;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(output_path, serde_json::to_string_pretty(&form)?).await?;

        info!(
            "Translated {} -> {} ({} leaves, {} rewritten)",
            input_path.display(),
            output_path.display(),
            report.leaves,
            report.rewritten
        );
        Ok(report)
    }

    /// Translate every *.json file under `input_dir`, mirroring the layout in `output_dir`
    pub async fn translate_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        output_dir: Q,
        language: Language,
    ) -> Result<usize> {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();

        if !input_dir.is_dir() {
            return Err(AnuvadError::Config("Input path is not a directory".to_string()));
        }
        fs::create_dir_all(output_dir).await?;

        let files = find_json_files(input_dir);
        info!("Found {} questionnaire files to translate", files.len());

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .map_err(|e| AnuvadError::Config(format!("Invalid progress template: {}", e)))?,
        );

        let mut translated = 0;
        for file in &files {
            let relative = pathdiff::diff_paths(file, input_dir).unwrap_or_else(|| {
                PathBuf::from(file.file_name().unwrap_or_default())
            });
            progress.set_message(relative.display().to_string());

            match self.translate_file(file, output_dir.join(&relative), language).await {
                Ok(_) => translated += 1,
                Err(e) => warn!("Failed to translate {}: {}", file.display(), e),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(translated)
    }
}

fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
