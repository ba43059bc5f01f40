//! `upload` command

use super::{human_size, open_store, FAILURE, INFO, SUCCESS};
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use storefront_media::config::MediaConfig;
use storefront_media::media::{CandidateStatus, OutputFormat, UploadOrchestrator};
use storefront_media::storage::SelectedFile;

/// Output encoding accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Keep the source format
    Original,
    /// Re-encode as JPEG
    Jpeg,
    /// Re-encode as WebP
    Webp,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Original => Self::Original,
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Webp => Self::Webp,
        }
    }
}

/// Validate, compress and upload images
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Image files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Key prefix inside the bucket (e.g. `logos`)
    #[arg(short, long)]
    folder: Option<String>,

    /// Upload the original bytes without compressing
    #[arg(long)]
    no_compress: bool,

    /// Output encoding of compressed images
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Encoder quality in (0, 1]
    #[arg(short, long)]
    quality: Option<f32>,
}

impl UploadCommand {
    /// Execute the upload command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The store cannot be opened
    /// - No file was accepted into the queue
    /// - Any upload in the batch failed
    pub async fn execute(&self, config: &MediaConfig) -> Result<()> {
        let (uploader, profile) = self.effective_settings(config)?;
        let store = open_store(config).await?;

        let mut selected = Vec::with_capacity(self.files.len());
        for path in &self.files {
            match SelectedFile::from_path(path).await {
                Ok(file) => selected.push(file),
                Err(e) => println!("{} {}: {e}", style(FAILURE).red(), style(path.display()).dim()),
            }
        }

        let orchestrator = UploadOrchestrator::new(store, config.storage.bucket.clone(), uploader)
            .with_profile(profile)
            .on_upload_complete(|outcome| {
                tracing::info!(
                    uploaded = outcome.urls.len(),
                    failed = outcome.failures.len(),
                    "Upload batch finished"
                );
            });

        let report = orchestrator.enqueue(selected).await;
        for rejection in &report.rejected {
            println!("{} {}", style(FAILURE).red(), rejection);
        }
        if report.accepted.is_empty() {
            bail!("No files were accepted for upload");
        }

        println!(
            "\n{} {} {} to {}",
            INFO,
            style("Uploading").cyan().bold(),
            report.accepted.len(),
            style(orchestrator.bucket()).green().bold()
        );
        for candidate in orchestrator.snapshot() {
            let compressed = candidate
                .compressed_size()
                .map_or_else(String::new, |size| format!(" -> {}", human_size(size)));
            println!(
                "  {} {}{} ({}x{})",
                style(&candidate.file.name).bold(),
                style(human_size(candidate.original_size())).dim(),
                style(compressed).dim(),
                candidate.dimensions.width,
                candidate.dimensions.height
            );
        }
        println!();

        let bar = ProgressBar::new(report.accepted.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        let batch = orchestrator.start_batch();
        tokio::pin!(batch);
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let outcome = loop {
            tokio::select! {
                outcome = &mut batch => break outcome,
                _ = ticker.tick() => {
                    let progress = orchestrator.progress();
                    bar.set_position(progress.settled as u64);
                    bar.set_message(format!("{}%", progress.percent()));
                }
            }
        };
        bar.finish_and_clear();

        for candidate in orchestrator.snapshot() {
            match &candidate.status {
                CandidateStatus::Success { url, .. } => {
                    println!("{} {} {}", style(SUCCESS).green(), candidate.file.name, style(url).cyan());
                }
                CandidateStatus::Error { detail } => {
                    println!("{} {} {}", style(FAILURE).red(), candidate.file.name, style(detail).red());
                }
                _ => {}
            }
        }

        if outcome.cancelled {
            bail!("Upload batch was cancelled");
        }
        if let Some(summary) = outcome.error_summary() {
            bail!("{} of {} uploads failed:\n{summary}", outcome.failures.len(), report.accepted.len());
        }

        println!(
            "\n{} {} {} image(s)",
            style("✨").green().bold(),
            style("Uploaded").green().bold(),
            outcome.urls.len()
        );
        Ok(())
    }

    fn effective_settings(
        &self,
        config: &MediaConfig,
    ) -> Result<(storefront_media::config::UploaderConfig, storefront_media::media::CompressionProfile)> {
        let mut uploader = config.uploader.clone();
        let mut profile = config.compression;

        if let Some(folder) = &self.folder {
            uploader.folder.clone_from(folder);
        }
        if self.no_compress {
            uploader.auto_compress = false;
        }
        if let Some(format) = self.format {
            profile.output_format = format.into();
        }
        if let Some(quality) = self.quality {
            profile.quality = quality;
        }
        if !profile.is_valid() {
            bail!("--quality must be in (0, 1]");
        }
        Ok((uploader, profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        upload: UploadCommand,
    }

    fn parse(args: &[&str]) -> UploadCommand {
        Harness::try_parse_from(std::iter::once("upload").chain(args.iter().copied()))
            .unwrap()
            .upload
    }

    #[test]
    fn test_flags_override_config() {
        let cmd = parse(&["a.png", "--folder", "logos", "--no-compress", "--format", "webp", "-q", "0.5"]);
        let (uploader, profile) = cmd.effective_settings(&MediaConfig::default()).unwrap();

        assert_eq!(uploader.folder, "logos");
        assert!(!uploader.auto_compress);
        assert_eq!(profile.output_format, OutputFormat::Webp);
        assert!((profile.quality - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defaults_come_from_config() {
        let cmd = parse(&["a.png"]);
        let config = MediaConfig::default();
        let (uploader, profile) = cmd.effective_settings(&config).unwrap();
        assert_eq!(uploader, config.uploader);
        assert_eq!(profile, config.compression);
    }

    #[test]
    fn test_out_of_range_quality_rejected() {
        let cmd = parse(&["a.png", "-q", "1.5"]);
        assert!(cmd.effective_settings(&MediaConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_upload_into_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("logo.png");
        tokio::fs::write(&image, storefront_media::testing::png_bytes(8, 4)).await.unwrap();

        let mut config = MediaConfig::default();
        config.storage.root = dir.path().join("media");

        let cmd = parse(&[image.to_str().unwrap(), "--folder", "logos"]);
        cmd.execute(&config).await.unwrap();

        let mut entries = tokio::fs::read_dir(config.storage.root.join("branding/logos")).await.unwrap();
        let mut pngs = 0;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.path().extension().is_some_and(|e| e == "png") {
                pngs += 1;
            }
        }
        assert_eq!(pngs, 1);
    }

    #[tokio::test]
    async fn test_all_rejected_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        tokio::fs::write(&text, b"hello").await.unwrap();

        let mut config = MediaConfig::default();
        config.storage.root = dir.path().join("media");

        assert!(parse(&[text.to_str().unwrap()]).execute(&config).await.is_err());
    }
}
