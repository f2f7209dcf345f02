//! One CLI run: upload, list bands, display and export the requested ones.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use band_client::{HttpBackend, ProgressSink, UploadProgress};
use band_common::{UploadedAsset, ViewerError};
use band_viewer::BandViewerController;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::export;

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct Job {
    pub file: PathBuf,
    /// Bands to display, in order. Empty means band 1.
    pub bands: Vec<u32>,
    pub list_only: bool,
}

#[derive(Debug, Clone)]
pub struct ExportedBand {
    pub band: u32,
    pub label: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct BandFailure {
    pub band: u32,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub asset: UploadedAsset,
    pub labels: Vec<String>,
    pub exported: Vec<ExportedBand>,
    pub failures: Vec<BandFailure>,
}

impl Job {
    fn requested_bands(&self) -> Vec<u32> {
        if self.bands.is_empty() {
            vec![1]
        } else {
            self.bands.clone()
        }
    }
}

fn progress_logger() -> ProgressSink {
    Arc::new(|progress: UploadProgress| {
        debug!(
            sent = progress.bytes_sent,
            total = progress.bytes_total,
            percent = format!("{:.1}", progress.percent_complete()),
            rate = format!("{:.0} B/s", progress.bytes_per_second()),
            "Upload progress"
        );
    })
}

/// Run a job against the backend described by `settings`.
///
/// Upload and metadata failures abort the run. Band failures are collected
/// in the report so the remaining bands are still attempted.
pub async fn run(job: &Job, settings: &Settings) -> Result<Report> {
    let file_name = job
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Input path has no usable file name: {:?}", job.file))?;
    let data = tokio::fs::read(&job.file)
        .await
        .with_context(|| format!("Failed to read {:?}", job.file))?;

    let backend = Arc::new(HttpBackend::new(settings.client.clone())?);
    let mut controller = BandViewerController::new(backend);

    info!(file = %file_name, size = data.len(), api = %settings.client.base_url, "Uploading raster");
    let asset = controller
        .submit_upload(file_name, Bytes::from(data), Some(progress_logger()))
        .await?;
    controller.load_metadata(&asset).await?;
    let labels = controller.band_labels();

    let mut report = Report {
        asset,
        labels,
        exported: Vec::new(),
        failures: Vec::new(),
    };
    if job.list_only {
        return Ok(report);
    }

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| format!("Failed to create {:?}", settings.output_dir))?;

    for band in job.requested_bands() {
        match controller.select_band(band).await {
            Ok(_) => {}
            Err(err @ ViewerError::BandOutOfRange { .. })
            | Err(err @ ViewerError::ImageLoadFailed { .. }) => {
                warn!(band, error = %err, "Band not displayed");
                report.failures.push(BandFailure {
                    band,
                    message: err.user_message(),
                });
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        let active = controller
            .active()
            .context("Band applied but no image is displayed")?;
        let path = export::band_path(&settings.output_dir, &job.file, band);
        let bytes = export::write_png(&active.image, &path).await?;
        info!(band, label = %active.label, path = ?path, bytes, "Band exported");
        report.exported.push(ExportedBand {
            band,
            label: active.label.clone(),
            path,
            bytes,
        });
    }

    controller.unmount();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides, Settings};
    use test_utils::{names, raster_payload, BandReply, MockServer};

    struct Fixture {
        _dir: tempfile::TempDir,
        input: PathBuf,
        settings: Settings,
    }

    fn fixture(server: &MockServer, file_name: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join(file_name);
        std::fs::write(&input, raster_payload(3000)).unwrap();
        let settings = Settings::resolve(
            FileConfig::default(),
            Overrides {
                api_url: Some(server.base_url()),
                request_timeout_secs: Some(10),
                output_dir: Some(dir.path().join("out")),
            },
        );
        Fixture {
            _dir: dir,
            input,
            settings,
        }
    }

    #[tokio::test]
    async fn test_default_band_exported() {
        let server = MockServer::start(&["red", "green", "blue"]).await;
        let fx = fixture(&server, names::PLAIN);
        let job = Job {
            file: fx.input.clone(),
            bands: Vec::new(),
            list_only: false,
        };

        let report = run(&job, &fx.settings).await.unwrap();
        assert_eq!(report.labels, vec!["Roja", "Verde", "Azul"]);
        assert_eq!(report.exported.len(), 1);
        assert_eq!(report.exported[0].label, "Roja");
        assert_eq!(
            report.exported[0].path,
            fx.settings.output_dir.join("scene_band1.png")
        );
        assert!(report.exported[0].path.exists());
        assert_eq!(server.uploads()[0].size, 3000);
    }

    #[tokio::test]
    async fn test_list_only_fetches_no_bands() {
        let server = MockServer::start(&["", "", ""]).await;
        let fx = fixture(&server, names::SENTINEL2_B843);
        let job = Job {
            file: fx.input.clone(),
            bands: vec![1, 2],
            list_only: true,
        };

        let report = run(&job, &fx.settings).await.unwrap();
        assert_eq!(
            report.labels,
            vec!["Infrarrojo Cercano (B8)", "Roja (B4)", "Verde (B3)"]
        );
        assert!(report.exported.is_empty());
        assert_eq!(server.band_hits(), 0);
    }

    #[tokio::test]
    async fn test_band_failures_collected() {
        let server = MockServer::start(&["red", "green"]).await;
        server.set_band_reply(1, BandReply::Garbage);
        let fx = fixture(&server, names::PLAIN);
        let job = Job {
            file: fx.input.clone(),
            bands: vec![1, 2, 9],
            list_only: false,
        };

        let report = run(&job, &fx.settings).await.unwrap();
        assert_eq!(report.exported.len(), 1);
        assert_eq!(report.exported[0].band, 2);

        let failed: Vec<u32> = report.failures.iter().map(|f| f.band).collect();
        assert_eq!(failed, vec![1, 9]);
        assert!(report.failures[0].message.contains("decodificar"));
        // Out-of-range bands never reach the server.
        assert_eq!(server.band_hits(), 2);
    }

    #[tokio::test]
    async fn test_zero_band_raster_is_an_error() {
        let server = MockServer::start(&[]).await;
        let fx = fixture(&server, names::PLAIN);
        let job = Job {
            file: fx.input.clone(),
            bands: Vec::new(),
            list_only: false,
        };

        let err = run(&job, &fx.settings).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ViewerError>(),
            Some(ViewerError::NoBands(_))
        ));
        assert_eq!(server.band_hits(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let server = MockServer::start(&["red"]).await;
        let fx = fixture(&server, names::PLAIN);
        let job = Job {
            file: fx.input.with_file_name("absent.tif"),
            bands: Vec::new(),
            list_only: false,
        };

        let err = run(&job, &fx.settings).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
        assert!(server.uploads().is_empty());
    }
}
