use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Append-only diagnostic log gated by the `debug_logging` setting.
///
/// Every message also goes to `tracing` at debug level; the file is only
/// touched when the flag is on and a path is configured.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub async fn record(&self, enabled: bool, message: &str) {
        debug!(target: "clickrelay::diagnostics", "{message}");

        if !enabled {
            return;
        }
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let line = format!(
            "[{}] {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );

        let result = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;

        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "failed to write diagnostic log");
        }
    }
}
