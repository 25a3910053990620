//! Startup orchestration.
//!
//! # Responsibilities
//! - Prepare the filesystem locations the application relies on
//! - Start background services (metrics exporter)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Infrastructure checks are idempotent, so they run under the retry executor
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::observability::metrics;
use crate::resilience::Executor;

/// Error raised while preparing the server.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("could not create directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("metrics exporter failed to start: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Run every startup step required before accepting traffic.
pub async fn prepare(config: &ServerConfig) -> Result<(), StartupError> {
    let executor = Executor::new(&config.executor);
    ensure_directories(&executor, &config.storage.directories).await?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    Ok(())
}

/// Create each directory in `directories` (and its parents) if missing.
pub async fn ensure_directories(executor: &Executor, directories: &[PathBuf]) -> Result<(), StartupError> {
    for dir in directories {
        let task = executor.task(format!("ensure {}", dir.display()), || {
            tokio::fs::create_dir_all(dir)
        });
        executor
            .run(task)
            .await
            .map_err(|source| StartupError::Directory {
                path: dir.clone(),
                source,
            })?;
        tracing::debug!(path = %dir.display(), "Directory ready");
    }
    Ok(())
}
