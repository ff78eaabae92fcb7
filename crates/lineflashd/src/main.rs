//! lineflashd - Production-line flasher daemon
//!
//! Serves the operator console API: unit lookup, flash start, job state and
//! serial port listing. Exactly one unit is flashed at a time.
//!
//! Usage:
//!   lineflashd [OPTIONS]
//!
//! A malformed password table aborts startup; a missing one falls back to the
//! default password for every unit.

use std::sync::Arc;

use clap::Parser;
use lineflash_api::{create_router, AppState};
use lineflash_core::{
    detect_revision, BuildInfo, CredentialDirectory, Dispatcher, FlashOrchestrator, ManifestInfo,
    OrchestratorConfig, PathResolver, Platform, PortEnumerator, SystemLauncher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Args, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "lineflashd=debug,lineflash_core=debug,lineflash_api=debug,tower_http=debug"
    } else {
        "lineflashd=info,lineflash_core=info,lineflash_api=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::resolve(&args)?;
    let platform = Platform::detect();

    tracing::info!(
        platform = %platform,
        install_dir = %settings.install_dir.display(),
        "Starting lineflashd"
    );

    let credentials = CredentialDirectory::load(&settings.passwords, &settings.default_password)?;

    let build_info = BuildInfo {
        flow_version: env!("CARGO_PKG_VERSION").to_string(),
        flow_revision: detect_revision(&settings.install_dir),
        manifest: ManifestInfo::load(&settings.manifest),
    };
    tracing::info!(
        flow_version = %build_info.flow_version,
        flow_revision = %build_info.flow_revision,
        bundle_version = %build_info.manifest.version,
        "Build information"
    );

    let resolver = Arc::new(PathResolver);
    let dispatcher = Dispatcher::new(platform.clone(), &settings.install_dir, resolver.clone());
    let orchestrator = FlashOrchestrator::new(
        Arc::new(credentials),
        dispatcher,
        Arc::new(SystemLauncher),
        OrchestratorConfig {
            flash_timeout: settings.flash_timeout,
        },
    );
    let state = AppState::new(
        orchestrator,
        PortEnumerator::new(platform, resolver),
        build_info,
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Flasher listening on http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Stopping server...");
}
