//! CLI entry point - the composition root.
//!
//! This is the only place where concrete adapters (HTTP transfer, local
//! installer, channel emitter) are wired together; everything below it
//! talks through the ports in `xwalk-core`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use xwalk_core::{
    ActivationEvent, ChannelEmitter, DownloadError, EngineInstaller, EngineProvider,
    HostRequirements, LibraryStatus, RuntimeConfig, VersionStamp, paths,
};
use xwalk_extract::{BundleExtractor, extract_in_background};
use xwalk_runtime::{
    ActivationCoordinator, ActivationState, CoordinatorDeps, CoreLocator, EmbeddedEngineProvider,
    SharedEngineProvider,
};
use xwalk_update::{HttpTransfer, Updater, UpdaterDeps};

#[derive(Parser)]
#[command(name = "xwalk", about = "Engine runtime acquisition tool", version)]
struct Cli {
    /// Override the per-application data root
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which engine would be used and its compatibility status
    Status(EngineArgs),

    /// Extract the bundled engine payload into the library directory
    Extract {
        #[command(flatten)]
        engine: EngineArgs,

        /// Re-extract even when the version stamp matches
        #[arg(long)]
        force: bool,
    },

    /// Run the full acquisition sequence to a ready engine
    Acquire(EngineArgs),
}

#[derive(Args)]
struct EngineArgs {
    /// Application id namespacing the data root
    #[arg(long, default_value = "org.xwalk.demo")]
    app_id: String,

    /// Directory containing the compressed engine bundle
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// Mandatory compressed resources inside the bundle
    #[arg(long, value_delimiter = ',', default_value = "libengine.so,engine.json")]
    resources: Vec<String>,

    /// Directory of a separately installed shared engine package
    #[arg(long)]
    shared_dir: Option<PathBuf>,

    /// Direct engine download URL (store redirect is used when absent)
    #[arg(long)]
    download_url: Option<String>,

    /// Append the device ABI as a query parameter to the download URL
    #[arg(long)]
    append_abi: bool,

    /// Shared engine package id for store redirects
    #[arg(long, default_value = "org.xwalk.core")]
    package_id: String,

    /// Host API version
    #[arg(long, default_value_t = 5)]
    api_version: u32,

    /// Oldest engine version the host accepts
    #[arg(long, default_value_t = 5)]
    min_engine_version: u32,

    /// Version of the bundled engine payload
    #[arg(long, default_value_t = 5)]
    bundled_version: u32,
}

impl EngineArgs {
    fn config(&self, data_root: Option<PathBuf>) -> RuntimeConfig {
        RuntimeConfig {
            app_id: self.app_id.clone(),
            package_id: self.package_id.clone(),
            download_url: self.download_url.clone(),
            append_abi: self.append_abi,
            bundle_dir: self.bundle_dir.clone(),
            resources: self.resources.clone(),
            shared_package_dir: self.shared_dir.clone(),
            data_root,
            ..RuntimeConfig::default()
        }
    }

    const fn host(&self) -> HostRequirements {
        HostRequirements {
            api_version: self.api_version,
            min_engine_version: self.min_engine_version,
            bundled_version: self.bundled_version,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Status(engine) => handle_status(&engine, cli.data_root),
        Commands::Extract { engine, force } => handle_extract(&engine, cli.data_root, force).await,
        Commands::Acquire(engine) => handle_acquire(&engine, cli.data_root).await,
    }
}

fn resolve_root(config: &RuntimeConfig) -> Result<PathBuf> {
    match &config.data_root {
        Some(root) => Ok(root.clone()),
        None => paths::data_root(&config.app_id).context("Failed to resolve the data root"),
    }
}

fn build_providers(config: &RuntimeConfig, root: &std::path::Path) -> Vec<Arc<dyn EngineProvider>> {
    let mut providers: Vec<Arc<dyn EngineProvider>> = vec![Arc::new(EmbeddedEngineProvider::new(
        paths::library_dir(root),
    ))];
    if let Some(shared_dir) = &config.shared_package_dir {
        providers.push(Arc::new(SharedEngineProvider::new(shared_dir.clone())));
    }
    providers
}

fn handle_status(engine: &EngineArgs, data_root: Option<PathBuf>) -> Result<()> {
    let config = engine.config(data_root);
    let root = resolve_root(&config)?;

    let locator = CoreLocator::new(engine.host(), build_providers(&config, &root));
    let location = locator.locate();

    println!("Data root:  {}", root.display());
    match &location.descriptor {
        Some(descriptor) => {
            println!("Engine:     {} (version {})", descriptor.mode, descriptor.library_version);
            println!("Min host:   {}", descriptor.min_host_version);
        }
        None => println!("Engine:     none located"),
    }
    println!("Status:     {}", location.status);

    if let Some(stamp) = VersionStamp::load(&paths::stamp_path(&root))? {
        println!("Stamp:      version {} ({})", stamp.version, stamp.abi);
    } else {
        println!("Stamp:      none");
    }

    if location.status != LibraryStatus::Matched {
        println!();
        println!("Run 'xwalk acquire' to obtain a compatible engine.");
    }
    Ok(())
}

async fn handle_extract(engine: &EngineArgs, data_root: Option<PathBuf>, force: bool) -> Result<()> {
    let config = engine.config(data_root);
    let root = resolve_root(&config)?;
    let bundle_dir = config
        .bundle_dir
        .clone()
        .context("--bundle-dir is required for extract")?;

    let extractor = BundleExtractor::new(
        bundle_dir,
        paths::library_dir(&root),
        config.resources.clone(),
    );
    if !extractor.bundle_present() {
        bail!("No compressed bundle found for resources {:?}", config.resources);
    }

    let stamp_path = paths::stamp_path(&root);
    let stamp = VersionStamp::load(&stamp_path)?;
    if !force && !extractor.is_extraction_needed(stamp.as_ref(), engine.bundled_version) {
        println!("Engine payload already extracted (version {}).", engine.bundled_version);
        return Ok(());
    }

    println!("Extracting bundled engine payload...");
    extract_in_background(Arc::new(extractor), CancellationToken::new())
        .await
        .context("Bundle extraction failed")?;
    VersionStamp::new(engine.bundled_version).save(&stamp_path)?;
    println!("✓ Extracted to {}", paths::library_dir(&root).display());
    Ok(())
}

async fn handle_acquire(engine: &EngineArgs, data_root: Option<PathBuf>) -> Result<()> {
    let config = engine.config(data_root);
    let root = resolve_root(&config)?;
    tracing::info!(app_id = %config.app_id, root = %root.display(), "Starting engine acquisition");

    let (emitter, rx) = ChannelEmitter::new();
    let renderer = spawn_renderer(rx);

    let extractor = Arc::new(BundleExtractor::new(
        config.bundle_dir.clone().unwrap_or_else(|| root.join("bundle")),
        paths::library_dir(&root),
        config.resources.clone(),
    ));
    let locator = CoreLocator::new(engine.host(), build_providers(&config, &root));
    let updater = Arc::new(Updater::new(
        config.clone(),
        UpdaterDeps {
            transfer: Arc::new(HttpTransfer::new()),
            installer: Arc::new(LocalInstaller { root: root.clone() }),
            emitter: Arc::new(emitter.clone()),
        },
    ));

    let coordinator = Arc::new(ActivationCoordinator::new(CoordinatorDeps {
        config,
        host: engine.host(),
        extractor,
        locator,
        updater,
        emitter: Arc::new(emitter),
    }));

    let canceller = Arc::clone(&coordinator);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            canceller.cancel();
        }
    });

    if !coordinator.start().is_started() {
        bail!("An acquisition sequence is already running");
    }
    let state = coordinator.wait_terminal().await;

    ctrl_c.abort();
    drop(coordinator);
    let _ = tokio::time::timeout(Duration::from_secs(1), renderer).await;

    match state {
        ActivationState::Ready => Ok(()),
        ActivationState::Cancelled => bail!("Acquisition cancelled"),
        other => bail!("Acquisition ended in state '{other}'"),
    }
}

/// Installer used by the CLI: keeps downloaded artifacts under the data
/// root and points the user at the store page when no URL is configured.
struct LocalInstaller {
    root: PathBuf,
}

impl EngineInstaller for LocalInstaller {
    fn install(&self, artifact: &std::path::Path) -> Result<(), DownloadError> {
        let pending = self.root.join("pending-install");
        std::fs::create_dir_all(&pending).map_err(|e| DownloadError::from_io_error(&e))?;
        let dest = pending.join(artifact.file_name().unwrap_or_default());
        std::fs::copy(artifact, &dest).map_err(|e| DownloadError::from_io_error(&e))?;
        println!("Engine artifact staged at {}", dest.display());
        println!("Install it with your platform's package installer, then re-run 'xwalk acquire'.");
        Ok(())
    }

    fn open_store_page(&self, package_id: &str) -> Result<(), DownloadError> {
        println!("No download URL configured.");
        println!("Install the engine package '{package_id}' from your application store.");
        Ok(())
    }
}

/// Render activation events to the terminal, with a progress bar for
/// downloads.
fn spawn_renderer(mut rx: UnboundedReceiver<ActivationEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        while let Some(event) = rx.recv().await {
            match event {
                ActivationEvent::DecompressStarted => println!("Extracting bundled engine..."),
                ActivationEvent::DecompressCancelled => println!("Extraction cancelled."),
                ActivationEvent::DecompressCompleted => println!("✓ Bundle extracted"),
                ActivationEvent::DockStarted => println!("Checking engine compatibility..."),
                ActivationEvent::DockFailed { status } => {
                    println!("Engine unavailable: {status}");
                }
                ActivationEvent::DockCompleted { mode } => {
                    println!("✓ Engine located ({mode})");
                }
                ActivationEvent::DownloadStarted { url } => {
                    println!("Downloading {url}");
                    let pb = ProgressBar::new(0);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                            .unwrap()
                            .progress_chars("█▓░"),
                    );
                    bar = Some(pb);
                }
                ActivationEvent::DownloadProgress { downloaded, total, .. } => {
                    if let Some(pb) = &bar {
                        if total > 0 {
                            pb.set_length(total);
                        }
                        pb.set_position(downloaded);
                    }
                }
                ActivationEvent::DownloadCancelled => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    println!("Download cancelled.");
                }
                ActivationEvent::DownloadFailed { error } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    println!("Download failed: {error}");
                }
                ActivationEvent::DownloadCompleted { artifact } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    println!("✓ Downloaded {}", artifact.display());
                }
                ActivationEvent::ActivateStarted => println!("Activating engine..."),
                ActivationEvent::ActivateCompleted { version } => {
                    println!("✓ Engine ready (version {version})");
                }
                ActivationEvent::ProviderFault { kind, detail } => {
                    println!("Engine fault ({kind:?}): {detail}");
                }
                ActivationEvent::ActivationFailed { error } => {
                    println!("Activation failed: {error}");
                }
            }
        }
    })
}
