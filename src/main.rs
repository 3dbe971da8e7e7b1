use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use clickshot::capture::{CaptureRequest, PageInfo};
use clickshot::config::{IconVariant, SettingsPatch};
use clickshot::controller::{self, Controller, FixedPage};
use clickshot::host::HostDependencies;
use clickshot::router::{
    Message, MessageEnvelope, MessageRouter, Response, RouterService, decode_envelope,
};
use clickshot::storage::{StorageSnapshot, read_snapshot_file, write_snapshot_file};
use clickshot::Config;

#[derive(Parser, Debug)]
#[command(name = "clickshot")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CLICKSHOT_GIT_HASH"), ")"),
    about = "Click-to-capture screenshots with marker and note overlays"
)]
struct Cli {
    /// Config file (defaults to ~/.config/clickshot/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture the screen as if the user clicked at (x, y) on a page
    Capture {
        /// URL of the page being captured
        #[arg(long)]
        url: String,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        /// Pointer icon (light, blue or dark)
        #[arg(long, value_parser = parse_icon)]
        icon: Option<IconVariant>,
        /// Annotation text drawn next to the marker
        #[arg(long)]
        note: Option<String>,
        /// Transcribed speech drawn next to the marker
        #[arg(long)]
        transcription: Option<String>,
        /// Device pixel ratio of the captured page
        #[arg(long)]
        dpr: Option<f64>,
    },
    /// Print usage statistics
    Stats,
    /// List indexed screenshots
    List,
    /// Forget screenshots older than the given number of days
    Cleanup {
        #[arg(long)]
        days: u32,
    },
    /// Report storage usage against the quota
    Space,
    /// Write a snapshot of all metadata (gzip when PATH ends in .gz)
    Export { path: PathBuf },
    /// Replace all metadata with a snapshot file
    Import { path: PathBuf },
    /// Print settings, or apply a JSON patch first
    Settings {
        #[arg(long, value_name = "JSON")]
        patch: Option<String>,
    },
    /// Answer newline-delimited JSON envelopes on stdin until EOF
    Serve,
}

fn parse_icon(value: &str) -> Result<IconVariant, String> {
    serde_json::from_value(Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unknown icon variant '{value}' (expected light, blue or dark)"))
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(cli.command, config))
}

async fn run(command: Command, config: Config) -> Result<ExitCode> {
    let mut host = HostDependencies::desktop(&config);
    if let Command::Capture { url, .. } = &command {
        host = host.with_pages(Arc::new(FixedPage(PageInfo::new(url.clone()))));
    }

    let controller = Controller::start(&config, host).await?;
    let router = Arc::new(MessageRouter::new());
    controller.register(&router);

    let message = match command {
        Command::Capture {
            url: _,
            x,
            y,
            icon,
            note,
            transcription,
            dpr,
        } => Message::CaptureScreenshot(CaptureRequest {
            icon_variant: icon,
            annotation_text: note,
            transcription_text: transcription,
            device_pixel_ratio: dpr,
            ..CaptureRequest::at(x, y)
        }),
        Command::Stats => Message::GetStorageStats,
        Command::List => Message::GetScreenshots,
        Command::Cleanup { days } => Message::CleanupOldData { max_age_days: days },
        Command::Space => Message::CheckStorageSpace,
        Command::Export { path } => return export(&router, &path).await,
        Command::Import { path } => {
            let value = read_snapshot_file(&path)?;
            Message::ImportData(value)
        }
        Command::Settings { patch: Some(raw) } => {
            let patch: SettingsPatch =
                serde_json::from_str(&raw).context("Invalid settings patch")?;
            Message::UpdateSettings(patch)
        }
        Command::Settings { patch: None } => Message::GetSettings,
        Command::Serve => {
            let keep_alive = Duration::from_secs(config.runtime.keep_alive_secs);
            return serve(router, keep_alive).await;
        }
    };

    let response = router.dispatch(MessageEnvelope::new(message)).await;
    print_response(&response)
}

async fn export(router: &MessageRouter, path: &std::path::Path) -> Result<ExitCode> {
    let response = router
        .dispatch(MessageEnvelope::new(Message::ExportData))
        .await;
    let Some(data) = response.data.clone().filter(|_| response.success) else {
        return print_response(&response);
    };

    let snapshot: StorageSnapshot =
        serde_json::from_value(data).context("Controller returned an invalid snapshot")?;
    let blocking_path = path.to_path_buf();
    let count = snapshot.screenshots.len();
    tokio::task::spawn_blocking(move || write_snapshot_file(&blocking_path, &snapshot))
        .await
        .context("Export task failed")??;

    print_response(&Response::ok(json!({
        "path": path.display().to_string(),
        "screenshots": count,
    })))
}

async fn serve(router: Arc<MessageRouter>, keep_alive: Duration) -> Result<ExitCode> {
    let (service, handle) = RouterService::new(router, 64);
    let service = tokio::spawn(service.run());
    let ticker = controller::spawn_keep_alive(handle.clone(), keep_alive);
    log::info!("Serving envelopes on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match decode_envelope(&line) {
            Ok(envelope) => handle.send(envelope).await?,
            Err(response) => response,
        };
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    log::info!("stdin closed, shutting down");
    ticker.abort();
    drop(handle);
    service.await.context("Router task failed")?;
    Ok(ExitCode::SUCCESS)
}

fn print_response(response: &Response) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
