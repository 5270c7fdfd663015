use env_logger::Env;
use log::{debug, error, info, warn};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use caption_client::config_loader::{load_config, CONFIG_FILE_PATH};
use caption_client::metrics::create_metrics_exporter;
use caption_client::{
    CaptionRequest, ClientConfig, HttpCaptionService, Metrics, MetricsConfig, TempDirAudioStore, WorkflowOrchestrator,
    WorkflowState,
};

const USAGE: &str = "usage: caption-client <image-path> [language] [audio-output-path]";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    load_config(CONFIG_FILE_PATH);

    let config = ClientConfig::default();
    let metrics_config = MetricsConfig::default();

    let mut args = std::env::args().skip(1);
    let image_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };
    let language = args.next().unwrap_or_else(|| config.default_language.clone());
    let audio_output = args.next().map(PathBuf::from);

    match run(&config, &metrics_config, &image_path, &language, audio_output.as_deref()).await {
        Ok(state) if matches!(state, WorkflowState::Succeeded { .. }) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: &ClientConfig,
    metrics_config: &MetricsConfig,
    image_path: &Path,
    language: &str,
    audio_output: Option<&Path>,
) -> Result<WorkflowState, Box<dyn Error>> {
    let image = std::fs::read(image_path)?;
    let mut request = CaptionRequest::new(image, language);
    if let Some(name) = image_path.file_name().and_then(|n| n.to_str()) {
        request = request.with_file_name(name);
    }

    config.ensure_audio_dir()?;
    let service = Arc::new(HttpCaptionService::new(config)?);
    let store = Arc::new(TempDirAudioStore::new(&config.audio_dir));
    let metrics = Metrics::new(create_metrics_exporter(&metrics_config.exporter_type));

    info!("Caption service: {}", config.api_url);
    match ClientConfig::language_label(language) {
        Some(label) => info!("Target language: {} ({})", label, language),
        None => warn!("Target language '{}' is not in the known list, sending as-is", language),
    }

    let orchestrator = WorkflowOrchestrator::new(service, store, metrics.clone());
    let started = orchestrator.start_request(request);
    tokio::pin!(started);
    let state = tokio::select! {
        state = &mut started => state?,
        _ = tokio::signal::ctrl_c() => {
            orchestrator.cancel().await;
            started.await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&state)?);

    match &state {
        WorkflowState::Succeeded {
            original_caption,
            translated_caption,
            audio_handle,
        } => {
            info!("Caption: {}", translated_caption);
            if !language.eq_ignore_ascii_case("en") {
                info!("(Original: {})", original_caption);
            }
            // The handle is released with the orchestrator, so keep a copy if asked
            if let Some(output) = audio_output {
                std::fs::copy(audio_handle.path(), output)?;
                info!("Audio saved to {}", output.display());
            }
        }
        WorkflowState::Failed { message } => error!("{}", message),
        WorkflowState::Idle => warn!("Caption run cancelled"),
        WorkflowState::Running => {}
    }

    if metrics_config.exporter_type.eq_ignore_ascii_case("prometheus") {
        let exported = metrics.export().await?;
        debug!("Metrics:\n{}", String::from_utf8_lossy(&exported));
    }

    Ok(state)
}
