use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mapip::source::{KubeConfigMapSource, KubeNodeSource, ResourceSource};
use mapip::{app, telemetry, Config, MapIpError, SourceError, Sources};

fn main() -> ExitCode {
    let config = Config::parse();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("map-ip-k8s: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> mapip::Result<()> {
    config.validate()?;
    telemetry::init_logging(&config.log_level, config.log_format)?;

    info!("Starting map-ip-k8s v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Loaded configuration");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        on_signal.cancel();
    })
    .map_err(|e| MapIpError::Task(format!("failed to install signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| MapIpError::Task(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async move {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| SourceError::Kube {
                resource: "client".to_string(),
                source: e,
            })?;

        let mut sources = Sources::nodes(Arc::new(KubeNodeSource::new(client.clone())));
        if let Some(name) = config.config_map_name() {
            let source: Arc<dyn ResourceSource> =
                Arc::new(KubeConfigMapSource::new(client, &config.namespace, name));
            sources = sources.with_config_record(source);
        }

        app::run(config.app_options(), sources, cancel).await?;
        Ok::<(), MapIpError>(())
    })
}
