use anyhow::Context;
use futures::StreamExt;
use scribe::{
    api::routes::build_app,
    cli::{
        output::{failure_message, Output},
        Cli, Commands,
    },
    research::ProgressEvent,
    types::ResearchRequest,
    utils::toml_config::{LogFormat, ScribeConfig, ScribeConfigManager},
    AppState,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so api_key_env lookups see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli.config, cli.verbose, &output).await,
        Some(Commands::Research { query, json }) => {
            research(&cli.config, cli.verbose, &output, query, json).await
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
    }
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<(Arc<ScribeConfigManager>, bool)> {
    if path.exists() {
        let manager = ScribeConfigManager::new(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok((Arc::new(manager), true))
    } else {
        let config = ScribeConfig::default();
        config.validate().context("Default configuration is invalid")?;
        Ok((Arc::new(ScribeConfigManager::from_config(config)), false))
    }
}

fn init_tracing(level: &str, format: LogFormat, to_stderr: bool) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "scribe={level},scribe_server={level},tower_http={level}",
            level = level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match (format, to_stderr) {
        (LogFormat::Json, true) => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        (LogFormat::Json, false) => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        (LogFormat::Text, true) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        (LogFormat::Text, false) => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config_path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let (manager, from_file) = load_config(config_path)?;
    let config = manager.config();

    let level = if verbose { "debug" } else { config.server.log_level.as_str() };
    init_tracing(level, config.server.log_format, false);

    output.banner();
    if from_file {
        manager
            .start_watching()
            .context("Failed to watch configuration file")?;
    } else {
        output.warning(&format!(
            "{} not found, running with default configuration",
            config_path.display()
        ));
    }

    let state = AppState::new(manager.clone());
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.kv("model", &format!("{:?} / {}", config.llm.provider, config.llm.model));
    output.kv("listening", &format!("http://{}", addr));
    tracing::info!(%addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    manager.stop_watching();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn research(
    config_path: &Path,
    verbose: bool,
    output: &Output,
    query: String,
    json: bool,
) -> anyhow::Result<()> {
    let (manager, _) = load_config(config_path)?;
    let config = manager.config();

    // Logs go to stderr so the report on stdout stays clean
    let level = if verbose { "debug" } else { "warn" };
    init_tracing(level, config.server.log_format, true);

    let query = ResearchRequest { query }.validated_query(config.research.max_query_chars)?;
    let pipeline = AppState::new(manager.clone()).pipeline(&config)?;

    let mut events = pipeline.run(query);
    let mut terminal = None;
    while let Some(event) = events.next().await {
        if !json {
            output.progress(&event);
        }
        if event.is_terminal() {
            terminal = Some(event);
        }
    }

    match terminal {
        Some(ProgressEvent::ReportReady { report, sources }) => {
            if json {
                let body = serde_json::json!({ "report": report, "sources": sources });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("\n{}\n", report.markdown_report.trim_end());
                if !report.follow_up_questions.is_empty() {
                    output.header("Follow-up questions");
                    for question in &report.follow_up_questions {
                        output.list_item(question);
                    }
                }
            }
            Ok(())
        }
        Some(failure) => anyhow::bail!(failure_message(&failure)),
        None => anyhow::bail!("Research ended without a result"),
    }
}

fn show_config(config_path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    if validate {
        ScribeConfig::load(config_path)
            .with_context(|| format!("{} is invalid", config_path.display()))?;
        output.success(&format!("{} is valid", config_path.display()));
        return Ok(());
    }

    let (manager, from_file) = load_config(config_path)?;
    let config = manager.config();

    output.header("Configuration");
    if from_file {
        output.kv("file", &config_path.display().to_string());
    } else {
        output.kv("file", "(defaults)");
    }
    output.kv("provider", &format!("{:?}", config.llm.provider));
    output.kv("model", &config.llm.model);
    output.kv("search mode", &format!("{:?}", config.research.search_mode));
    println!("\n{}", config.to_toml()?);
    Ok(())
}
