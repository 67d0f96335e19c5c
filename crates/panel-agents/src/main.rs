use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use consensus::{ContextProvider, EventContext, Expert, ExpertProfile, Orchestrator};
use panel_agents::{
    FileContextProvider, HttpGenerationBackend, JsonlConsensusSink, JsonlShadowSink, PanelConfig,
    Persona,
};

/// Run the expert panel for one game and print the final consensus.
#[derive(Parser, Debug)]
#[command(name = "panel-agents", version)]
struct Args {
    /// Event identifier, e.g. 2026-W1-HAR-RID
    #[arg(long)]
    event_id: String,

    /// Home team name
    #[arg(long)]
    home: String,

    /// Away team name
    #[arg(long)]
    away: String,

    /// Situational metadata as key=value pairs, repeatable
    #[arg(long = "meta", value_parser = parse_key_value)]
    metadata: Vec<(String, String)>,

    /// Prepared EventContext JSON file (overrides --meta)
    #[arg(long)]
    context_file: Option<String>,

    /// Personas to run, comma-separated (default: all)
    #[arg(long, value_delimiter = ',')]
    experts: Vec<String>,

    /// Wall-clock budget per expert, in seconds
    #[arg(long, default_value_t = 45)]
    timeout_secs: u64,

    /// Run the shadow path (requires PANEL_SHADOW_URL)
    #[arg(long)]
    shadow: bool,

    /// Live-path JSONL output file
    #[arg(long, default_value = ".panel-consensus.jsonl")]
    out: String,

    /// Shadow-path JSONL output file
    #[arg(long, default_value = ".panel-shadow.jsonl")]
    shadow_out: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config =
        PanelConfig::default().with_timeout(Duration::from_secs(args.timeout_secs));
    config.engine.shadow_enabled = args.shadow;

    info!(
        endpoint = %config.endpoint.url,
        model = %config.endpoint.model,
        shadow = args.shadow,
        "Panel starting"
    );

    let experts: Vec<Expert> = Persona::ALL
        .iter()
        .filter(|persona| {
            args.experts.is_empty() || args.experts.iter().any(|e| e == persona.expert_id())
        })
        .map(|&persona| {
            let backend = HttpGenerationBackend::new(
                config.endpoint.clone(),
                persona,
                config.temperature,
                config.max_tokens,
            );
            Expert::new(ExpertProfile::rookie(persona.expert_id()), Arc::new(backend))
        })
        .collect();

    let mut orchestrator = Orchestrator::new(config.engine.clone())
        .with_sink(Arc::new(JsonlConsensusSink::new(&args.out)));

    if args.shadow {
        let Some(shadow_endpoint) = config.shadow_endpoint.clone() else {
            anyhow::bail!("--shadow requires PANEL_SHADOW_URL to be set");
        };
        let shadow_backend = HttpGenerationBackend::new(
            shadow_endpoint,
            Persona::Quant,
            config.temperature,
            config.max_tokens,
        );
        orchestrator = orchestrator.with_shadow(
            Arc::new(shadow_backend),
            Arc::new(JsonlShadowSink::new(&args.shadow_out)),
        );
    }

    let context = match &args.context_file {
        Some(path) => {
            FileContextProvider::new(path)
                .fetch(&args.event_id)
                .await?
        }
        None => {
            let mut context = EventContext::bare(&args.event_id, &args.home, &args.away);
            context.metadata = args.metadata.clone();
            context
        }
    };

    let outcome = orchestrator.orchestrate(&context, &experts).await?;

    info!(
        degraded = outcome.telemetry.degraded_count,
        unresolved = outcome.consensus.unresolved,
        elapsed_ms = outcome.telemetry.elapsed_ms,
        "Panel finished"
    );
    println!("{}", serde_json::to_string_pretty(&outcome.consensus)?);

    Ok(())
}
