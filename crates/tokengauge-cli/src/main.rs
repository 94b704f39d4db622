use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tokengauge_bench::{Selection, SessionRunner};
use tokengauge_core::{PromptSet, ServiceDescriptor, ServiceKind, SessionReport};

mod discovery;
mod menu;
mod models;
mod prompt_store;
mod remote;

use discovery::ServiceProbe;
use prompt_store::CustomPromptStore;
use remote::RemoteServerStore;

#[derive(Parser)]
#[command(name = "tokengauge")]
#[command(about = "Benchmark text-generation services over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark session without menus
    Bench {
        /// Service kind: ollama, vllm, or llamacpp
        #[arg(short, long)]
        service: ServiceKind,

        /// Base URL (defaults to the service's local host)
        #[arg(short, long)]
        url: Option<String>,

        /// Model to benchmark
        #[arg(short, long, default_value = "default")]
        model: String,

        /// Prompt names to run (repeatable)
        #[arg(short, long = "prompt")]
        prompts: Vec<String>,

        /// Run every prompt, built-in and custom
        #[arg(long, conflicts_with = "prompts")]
        all: bool,

        /// Extra header as NAME:VALUE (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,
    },

    /// List the models a service can serve
    Models {
        /// Service kind: ollama, vllm, or llamacpp
        #[arg(short, long)]
        service: ServiceKind,

        /// Base URL (defaults to the service's local host)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Probe all known local services and report
    Status,

    /// Manage custom prompts
    Prompts {
        #[command(subcommand)]
        action: PromptAction,
    },
}

#[derive(Subcommand)]
enum PromptAction {
    /// List built-in and custom prompts
    List,
    /// Add a custom prompt
    Add { text: String },
    /// Remove a custom prompt by name
    Rm { name: String },
}

fn results_dir() -> PathBuf {
    std::env::var("TOKENGAUGE_RESULTS_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("results"))
}

fn parse_headers(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .with_context(|| format!("header '{}' is not NAME:VALUE", h))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn all_prompts() -> PromptSet {
    let mut set = PromptSet::builtin();
    CustomPromptStore::load().merge_into(&mut set);
    set
}

fn spawn_ctrl_c(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received, finishing up...");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Bench {
            service,
            url,
            model,
            prompts,
            all,
            headers,
        }) => cmd_bench(service, url, model, prompts, all, headers).await,
        Some(Commands::Models { service, url }) => cmd_models(service, url).await,
        Some(Commands::Status) => cmd_status().await,
        Some(Commands::Prompts { action }) => cmd_prompts(action),
        None => run_interactive().await,
    }
}

async fn cmd_bench(
    kind: ServiceKind,
    url: Option<String>,
    model: String,
    prompt_names: Vec<String>,
    all: bool,
    headers: Vec<String>,
) -> anyhow::Result<()> {
    if !all && prompt_names.is_empty() {
        anyhow::bail!("select prompts with --prompt NAME or run everything with --all");
    }

    let base_url = url.unwrap_or_else(|| discovery::host_for(kind));
    let service = ServiceDescriptor::new(kind, base_url)
        .with_model(model)
        .with_headers(parse_headers(&headers)?);

    let selection = if all {
        Selection::All
    } else {
        Selection::Named(prompt_names)
    };

    run_session(service, all_prompts(), selection).await
}

async fn run_session(
    service: ServiceDescriptor,
    prompts: PromptSet,
    selection: Selection,
) -> anyhow::Result<()> {
    println!(
        "\nBenchmarking {} at {} with model: {}",
        service.display_name(),
        service.base_url,
        service.model
    );

    let cancel = CancellationToken::new();
    spawn_ctrl_c(&cancel);

    let runner = SessionRunner::new(service, prompts)?.results_dir(results_dir());
    let report = runner.run(&selection, &cancel).await?;
    print_report(&report);

    if report.completed.is_empty() && !report.cancelled {
        anyhow::bail!("no prompt completed successfully");
    }
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!();
    if report.cancelled {
        println!("Session interrupted.");
    }
    println!(
        "Benchmark complete! {} successful run(s) out of {} attempted.",
        report.completed.len(),
        report.attempted
    );
    if let Some(path) = &report.log_path {
        println!("Results saved to: {}", path.display());
    }

    for metrics in &report.completed {
        println!("\n{}", "=".repeat(60));
        println!("BENCHMARK RESULTS: {}", metrics.prompt_name);
        println!("Service: {}", metrics.service_name);
        println!("{}", "=".repeat(60));
        println!("Total Request Time:     {:.3} seconds", metrics.total_time);
        println!("Prompt Delay Time:      {:.3} seconds", metrics.prompt_delay_time);
        println!("Generation Time:        {:.3} seconds", metrics.generation_time);
        println!("Total Tokens Generated: {}", metrics.total_tokens);
        println!("Generation Speed:       {:.2} tokens/sec", metrics.tokens_per_second);
        println!(
            "Overall Request Speed:  {:.2} tokens/sec",
            metrics.request_tokens_per_second
        );
    }

    if let Some(summary) = &report.summary {
        println!("\n{}", "=".repeat(80));
        println!("BENCHMARK SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Prompts Tested:           {}", summary.runs);
        println!("Average Total Time:       {:.3} seconds", summary.avg_total_time);
        println!("Average Prompt Delay:     {:.3} seconds", summary.avg_prompt_delay_time);
        println!("Average Generation Time:  {:.3} seconds", summary.avg_generation_time);
        println!("Average Tokens Generated: {:.1}", summary.avg_total_tokens);
        println!(
            "Average Generation Speed: {:.2} tokens/sec",
            summary.avg_tokens_per_second
        );
        println!(
            "Average Request Speed:    {:.2} tokens/sec",
            summary.avg_request_tokens_per_second
        );
    }
}

async fn cmd_models(kind: ServiceKind, url: Option<String>) -> anyhow::Result<()> {
    let base_url = url.unwrap_or_else(|| discovery::host_for(kind));
    let service = ServiceDescriptor::new(kind, base_url);
    let models = models::list_models(&service).await?;

    println!("\nModels served by {} at {}:", service.display_name(), service.base_url);
    for model in &models {
        println!("  {}", model);
    }
    Ok(())
}

async fn cmd_status() -> anyhow::Result<()> {
    let probe = ServiceProbe::new()?;
    println!("\nService Status:");
    println!("{:-<50}", "");
    for kind in [ServiceKind::Ollama, ServiceKind::Vllm, ServiceKind::LlamaCpp] {
        let detected = probe.probe_kind(kind).await;
        println!(
            "  {:<10} {:<28} {}",
            detected.kind.display_name(),
            detected.base_url,
            detected.status()
        );
    }
    Ok(())
}

fn cmd_prompts(action: PromptAction) -> anyhow::Result<()> {
    match action {
        PromptAction::List => {
            let set = all_prompts();
            println!("\nAvailable prompts:");
            for job in set.iter() {
                let preview: String = job.text.chars().take(60).collect();
                println!("  {:<12} {}", job.name, preview);
            }
        }
        PromptAction::Add { text } => {
            let mut store = CustomPromptStore::load();
            let name = store.add(&text)?;
            println!("Saved as '{}'", name);
        }
        PromptAction::Rm { name } => {
            let mut store = CustomPromptStore::load();
            if store.remove(&name)? {
                println!("Removed '{}'", name);
            } else {
                anyhow::bail!("no custom prompt named '{}'", name);
            }
        }
    }
    Ok(())
}

async fn run_interactive() -> anyhow::Result<()> {
    let Some(connection) = menu::connection_type_menu() else {
        return Ok(());
    };

    let probe = ServiceProbe::new()?;
    let (detected, auth_headers) = match connection {
        menu::ConnectionType::Local => {
            println!("\nProbing local services...");
            let services = probe.detect_local().await;
            let Some(selected) = menu::service_menu(&services) else {
                return Ok(());
            };
            (selected.clone(), Vec::new())
        }
        menu::ConnectionType::Remote => {
            let mut store = RemoteServerStore::load();
            let Some(input) = menu::remote_server_menu(store.servers()) else {
                return Ok(());
            };
            let server_url = remote::normalize_server_url(&input)?;
            store.remember(&server_url);

            let headers = remote::auth_headers(menu::api_key_prompt().as_deref());
            println!("\nTesting connection to {}...", server_url);
            let detected = probe.detect_remote(&server_url, &headers).await;
            if detected.kind == ServiceKind::Unknown {
                anyhow::bail!("could not identify the service at {}", server_url);
            }
            println!("Detected: {}", detected.kind.display_name());
            (detected, headers)
        }
    };

    let service = ServiceDescriptor::new(detected.kind, detected.base_url.clone())
        .with_headers(auth_headers);

    println!("\nFetching available models...");
    let model = match models::list_models(&service).await {
        Ok(model_names) => match menu::model_menu(&model_names) {
            Some(model) => model,
            None => return Ok(()),
        },
        Err(e) => {
            tracing::warn!("Could not list models: {}", e);
            println!("Could not fetch model list. Using default model.");
            "default".to_string()
        }
    };
    let service = service.with_model(model);

    let prompts = all_prompts();
    let Some(selection) = menu::prompt_menu(&prompts) else {
        return Ok(());
    };

    run_session(service, prompts, selection).await
}
