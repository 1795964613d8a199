//! llmroute - routing policy CLI
//!
//! Routes a single request against a policy document, validates policy
//! documents, and checks gateway configuration.

use clap::{Parser, Subcommand};
use llmroute::config::GatewayConfig;
use llmroute::observability::{init_default_logging, init_logging, LogFormat};
use llmroute::{
    extract_request_content, DeploymentPolicy, Environment, PolicyError, PolicyRouter, RouteError,
    RoutingPolicy,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, Level};

/// Content-aware routing for LLM API gateways
#[derive(Parser)]
#[command(name = "llmroute")]
#[command(about = "Route LLM API requests to backend endpoints by routing policy")]
#[command(version)]
struct Cli {
    /// Gateway configuration file path
    #[arg(short, long, value_name = "FILE", env = "LLMROUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route one request and print the decision
    Route {
        /// Routing policy document; defaults to the configured policy path
        #[arg(long, value_name = "FILE")]
        policy: Option<PathBuf>,
        /// Environment (production, sandbox); defaults to the configured one
        #[arg(long)]
        env: Option<Environment>,
        /// Request text to classify
        #[arg(long, conflicts_with = "body")]
        content: Option<String>,
        /// Chat-style JSON request body to extract the text from
        #[arg(long, value_name = "FILE")]
        body: Option<PathBuf>,
    },
    /// Parse a routing policy document and summarize it
    Validate {
        #[arg(long, value_name = "FILE")]
        policy: PathBuf,
        /// Print the parsed policy
        #[arg(long)]
        show: bool,
    },
    /// Validate gateway configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Call the classifier's health check
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose > 0 {
        let level = if cli.verbose > 1 {
            Level::TRACE
        } else {
            Level::DEBUG
        };
        init_logging(level, LogFormat::Compact, false);
    } else {
        init_default_logging();
    }

    let result = match cli.command {
        Commands::Route {
            policy,
            env,
            content,
            body,
        } => handle_route_command(cli.config.as_deref(), policy, env, content, body).await,
        Commands::Validate { policy, show } => handle_validate_command(&policy, show),
        Commands::Config { show, check } => {
            handle_config_command(cli.config.as_deref(), show, check).await
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        let fault = e.to_fault();
        match serde_json::to_string_pretty(&json!({ "fault": fault })) {
            Ok(text) => println!("{text}"),
            Err(_) => eprintln!("{}", fault.message),
        }
        process::exit(1);
    }
}

fn load_configuration(config_path: Option<&Path>) -> Result<Option<GatewayConfig>, RouteError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(Some(GatewayConfig::load_from_file(path)?));
    }

    for path_str in ["llmroute.toml", "config/llmroute.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(Some(GatewayConfig::load_from_file(&path)?));
        }
    }

    Ok(None)
}

async fn handle_route_command(
    config_path: Option<&Path>,
    policy_path: Option<PathBuf>,
    environment: Option<Environment>,
    content: Option<String>,
    body: Option<PathBuf>,
) -> Result<(), RouteError> {
    let config = match (load_configuration(config_path)?, policy_path.as_ref()) {
        (Some(config), _) => config,
        (None, Some(path)) => GatewayConfig::with_policy(path.clone(), Environment::default()),
        (None, None) => {
            return Err(RouteError::internal(
                "no routing policy given; pass --policy or configure [policy] path",
            ))
        }
    };

    // An explicit --policy wins over the configured one
    let policy_path = policy_path.unwrap_or_else(|| config.policy_path());
    let environment = environment.unwrap_or(config.policy.environment);
    let document = std::fs::read_to_string(&policy_path).map_err(PolicyError::Io)?;

    let content = match body {
        Some(body_path) => {
            let body = std::fs::read_to_string(&body_path)
                .map_err(|e| RouteError::internal(format!("failed to read request body: {e}")))?;
            extract_request_content(&body)
        }
        None => content,
    };

    let router = PolicyRouter::from_config(&config)?;
    let decision = router
        .route_document(&document, environment, content.as_deref())
        .await?;

    let output = json!({
        "environment": environment,
        "decision": decision,
        "properties": decision.to_properties(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|e| RouteError::internal(e.to_string()))?
    );

    Ok(())
}

fn handle_validate_command(policy_path: &Path, show: bool) -> Result<(), RouteError> {
    let policy = RoutingPolicy::load_from_file(policy_path)?;

    println!("✓ Routing policy is valid: {}", policy_path.display());
    println!("  Suspend duration: {}s", policy.suspend_duration);

    for environment in [Environment::Production, Environment::Sandbox] {
        match policy.deployment(environment) {
            Some(deployment) => {
                println!("  {environment}: {}", deployment_summary(deployment));
                if !deployment.has_valid_endpoints() {
                    println!("    ⚠ no valid endpoints; every request will be rejected");
                }
                let names = deployment.available_categories();
                if !names.is_empty() {
                    println!("    Categories: {}", names.join(", "));
                }
            }
            None => println!("  {environment}: not configured (requests are rejected)"),
        }
    }

    if show {
        let text = serde_json::to_string_pretty(&policy)
            .map_err(|e| RouteError::internal(e.to_string()))?;
        println!("\n{text}");
    }

    Ok(())
}

async fn handle_config_command(
    config_path: Option<&Path>,
    show: bool,
    check: bool,
) -> Result<(), RouteError> {
    let config = load_configuration(config_path)?.ok_or_else(|| {
        RouteError::internal(
            "No configuration file found. Provide one with -c/--config or create llmroute.toml",
        )
    })?;

    println!("✓ Configuration is valid");
    println!("  Policy: {}", config.policy_path().display());
    println!("  Environment: {}", config.policy.environment);

    match &config.classifier {
        Some(classifier) if classifier.enabled => {
            println!("  Classifier: {} at {}", classifier.model, classifier.base_url);
            if let Err(e) = config.get_classifier_api_key() {
                println!("  ⚠ {e}");
            }
        }
        _ => println!("  Classifier: disabled"),
    }

    if check {
        let router = PolicyRouter::from_config(&config)?;
        match router.check_classifier().await {
            Ok(()) => println!("  ✓ Classifier '{}' is reachable", router.classifier_name()),
            Err(e) => println!("  ⚠ Classifier check failed: {e}"),
        }
    }

    if show {
        let text = toml::to_string_pretty(&config)
            .map_err(|e| RouteError::internal(e.to_string()))?;
        println!("\n{text}");
    }

    Ok(())
}

/// One-line description of a deployment for `validate`
fn deployment_summary(deployment: &DeploymentPolicy) -> String {
    let default = deployment
        .valid_default_endpoint()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string());
    format!(
        "{} valid of {} categories, default endpoint {default}",
        deployment.category_count(),
        deployment.categories().len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmroute::{Category, EndpointRef};

    #[test]
    fn test_deployment_summary_counts_all_categories() {
        let deployment = DeploymentPolicy::new(
            Some(EndpointRef::new("m0", "ep-default")),
            vec![
                Category::new("Billing", "m1", "ep-billing"),
                Category::new("Broken", "m2", " "),
            ],
        );

        assert_eq!(
            deployment_summary(&deployment),
            "1 valid of 2 categories, default endpoint m0@ep-default"
        );
    }

    #[test]
    fn test_deployment_summary_without_default() {
        let deployment = DeploymentPolicy::new(None, vec![]);
        assert_eq!(
            deployment_summary(&deployment),
            "0 valid of 0 categories, default endpoint none"
        );
    }
}
