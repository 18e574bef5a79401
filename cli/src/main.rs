use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{AgentReview, AuthContext, OrganizationApi};
use agent_http::HttpOrganizationApi;
use agentctl::commands::{self, FollowUp};
use agentctl::config::Config;
use agentctl::telemetry::{init_telemetry, log_startup_info, report_error};
use agentctl::{exit_code, EXIT_INTERRUPTED, EXIT_SUCCESS};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "agentctl")]
#[command(about = "Analyze an organization profile and generate AI agents")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Backend base URL override
    #[arg(long, env = "API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token of an existing session
    #[arg(long, env = "API_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit an organization profile and follow the analysis
    Analyze {
        /// Profile draft as JSON
        #[arg(long)]
        profile: PathBuf,

        /// Generate these recommended agents afterwards (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "generate_all")]
        generate: Vec<String>,

        /// Generate every recommended agent afterwards
        #[arg(long)]
        generate_all: bool,
    },
    /// Generate agents from template ids and follow the job
    Generate {
        #[arg(required = true)]
        templates: Vec<String>,
    },
    /// List generation jobs with dashboard statistics
    Jobs {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List past organization analyses
    Analyses {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List agents with activity and review counters
    Agents {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a generated agent
    Agent { id: String },
    /// Approve or reject a generated agent
    #[command(group(ArgGroup::new("verdict").required(true).args(["approve", "reject"])))]
    Review {
        id: String,

        #[arg(long)]
        approve: bool,

        #[arg(long, requires = "feedback")]
        reject: bool,

        /// Reason for the verdict; required when rejecting
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Exchange credentials for an API token
    Login {
        #[arg(long, env = "AGENTS_USERNAME")]
        username: String,

        #[arg(long, env = "AGENTS_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(ref api_url) = cli.api_url {
        config.api.base_url = api_url.clone();
    }

    if let Some(ref token) = cli.token {
        config.api.token = Some(token.clone());
    }

    if let Some(ref log_level) = cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).context("Failed to load configuration")?;

    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;
    config.validate().context("Invalid configuration")?;
    log_startup_info(&config);

    let auth = Arc::new(match &config.api.token {
        Some(token) => AuthContext::with_token(token.clone())?,
        None => AuthContext::new(),
    });
    let client = Arc::new(HttpOrganizationApi::new(config.to_client_settings(), auth)?);
    let api: Arc<dyn OrganizationApi> = client.clone();
    let policy = config.to_poll_policy();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Analyze {
            profile,
            generate,
            generate_all,
        } => {
            let draft = commands::read_draft(&profile)?;
            let follow_up = if generate_all {
                FollowUp::All
            } else if generate.is_empty() {
                FollowUp::None
            } else {
                FollowUp::Agents(generate)
            };
            commands::analyze(api, &policy, draft, follow_up, &mut out).await?;
        }
        Command::Generate { templates } => {
            commands::generate(api, &policy, templates, &mut out).await?;
        }
        Command::Jobs { json } => {
            commands::jobs(api, json, &mut out).await?;
        }
        Command::Analyses { json } => {
            commands::analyses(api, json, &mut out).await?;
        }
        Command::Agents { json } => {
            commands::agents(api, json, &mut out).await?;
        }
        Command::Agent { id } => {
            commands::show_agent(api, &id, &mut out).await?;
        }
        Command::Review {
            id,
            approve,
            feedback,
            ..
        } => {
            let review = if approve {
                AgentReview {
                    feedback,
                    ..AgentReview::approve(id)
                }
            } else {
                AgentReview::reject(id, feedback.unwrap_or_default())
            };
            commands::review(api, review, &mut out).await?;
        }
        Command::Login { username, password } => {
            let token = client.login(&username, &password).await?;
            writeln!(out, "{}", token.access_token)?;
            info!("Export the token as API_TOKEN to reuse the session");
        }
    }

    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                report_error(&e, "agentctl");
                eprintln!("Error: {e:#}");
                exit_code(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            // Dropping the command future aborts any polling task
            error!("Interrupted");
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}
