use anyhow::{Context, Result};
use clap::Parser;
use n8n_client::config::{ConfigOverrides, resolve_options};
use n8n_client::http::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};
use n8n_client::runtime::{RealRuntime, Runtime};
use n8n_client::{ApiClient, RetryPolicy};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// n8nc - command-line client for the n8n REST API
///
/// Connection settings come from the flags below or from the N8N_BASE_URL,
/// N8N_API_KEY, N8N_EMAIL, N8N_PASSWORD, N8N_USE_SESSION_AUTH,
/// N8N_COOKIE_FILE and N8N_INSECURE_SKIP_VERIFY environment variables.
/// Flags take precedence.
///
/// Examples:
///   n8nc get workflows?active=true
///   n8nc post tags --data '{"name": "prod"}'
#[derive(Parser, Debug)]
#[command(author, version = env!("N8NC_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Instance URL; the /api/v1/ prefix is added when missing
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// API key sent in the X-N8N-API-KEY header
    #[arg(long, value_name = "KEY", global = true)]
    api_key: Option<String>,

    /// Email for basic authentication
    #[arg(long, value_name = "EMAIL", global = true)]
    email: Option<String>,

    /// Password for basic authentication
    #[arg(long, value_name = "PASSWORD", global = true)]
    password: Option<String>,

    /// Authenticate with session cookies instead of a key or password
    #[arg(long, global = true)]
    session: bool,

    /// Netscape cookie file used with --session
    #[arg(long, value_name = "PATH", global = true)]
    cookie_file: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Retries after the first attempt for transient failures
    /// (0 falls back to the default of 3)
    #[arg(long, value_name = "N", global = true)]
    max_retries: Option<u32>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a GET request
    Get(PathArgs),

    /// Send a POST request with a JSON body
    Post(BodyArgs),

    /// Send a PUT request with a JSON body
    Put(BodyArgs),

    /// Send a PATCH request with a JSON body
    Patch(BodyArgs),

    /// Send a DELETE request
    Delete(PathArgs),

    /// Fetch every page of a paginated collection
    List(PathArgs),
}

#[derive(clap::Args, Debug)]
struct PathArgs {
    /// Path below /api/v1/, optionally with a query string
    #[arg(value_name = "PATH")]
    path: String,
}

#[derive(clap::Args, Debug)]
struct BodyArgs {
    /// Path below /api/v1/, optionally with a query string
    #[arg(value_name = "PATH")]
    path: String,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON", default_value = "{}")]
    data: String,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            use_session_auth: self.session.then_some(true),
            cookie_file: self.cookie_file.clone(),
            insecure_skip_verify: self.insecure.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    if let Some(output) = run(cli, &runtime).await? {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

async fn run<R: Runtime>(cli: Cli, runtime: &R) -> Result<Option<Value>> {
    let mut options = resolve_options(runtime, &cli.overrides())?;
    if let Some(secs) = cli.timeout {
        options.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(max_retries) = cli.max_retries {
        options.retry_policy = Some(RetryPolicy::new(
            max_retries,
            DEFAULT_BASE_DELAY,
            DEFAULT_MAX_DELAY,
        ));
    }

    let client = ApiClient::with_runtime(options, runtime)?;
    let mut output: Option<Value> = None;

    match cli.command {
        Commands::Get(args) => client.get(&args.path, Some(&mut output)).await?,
        Commands::Delete(args) => client.delete(&args.path, Some(&mut output)).await?,
        Commands::Post(args) => {
            client
                .post(&args.path, &parse_body(&args.data)?, Some(&mut output))
                .await?
        }
        Commands::Put(args) => {
            client
                .put(&args.path, &parse_body(&args.data)?, Some(&mut output))
                .await?
        }
        Commands::Patch(args) => {
            client
                .patch(&args.path, &parse_body(&args.data)?, Some(&mut output))
                .await?
        }
        Commands::List(args) => {
            output = Some(Value::Array(client.list_all(&args.path).await?));
        }
    }

    Ok(output)
}

fn parse_body(data: &str) -> Result<Value> {
    serde_json::from_str(data).context("--data must be valid JSON")
}
