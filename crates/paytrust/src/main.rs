use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use paytrust::{Client, ClientConfig, ClientError, HttpMethod};

/// Paytrust: signed and verified payment gateway calls.
#[derive(Parser, Debug)]
#[command(name = "paytrust", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the Authorization header for a request
    Sign {
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Path and query exactly as sent, e.g. /v3/certificates
        path: String,

        /// Request body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the request body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Download and list trusted platform certificates
    Certificates,

    /// Decrypt a webhook notification body
    Decrypt {
        /// File holding the raw notification JSON
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("paytrust=debug,paytrust_auth=debug,paytrust_notify=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("paytrust=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientConfig, ClientError> {
    match path {
        Some(p) => ClientConfig::load(p),
        None => {
            let default_path = ClientConfig::default_config_path();
            ClientConfig::load(&default_path)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ClientError> {
    let config = load_config(cli.config.as_ref())?;
    let client = Client::from_config(config)?;

    match cli.command {
        Commands::Sign {
            method,
            path,
            body,
            body_file,
        } => cmd_sign(&client, &method, &path, body, body_file),
        Commands::Certificates => cmd_certificates(&client),
        Commands::Decrypt { file } => cmd_decrypt(&client, &file),
    }
}

fn cmd_sign(
    client: &Client,
    method: &str,
    path: &str,
    body: Option<String>,
    body_file: Option<PathBuf>,
) -> Result<(), ClientError> {
    let method: HttpMethod = method.parse()?;
    let body = match (body, body_file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(file)) => std::fs::read(&file)?,
        (None, None) => Vec::new(),
    };

    let prepared = client.prepare_raw(method, path, body)?;
    println!("{}", prepared.authorization);
    Ok(())
}

fn cmd_certificates(client: &Client) -> Result<(), ClientError> {
    let certs = client.certificates()?;
    info!(count = certs.len(), "platform certificates downloaded");

    for cert in certs {
        println!(
            "{}  effective {}  expires {}",
            cert.serial_no, cert.effective_time, cert.expire_time
        );
    }
    Ok(())
}

fn cmd_decrypt(client: &Client, file: &Path) -> Result<(), ClientError> {
    let raw = std::fs::read(file)?;
    let notification = client.parse_notification(&raw)?;

    println!("id:         {}", notification.id());
    println!("event_type: {}", notification.event());
    if !notification.event().is_known() {
        println!("warning:    unrecognised event type");
    }
    println!("{}", String::from_utf8_lossy(&notification.plaintext));
    Ok(())
}
