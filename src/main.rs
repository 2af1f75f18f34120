use anyhow::Result;
use clap::Parser;
use repguard::api::Registration;
use repguard::commands::{self, Services, Settings};
use repguard::runtime::RealRuntime;
use std::path::PathBuf;

/// repguard - Reputation Guardian client
///
/// Sign in to the Reputation Guardian backend and fetch your shop's review
/// dashboard, profile and feedback QR codes.
///
/// The session token is kept in the user config directory (or --store-dir)
/// and attached to every request until you log out.
///
/// Examples:
///   repguard login --email owner@shop.com
///   repguard dashboard
///   repguard qr get 64f0c0ffee --output qr.png
#[derive(Parser, Debug)]
#[command(author, version = env!("REPGUARD_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL (defaults to the production API; also via REPGUARD_API_URL)
    #[arg(long = "api-url", env = "REPGUARD_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Maximum attempts per request
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<usize>,

    /// Directory holding the stored session (also via REPGUARD_STORE_DIR)
    #[arg(long = "store-dir", env = "REPGUARD_STORE_DIR", value_name = "PATH", global = true)]
    pub store_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Create a shop account and sign in
    Register(RegisterArgs),

    /// Sign in and store the session token
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Check whether the stored session is still accepted
    Status,

    /// Show review metrics for the signed-in shop
    Dashboard,

    /// Show the signed-in shop's profile
    Profile,

    /// Feedback QR codes
    #[command(subcommand)]
    Qr(QrCommands),
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "REPGUARD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "REPGUARD_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long = "shop-name")]
    pub shop_name: String,

    #[arg(long = "shop-type")]
    pub shop_type: String,

    /// Push notification device token
    #[arg(long = "device-token")]
    pub device_token: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum QrCommands {
    /// Generate a QR code for the signed-in shop
    Generate {
        /// Save the decoded PNG here instead of printing base64
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Fetch the QR code of a shop by id
    Get {
        #[arg(value_name = "SHOP_ID")]
        shop_id: String,

        /// Save the decoded PNG here instead of printing base64
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let settings = Settings {
        api_url: cli.api_url,
        timeout_ms: cli.timeout_ms,
        retries: cli.retries,
        store_dir: cli.store_dir,
    };
    let services = Services::new(runtime, settings)?;

    let output = match cli.command {
        Commands::Register(args) => {
            let registration = Registration {
                email: args.email,
                password: args.password,
                shop_name: args.shop_name,
                shop_type: args.shop_type,
                device_token: args.device_token,
            };
            commands::register(&services, registration).await?
        }
        Commands::Login(args) => commands::login(&services, &args.email, &args.password).await?,
        Commands::Logout => commands::logout(&services).await?,
        Commands::Status => commands::status(&services).await?,
        Commands::Dashboard => commands::dashboard(&services).await?,
        Commands::Profile => commands::profile(&services).await?,
        Commands::Qr(QrCommands::Generate { output }) => {
            commands::qr_generate(&services, &runtime, output.as_deref()).await?
        }
        Commands::Qr(QrCommands::Get { shop_id, output }) => {
            commands::qr_get(&services, &runtime, &shop_id, output.as_deref()).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_login_parsing() {
        let cli = Cli::try_parse_from([
            "repguard",
            "login",
            "--email",
            "owner@shop.com",
            "--password",
            "secret1",
        ])
        .unwrap();
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.email, "owner@shop.com");
                assert_eq!(args.password, "secret1");
            }
            _ => panic!("Expected Login command"),
        }
    }

    #[test]
    fn test_cli_register_parsing() {
        let cli = Cli::try_parse_from([
            "repguard",
            "register",
            "--email",
            "owner@shop.com",
            "--password",
            "secret1",
            "--shop-name",
            "Bean",
            "--shop-type",
            "cafe",
        ])
        .unwrap();
        match cli.command {
            Commands::Register(args) => {
                assert_eq!(args.shop_name, "Bean");
                assert_eq!(args.device_token, None);
            }
            _ => panic!("Expected Register command"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "repguard",
            "dashboard",
            "--api-url",
            "http://127.0.0.1:5000",
            "--retries",
            "5",
            "--timeout-ms",
            "1000",
            "--store-dir",
            "/tmp/rg",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Dashboard));
        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:5000"));
        assert_eq!(cli.retries, Some(5));
        assert_eq!(cli.timeout_ms, Some(1000));
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/rg")));
    }

    #[test]
    fn test_cli_qr_get_parsing() {
        let cli =
            Cli::try_parse_from(["repguard", "qr", "get", "64f0c0ffee", "-o", "qr.png"]).unwrap();
        match cli.command {
            Commands::Qr(QrCommands::Get { shop_id, output }) => {
                assert_eq!(shop_id, "64f0c0ffee");
                assert_eq!(output, Some(PathBuf::from("qr.png")));
            }
            _ => panic!("Expected qr get command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["repguard"]).is_err());
    }

    #[test]
    fn test_cli_qr_requires_action() {
        assert!(Cli::try_parse_from(["repguard", "qr"]).is_err());
    }
}
