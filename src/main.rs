use std::process::ExitCode;

use admin_console::config::ClientConfig;
use admin_console::context::AppContext;
use admin_console::util::auth::post_login_destination;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "admin-console", version, about = "Probe the admin API session flow", long_about = None)]
struct Cli {
    /// Override API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the current session and print it
    Status,
    /// Sign in and print where the console would navigate
    Login {
        #[arg(long)]
        email: String,
        /// Falls back to ADMIN_PASSWORD
        #[arg(long)]
        password: Option<String>,
        /// Path requested before the login prompt
        #[arg(long)]
        redirect: Option<String>,
    },
    /// End the server-side session
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "client init failed");
            return ExitCode::FAILURE;
        }
    };
    ctx.start().await;

    match cli.command {
        Command::Status => {
            let snapshot = ctx.session.snapshot();
            match snapshot.user {
                Some(user) => println!("signed in as {} ({:?})", user.display_name(), user.role),
                None => println!("not signed in"),
            }
            ExitCode::SUCCESS
        }
        Command::Login { email, password, redirect } => {
            let Some(password) = password.or_else(|| std::env::var("ADMIN_PASSWORD").ok()) else {
                tracing::error!("no password given; pass --password or set ADMIN_PASSWORD");
                return ExitCode::FAILURE;
            };
            match ctx.session.login(&email, &password).await {
                Ok(()) => {
                    let user = ctx.session.user();
                    println!("{}", post_login_destination(redirect.as_deref(), user.as_ref()));
                    ExitCode::SUCCESS
                }
                Err(failure) => {
                    tracing::warn!(kind = ?failure.kind, "login failed");
                    eprintln!("{failure}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Logout => {
            ctx.session.logout().await;
            println!("signed out");
            ExitCode::SUCCESS
        }
    }
}
