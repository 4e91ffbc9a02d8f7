use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use onto_auth::cache::SessionKey;
use onto_auth::utils::config_loader;
use onto_auth::utils::logging::{self, LogLevel};
use onto_auth::Authenticator;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config; the environment is used when omitted
    #[arg(short, long, env = "CONFIG")]
    config: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// session key, required by the session-state token store
    #[arg(long, env = "ONTO_SESSION")]
    session: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "ONTO_PASSWORD")]
        password: String,
    },
    /// Log in with the configured client secret
    ClientLogin,
    /// Print the authorization-code flow URL
    AuthorizeUrl {
        #[arg(long)]
        redirect_uri: String,
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange an authorization code for tokens
    ExchangeCode {
        #[arg(long)]
        code: String,
        #[arg(long)]
        redirect_uri: String,
    },
    /// Store an access token obtained elsewhere
    ManualToken {
        #[arg(long)]
        token: String,
    },
    /// Print a valid access token, refreshing it if needed
    Token,
    /// Print session diagnostics as JSON
    Status,
    /// Revoke and clear the stored tokens
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(args.config.as_deref()).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Build authenticator for the configured deployment mode
    // -------------------------------

    let auth = Authenticator::from_config(&service_config).await?;
    let session = args.session.and_then(SessionKey::new);
    let session = session.as_ref();
    info!("mode: {:?}", service_config.mode);

    // -------------------------------
    // 3. Run command
    // -------------------------------

    match args.command {
        Command::Login { username, password } => {
            auth.login_with_password(session, &username, &password).await?;
            println!("Authenticated as {}", username);
        }
        Command::ClientLogin => {
            auth.login_with_client_credentials(session).await?;
            println!("Client credentials authentication successful");
        }
        Command::AuthorizeUrl { redirect_uri, state } => {
            println!("{}", auth.authorization_url(&redirect_uri, state.as_deref()));
        }
        Command::ExchangeCode { code, redirect_uri } => {
            auth.complete_authorization(session, &code, &redirect_uri).await?;
            println!("Authorization code exchanged");
        }
        Command::ManualToken { token } => {
            auth.store_manual_token(session, &token).await?;
            println!("Token stored");
        }
        Command::Token => {
            let token = auth
                .get_valid_access_token(session)
                .await
                .ok_or_else(|| anyhow!("not authenticated, log in again"))?;
            println!("{}", token);
        }
        Command::Status => {
            let info = auth.session_info(session).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Logout => {
            let revoked = auth.logout(session).await?;
            if revoked {
                println!("Logged out");
            } else {
                println!("Logged out (token revocation failed, local tokens cleared)");
            }
        }
    }

    Ok(())
}
