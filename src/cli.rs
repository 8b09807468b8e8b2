use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

use dualcare::config::{AppConfig, AuthConfig, ConfigFile};

const DEFAULT_APP_NAME: &str = "DualCare";
const DEFAULT_AUTH_COOKIE_NAME: &str = "dualcare_auth";

pub(crate) enum RunOutcome {
    Serve { config: AppConfig, addr: SocketAddr },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::AuthKey) = cli.command {
        return RunOutcome::Exit(run_auth_key());
    }

    let file = match cli.config.as_ref() {
        Some(path) => match ConfigFile::load(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => ConfigFile::default(),
    };

    let auth = match resolve_auth_config(&cli, &file) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let app_name = cli
        .app_name
        .clone()
        .or(file.app_name)
        .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

    RunOutcome::Serve {
        config: AppConfig { app_name, auth },
        addr: cli.bind,
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "dualcare",
    version,
    about = "Caregiver and care-recipient coordination server"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "DUALCARE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:3000", env = "DUALCARE_BIND")]
    bind: SocketAddr,
    #[arg(long)]
    app_name: Option<String>,
    #[arg(long, env = "DUALCARE_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "DUALCARE_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "DUALCARE_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "DUALCARE_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random session-signing key.
    AuthKey,
}

fn run_auth_key() -> i32 {
    let secret = match dualcare::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn resolve_auth_config(cli: &Cli, file: &ConfigFile) -> Result<Option<AuthConfig>, String> {
    let auth_key = cli.auth_key.as_deref().or(file.auth_key.as_deref());
    let token_ttl = cli
        .auth_token_ttl
        .as_deref()
        .or(file.auth_token_ttl.as_deref());
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .or(file.auth_cookie_name.as_deref());
    let cookie_secure = cli.auth_cookie_secure || file.auth_cookie_secure.unwrap_or(false);

    let has_any = auth_key.is_some() || token_ttl.is_some() || cookie_name.is_some() || cookie_secure;
    if !has_any {
        return Ok(None);
    }

    let auth_key = auth_key
        .ok_or("auth is configured but --auth-key is missing")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cookie_name
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match token_ttl {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cookie_name
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(Some(AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
        cookie_secure,
    }))
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("auth token ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
