mod config;

use std::fmt;
use std::net::SocketAddr;

use api::{AppState, build_router, cors_layer};
use services::{AppServices, Clock};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_LOG_FILTER, LogFormat, Settings};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
    MissingFlag { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study-server serve      [--db <sqlite_url>] [--port <port>]");
    eprintln!(
        "  study-server seed-admin --email <email> --password <password> --name <full name> [--db <sqlite_url>]"
    );
    eprintln!();
    eprintln!("Defaults for serve:");
    eprintln!("  --db sqlite://study.sqlite3");
    eprintln!("  --port 8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_PORT, STUDY_JWT_SECRET (required, 32+ bytes)");
    eprintln!("  STUDY_ACCESS_TTL_MINUTES, STUDY_REFRESH_TTL_DAYS, STUDY_BCRYPT_COST");
    eprintln!("  STUDY_CORS_ORIGIN, STUDY_LOG_FORMAT=json, RUST_LOG");
    eprintln!("  STUDY_AI_API_KEY, STUDY_AI_BASE_URL, STUDY_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    SeedAdmin,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed-admin" => Some(Self::SeedAdmin),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Overrides {
    db_url: Option<String>,
    port: Option<u16>,
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

impl Overrides {
    fn parse(
        command: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut out = Self::default();
        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    out.db_url = Some(value);
                }
                (Command::Serve, "--port") => {
                    let value = require_value(args, "--port")?;
                    let port = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
                    out.port = Some(port);
                }
                (Command::SeedAdmin, "--email") => {
                    out.email = Some(require_value(args, "--email")?);
                }
                (Command::SeedAdmin, "--password") => {
                    out.password = Some(require_value(args, "--password")?);
                }
                (Command::SeedAdmin, "--name") => {
                    out.name = Some(require_value(args, "--name")?);
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::SeedAdmin {
            for (value, flag) in [
                (&out.email, "--email"),
                (&out.password, "--password"),
                (&out.name, "--name"),
            ] {
                if value.is_none() {
                    return Err(ArgsError::MissingFlag { flag });
                }
            }
        }
        Ok(out)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// The pool creates the database file itself; only its directory must exist.
fn ensure_db_dir(db_url: &str) -> std::io::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means serve.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let overrides = Overrides::parse(cmd, &mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut settings = Settings::from_env()?;
    if let Some(db_url) = overrides.db_url.clone() {
        settings.db_url = db_url;
    }
    if let Some(port) = overrides.port {
        settings.port = port;
    }
    settings.db_url = normalize_sqlite_url(settings.db_url);

    init_tracing(settings.log_format);

    ensure_db_dir(&settings.db_url)?;
    let services =
        AppServices::new_sqlite(&settings.db_url, Clock::default_clock(), settings.services)
            .await?;

    match cmd {
        Command::Serve => {
            let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
            let router = build_router(
                AppState::new(services),
                cors_layer(settings.cors_origin.as_deref()),
            );
            tracing::info!(%addr, db = %settings.db_url, "starting study server");
            let listener = TcpListener::bind(addr).await?;
            api::serve(listener, router).await?;
            Ok(())
        }
        Command::SeedAdmin => {
            let (Some(email), Some(password), Some(name)) =
                (overrides.email, overrides.password, overrides.name)
            else {
                return Err(ArgsError::MissingFlag { flag: "--email" }.into());
            };
            let seeded = services
                .auth()
                .seed_admin(&email, &password, &name)
                .await?;
            let verb = if seeded.created { "created" } else { "promoted" };
            println!(
                "{verb} admin {} (id {})",
                seeded.user.email().as_str(),
                seeded.user.id()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(command: Command, args: &[&str]) -> Result<Overrides, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Overrides::parse(command, &mut iter)
    }

    #[test]
    fn serve_accepts_db_and_port() {
        let parsed = parse(Command::Serve, &["--db", "sqlite://x.db", "--port", "9090"]).unwrap();
        assert_eq!(parsed.db_url.as_deref(), Some("sqlite://x.db"));
        assert_eq!(parsed.port, Some(9090));
    }

    #[test]
    fn serve_rejects_seed_flags_and_bad_ports() {
        assert!(matches!(
            parse(Command::Serve, &["--email", "a@b.ng"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(Command::Serve, &["--port", "eighty"]),
            Err(ArgsError::InvalidPort { .. })
        ));
        assert!(matches!(
            parse(Command::Serve, &["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn seed_admin_requires_all_identity_flags() {
        assert!(matches!(
            parse(Command::SeedAdmin, &["--email", "root@unilag.edu.ng"]),
            Err(ArgsError::MissingFlag { flag: "--password" })
        ));
        let parsed = parse(
            Command::SeedAdmin,
            &[
                "--email",
                "root@unilag.edu.ng",
                "--password",
                "admin-pass-123",
                "--name",
                "Root",
            ],
        )
        .unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Root"));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".into()),
            "sqlite://already.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert!(normalize_sqlite_url("data/study.db".into()).ends_with("/data/study.db"));
    }
}
