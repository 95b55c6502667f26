//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use teamsite_core::config::Config;
use teamsite_core::logging;
use teamsite_core::session::SessionManager;
use teamsite_types::Lang;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "teamsite")]
#[command(version)]
#[command(about = "Command-line client for the team site")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Content language (en, es). Defaults to `lang` from config
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<Lang>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (read from stdin if omitted)
        #[arg(long, env = "TEAMSITE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register(commands::auth::RegisterArgs),

    /// Log out and remove stored tokens
    Logout,

    /// Show the logged-in member
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Check whether an email may register
    CheckEmail {
        /// Email to check
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Change the logged-in member's password (read from stdin)
    ChangePassword,

    /// Keep the session fresh until interrupted (Ctrl+C)
    Keepalive,

    /// Show the member dashboard
    Dashboard,

    /// Browse teams
    Teams {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Browse and manage members
    Members {
        #[command(subcommand)]
        command: MemberCommands,
    },

    /// Browse and manage publications
    Publications {
        #[command(subcommand)]
        command: PublicationCommands,
    },

    /// Site administrators
    Admins {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum TeamCommands {
    /// Lists all teams
    List,
    /// Shows one team
    Show {
        #[arg(value_name = "TEAM_ID")]
        id: i64,
    },
    /// Lists the members of a team
    Members {
        #[arg(value_name = "TEAM_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum MemberCommands {
    /// Lists members
    List {
        /// Only members of this team
        #[arg(long, value_name = "TEAM_ID")]
        team: Option<i64>,
    },
    /// Shows one member
    Show {
        #[arg(value_name = "MEMBER_ID")]
        id: i64,
    },
    /// Lists a member's social links
    Links {
        #[arg(value_name = "MEMBER_ID")]
        id: i64,
    },
    /// Activates a team member (team leaders only)
    Activate {
        #[arg(value_name = "MEMBER_ID")]
        id: i64,
    },
    /// Deactivates a team member (team leaders only)
    Deactivate {
        #[arg(value_name = "MEMBER_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum PublicationCommands {
    /// Lists publications
    List {
        /// Only publications of this team
        #[arg(long, value_name = "TEAM_ID")]
        team: Option<i64>,
    },
    /// Shows one publication
    Show {
        #[arg(value_name = "PUBLICATION_ID")]
        id: i64,
    },
    /// Creates a publication for your team
    Create(commands::content::PublicationArgs),
    /// Deletes a publication
    Delete {
        #[arg(value_name = "PUBLICATION_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum AdminCommands {
    /// Lists administrators
    List,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Set the default content language
    Lang {
        #[arg(value_name = "LANG")]
        lang: Lang,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("load config")?;
    let _log_guard = match logging::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let Cli { command, lang } = cli;
    let lang = lang.unwrap_or(config.lang);

    match command {
        // Config commands work without a reachable backend.
        Commands::Config { command } => run_config(command),
        command => {
            let session = SessionManager::from_config(&config).context("create session")?;
            debug!(base_url = session.api().base_url(), "Session ready");
            let result = dispatch_session(&session, &config, lang, command).await;
            session.shutdown();
            result
        }
    }
}

async fn dispatch_session(
    session: &SessionManager,
    config: &Config,
    lang: Lang,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            commands::auth::login(session, lang, email, password).await
        }
        Commands::Register(args) => commands::auth::register(session, lang, args).await,
        Commands::Logout => commands::auth::logout(session).await,
        Commands::Whoami => commands::auth::whoami(session, lang).await,
        Commands::Refresh => commands::auth::refresh(session).await,
        Commands::CheckEmail { email } => commands::auth::check_email(session, &email).await,
        Commands::ChangePassword => commands::auth::change_password(session).await,
        Commands::Keepalive => {
            commands::auth::keepalive(session, config.session.refresh_interval()).await
        }
        Commands::Dashboard => commands::dashboard::show(session, lang).await,

        Commands::Teams { command } => match command {
            TeamCommands::List => commands::content::teams_list(session, lang).await,
            TeamCommands::Show { id } => commands::content::teams_show(session, lang, id).await,
            TeamCommands::Members { id } => {
                commands::content::teams_members(session, lang, id).await
            }
        },

        Commands::Members { command } => match command {
            MemberCommands::List { team } => {
                commands::content::members_list(session, lang, team).await
            }
            MemberCommands::Show { id } => commands::content::members_show(session, lang, id).await,
            MemberCommands::Links { id } => commands::content::members_links(session, id).await,
            MemberCommands::Activate { id } => {
                commands::dashboard::set_member_active(session, lang, id, true).await
            }
            MemberCommands::Deactivate { id } => {
                commands::dashboard::set_member_active(session, lang, id, false).await
            }
        },

        Commands::Publications { command } => match command {
            PublicationCommands::List { team } => {
                commands::content::publications_list(session, lang, team).await
            }
            PublicationCommands::Show { id } => {
                commands::content::publications_show(session, lang, id).await
            }
            PublicationCommands::Create(args) => {
                commands::dashboard::create_publication(session, lang, args).await
            }
            PublicationCommands::Delete { id } => {
                commands::dashboard::delete_publication(session, lang, id).await
            }
        },

        Commands::Admins { command } => match command {
            AdminCommands::List => commands::content::admins_list(session).await,
        },

        Commands::Config { command } => run_config(command),
    }
}

fn run_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
        ConfigCommands::Lang { lang } => commands::config::set_lang(lang),
    }
}
