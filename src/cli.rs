use std::path::PathBuf;

/// Operator CLI for the Campus session core.
#[derive(Debug, clap::Parser)]
#[command(name = "campus-session", version)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, env = "CAMPUS_SETTINGS")]
    pub config: Option<PathBuf>,

    /// Override the API base URL from the settings file.
    #[arg(long, env = "CAMPUS_API_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Restore the stored session and report who it belongs to.
    Status,
    /// Log in with email and password.
    Login(LoginArgs),
    /// End the session, locally even if the server is unreachable.
    Logout,
    /// Issue an authenticated GET and print the response body.
    Get(GetArgs),
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Env var holding the password.
    #[arg(long, default_value = "CAMPUS_PASSWORD")]
    pub password_env: String,
}

#[derive(Debug, clap::Args)]
pub struct GetArgs {
    /// Path relative to the API base URL.
    pub path: String,
}
