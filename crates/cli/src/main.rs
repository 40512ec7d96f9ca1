//! SleepWise CLI
//!
//! A command-line client for logging daily health metrics, requesting
//! sleep quality predictions and viewing the trend dashboard.

mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{auth, dashboard, log, predict};
use sleepwise_core::{
    flows::Notice, models::RawMetrics, models::Window, observability, ApiClient, ClientConfig,
    ClientMetrics, FileSession,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// SleepWise sleep coach CLI
#[derive(Parser)]
#[command(name = "sleepwise")]
#[command(author, version, about = "CLI for the SleepWise sleep coach", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SLEEPWISE_API_URL env var)
    #[arg(long, env = "SLEEPWISE_API_URL")]
    pub api_url: Option<String>,

    /// Path to a JSON config file (defaults to ~/.config/sleepwise/config.json)
    #[arg(long, env = "SLEEPWISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Print client metrics in Prometheus text format after the command
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session credential
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "SLEEPWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create a new account
    Signup {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "SLEEPWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Remove the stored session credential
    Logout,

    /// Predict sleep quality from today's metrics
    Predict(MetricsArgs),

    /// Store today's metrics
    Log(MetricsArgs),

    /// Show trends for the last 7, 14 or 30 days
    Dashboard {
        /// Window in days (7, 14 or 30)
        #[arg(long, short, default_value = "7", value_parser = parse_window)]
        days: Window,
    },

    /// Ask the coach for a tip on a known risk and drivers
    ///
    /// Only age, gender, sleep, stress, steps and BMI are sent; blood
    /// pressure, heart rate and activity are not needed.
    Coach {
        #[command(flatten)]
        metrics: MetricsArgs,

        /// Disorder risk from an earlier prediction
        #[arg(long, default_value = "None")]
        risk: String,

        /// Top driver from an earlier prediction (repeatable)
        #[arg(long = "driver")]
        drivers: Vec<String>,
    },

    /// Report whether you followed the last tip
    Feedback {
        /// You followed the tip
        #[arg(long)]
        followed: bool,

        /// Mark the tip as not acknowledged
        #[arg(long)]
        unacknowledged: bool,
    },
}

/// Daily health metrics as entered on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct MetricsArgs {
    /// Age in years (1-120)
    #[arg(long)]
    pub age: Option<String>,

    /// Male, Female or Other
    #[arg(long)]
    pub gender: Option<String>,

    /// Hours slept (0-24)
    #[arg(long, visible_alias = "sleep")]
    pub sleep_duration: Option<String>,

    /// Stress level (1-10)
    #[arg(long, visible_alias = "stress")]
    pub stress_level: Option<String>,

    /// Steps walked today
    #[arg(long, visible_alias = "steps")]
    pub daily_steps: Option<String>,

    /// Normal, Overweight or Obese
    #[arg(long, visible_alias = "bmi")]
    pub bmi_category: Option<String>,

    /// Blood pressure as systolic/diastolic, e.g. 120/80
    #[arg(long, visible_alias = "bp")]
    pub blood_pressure: Option<String>,

    /// Resting heart rate (30-220)
    #[arg(long)]
    pub heart_rate: Option<String>,

    /// Minutes of physical activity
    #[arg(long, visible_alias = "activity")]
    pub physical_activity: Option<String>,
}

impl From<MetricsArgs> for RawMetrics {
    fn from(args: MetricsArgs) -> Self {
        RawMetrics {
            age: args.age,
            gender: args.gender,
            sleep_duration: args.sleep_duration,
            stress_level: args.stress_level,
            daily_steps: args.daily_steps,
            bmi_category: args.bmi_category,
            blood_pressure: args.blood_pressure,
            heart_rate: args.heart_rate,
            physical_activity: args.physical_activity,
        }
    }
}

fn parse_window(s: &str) -> std::result::Result<Window, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    observability::init_logging(level, cli.log_json);

    let format = cli.format;
    let print_metrics = cli.metrics;

    let outcome = run(cli).await;

    if print_metrics {
        match ClientMetrics::new().render() {
            Ok(text) => eprintln!("{}", text),
            Err(e) => debug!(error = %e, "Failed to render metrics"),
        }
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_notice(&Notice::from_any(&err), format);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(Some(path))?,
        None => ClientConfig::load()?,
    };
    let config = match cli.api_url {
        Some(url) => config.with_api_url(url),
        None => config,
    };
    debug!(api_url = %config.api_url, "Configuration loaded");

    let session = Arc::new(FileSession::new(config.session_path()?));
    let client = Arc::new(ApiClient::new(&config, session.clone())?);

    match cli.command {
        Commands::Login { email, password } => {
            auth::login(&client, &session, email, password, cli.format).await?;
        }
        Commands::Signup { email, password } => {
            auth::signup(&client, email, password, cli.format).await?;
        }
        Commands::Logout => {
            auth::logout(&session).await?;
        }
        Commands::Predict(metrics) => {
            predict::predict(&client, metrics.into(), cli.format).await?;
        }
        Commands::Log(metrics) => {
            log::log_day(&client, metrics.into(), cli.format).await?;
        }
        Commands::Dashboard { days } => {
            dashboard::show_dashboard(client, days, cli.format).await?;
        }
        Commands::Coach {
            metrics,
            risk,
            drivers,
        } => {
            predict::coach(&client, metrics.into(), risk, drivers, cli.format).await?;
        }
        Commands::Feedback {
            followed,
            unacknowledged,
        } => {
            predict::feedback(&client, followed, !unacknowledged, cli.format).await?;
        }
    }

    Ok(())
}
