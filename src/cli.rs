use crate::config::{resolve_db_path, ToolConfig, INSTALL_DIR};
use crate::db::SettingsRepository;
use crate::diagnostic::{OperatorConsole, WebhookDiagnostic};
use crate::errors::{AppError, AppResult};
use crate::models::{KnownSetting, SETTINGS_TABLE};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "armaguard-settings", author, version, about, long_about = None)]
pub struct Cli {
    /// Database file (defaults to the service's own location)
    #[arg(long, global = true, env = "ARMAGUARD_DB")]
    pub db: Option<PathBuf>,

    /// How long to wait on a locked database before failing
    #[arg(long, global = true, env = "ARMAGUARD_BUSY_TIMEOUT_MS", default_value_t = 5_000)]
    pub busy_timeout_ms: u64,

    /// Write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "ARMAGUARD_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "ARMAGUARD_LOG", default_value = crate::config::DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the live columns of security_settings
    Columns,

    /// Print the settings row
    Show {
        /// Print as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Reset the settings row to factory defaults, creating it if needed
    Init,

    /// Change a single known setting
    Set {
        /// Column name, e.g. protection_level
        column: String,
        /// New value; booleans accept 1/0, true/false, on/off
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Inspect the Discord webhook and offer to disable it
    Webhook,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Show { .. } => "show",
            Self::Init => "init",
            Self::Set { .. } => "set",
            Self::Webhook => "webhook",
        }
    }
}

impl Cli {
    pub fn config(&self) -> ToolConfig {
        ToolConfig {
            db_path: resolve_db_path(self.db.as_deref(), Path::new(INSTALL_DIR)),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            log_dir: self.log_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

pub fn dispatch<C: OperatorConsole>(command: &Command, repo: &SettingsRepository, console: &mut C) -> AppResult<()> {
    tracing::debug!(command = command.name(), db = %repo.db_path().display(), "dispatching");
    match command {
        Command::Columns => print_columns(repo, console),
        Command::Show { json } => print_settings(repo, *json, console),
        Command::Init => initialize(repo, console),
        Command::Set { column, value } => set_field(repo, column, value, console),
        Command::Webhook => WebhookDiagnostic::new(repo).run(console).map(|_| ()),
    }
}

fn print_columns<C: OperatorConsole>(repo: &SettingsRepository, console: &mut C) -> AppResult<()> {
    let schema = repo.columns()?;
    if schema.is_empty() {
        console.say(&format!("Table {} not found.", SETTINGS_TABLE))?;
        return Ok(());
    }

    console.say(&format!("=== {} columns ===", SETTINGS_TABLE))?;
    for column in schema.columns() {
        let mut flags = Vec::new();
        if column.primary_key {
            flags.push("primary key".to_string());
        }
        if column.not_null {
            flags.push("not null".to_string());
        }
        if let Some(default) = &column.default_value {
            flags.push(format!("default {}", default));
        }
        let declared = if column.declared_type.is_empty() {
            "(none)"
        } else {
            column.declared_type.as_str()
        };
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        console.say(&format!("Column: {}, Type: {}{}", column.name, declared, suffix))?;
    }
    Ok(())
}

fn print_settings<C: OperatorConsole>(repo: &SettingsRepository, json: bool, console: &mut C) -> AppResult<()> {
    let snapshot = repo.describe()?;
    if json {
        console.say(&serde_json::to_string_pretty(&snapshot.to_json())?)?;
        return Ok(());
    }

    console.say(&format!("=== {} ===", SETTINGS_TABLE))?;
    for (column, value) in snapshot.pairs() {
        console.say(&format!("  {}: {}", column.name, value))?;
    }
    Ok(())
}

fn initialize<C: OperatorConsole>(repo: &SettingsRepository, console: &mut C) -> AppResult<()> {
    let report = repo.initialize_defaults()?;

    console.say(&format!("Security settings {} with defaults.", report.action.as_str()))?;
    for setting in &report.written {
        console.say(&format!("  {} = {}", setting.column(), setting.default_value()))?;
    }
    if !report.skipped.is_empty() {
        let skipped = report
            .skipped
            .iter()
            .map(|setting| setting.column())
            .collect::<Vec<_>>()
            .join(", ");
        console.say(&format!("Not present in this schema, left alone: {}", skipped))?;
    }
    if report.written.contains(&KnownSetting::DiscordWebhookUrl) {
        console.say("Discord webhook: disabled")?;
    }
    console.say("Restart the protection service to apply the defaults.")?;
    Ok(())
}

fn set_field<C: OperatorConsole>(
    repo: &SettingsRepository,
    column: &str,
    raw: &str,
    console: &mut C,
) -> AppResult<()> {
    let Some(setting) = KnownSetting::from_column(column) else {
        let known = KnownSetting::ALL
            .iter()
            .map(|setting| setting.column())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::InvalidValue(format!(
            "unknown setting '{}'; expected one of: {}",
            column, known
        )));
    };

    let value = setting.parse(raw)?;
    repo.update_field(setting, &value)?;
    console.say(&format!("{} = {}", setting.column(), value))?;
    console.say("Restart the protection service for the change to take effect.")?;
    Ok(())
}
