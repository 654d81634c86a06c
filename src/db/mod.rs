use crate::errors::{AppError, AppResult};
use crate::models::{
    InitAction, InitReport, KnownSetting, SettingValue, SettingsSnapshot, ID_COLUMN, SETTINGS_ROW_ID,
    SETTINGS_TABLE,
};
use crate::redaction::mask_webhook_url;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod schema;

use schema::{current_columns, quote_ident, TableSchema};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SettingsRepository {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn columns(&self) -> AppResult<TableSchema> {
        let conn = self.connect()?;
        current_columns(&conn, SETTINGS_TABLE)
    }

    pub fn describe(&self) -> AppResult<SettingsSnapshot> {
        let conn = self.connect()?;
        let schema = require_settings_table(&conn)?;

        let select_list = schema.names().map(quote_ident).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            select_list,
            quote_ident(SETTINGS_TABLE),
            quote_ident(ID_COLUMN)
        );
        let width = schema.columns().len();
        let values = conn
            .query_row(&sql, [SETTINGS_ROW_ID], |row| {
                (0..width)
                    .map(|index| row.get::<_, Value>(index).map(SettingValue::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .optional()?;

        match values {
            Some(values) => Ok(SettingsSnapshot {
                columns: schema.into_columns(),
                values,
            }),
            None => Err(not_initialized()),
        }
    }

    pub fn initialize_defaults(&self) -> AppResult<InitReport> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let schema = require_settings_table(&tx)?;

        let (written, skipped): (Vec<KnownSetting>, Vec<KnownSetting>) = KnownSetting::ALL
            .into_iter()
            .partition(|setting| schema.contains(setting.column()));
        for setting in &skipped {
            tracing::debug!(column = setting.column(), "known setting absent from live schema; skipping");
        }

        let table = quote_ident(SETTINGS_TABLE);
        let id_column = quote_ident(ID_COLUMN);
        let exists = tx
            .query_row(
                &format!("SELECT 1 FROM {} WHERE {} = ?1", table, id_column),
                [SETTINGS_ROW_ID],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let action = if exists {
            if !written.is_empty() {
                let assignments = written
                    .iter()
                    .enumerate()
                    .map(|(index, setting)| format!("{} = ?{}", quote_ident(setting.column()), index + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut values = written.iter().map(|setting| setting.default_value()).collect::<Vec<_>>();
                values.push(SettingValue::Integer(SETTINGS_ROW_ID));
                tx.execute(
                    &format!(
                        "UPDATE {} SET {} WHERE {} = ?{}",
                        table,
                        assignments,
                        id_column,
                        values.len()
                    ),
                    params_from_iter(values.iter()),
                )?;
            }
            InitAction::Reset
        } else {
            let mut columns = vec![id_column.clone()];
            let mut values = vec![SettingValue::Integer(SETTINGS_ROW_ID)];
            for setting in &written {
                columns.push(quote_ident(setting.column()));
                values.push(setting.default_value());
            }
            let placeholders = (1..=values.len())
                .map(|index| format!("?{}", index))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    placeholders
                ),
                params_from_iter(values.iter()),
            )?;
            InitAction::Created
        };
        tx.commit()?;

        tracing::info!(
            action = action.as_str(),
            written = written.len(),
            skipped = skipped.len(),
            "security settings reset to defaults"
        );
        Ok(InitReport {
            action,
            written,
            skipped,
        })
    }

    // None: no file, table, column or row to read. Some(""): disabled.
    pub fn webhook_url(&self) -> AppResult<Option<String>> {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(AppError::SchemaUnavailable(reason)) => {
                tracing::warn!(%reason, "settings store unavailable; treating webhook as absent");
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let webhook_column = KnownSetting::DiscordWebhookUrl.column();
        let schema = current_columns(&conn, SETTINGS_TABLE)?;
        if !schema.contains(ID_COLUMN) || !schema.contains(webhook_column) {
            tracing::warn!(
                table = SETTINGS_TABLE,
                column = webhook_column,
                "webhook column not present; treating webhook as absent"
            );
            return Ok(None);
        }

        let stored = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    quote_ident(webhook_column),
                    quote_ident(SETTINGS_TABLE),
                    quote_ident(ID_COLUMN)
                ),
                [SETTINGS_ROW_ID],
                |row| row.get::<_, Value>(0),
            )
            .optional()?;

        // legacy rows may carry NULL or a non-text cell; NULL means the same as ''
        let url = stored.map(|value| match value {
            Value::Null => String::new(),
            Value::Text(text) => text,
            Value::Integer(number) => number.to_string(),
            Value::Real(number) => number.to_string(),
            Value::Blob(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        });
        if let Some(url) = &url {
            tracing::debug!(webhook = %mask_webhook_url(url), "read webhook url");
        }
        Ok(url)
    }

    pub fn update_field(&self, setting: KnownSetting, value: &SettingValue) -> AppResult<()> {
        setting.validate(value)?;

        let conn = self.connect()?;
        let schema = require_settings_table(&conn)?;
        if !schema.contains(setting.column()) {
            return Err(AppError::SchemaUnavailable(format!(
                "column {} is not present in table {}",
                setting.column(),
                SETTINGS_TABLE
            )));
        }

        let changed = conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                quote_ident(SETTINGS_TABLE),
                quote_ident(setting.column()),
                quote_ident(ID_COLUMN)
            ),
            params![value, SETTINGS_ROW_ID],
        )?;
        if changed == 0 {
            return Err(not_initialized());
        }

        tracing::info!(column = setting.column(), "security setting updated");
        Ok(())
    }

    pub fn clear_webhook_url(&self) -> AppResult<()> {
        self.update_field(KnownSetting::DiscordWebhookUrl, &SettingValue::text(""))
    }

    fn connect(&self) -> AppResult<Connection> {
        if !self.db_path.is_file() {
            return Err(AppError::SchemaUnavailable(format!(
                "database file {} does not exist",
                self.db_path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

fn require_settings_table(conn: &Connection) -> AppResult<TableSchema> {
    let schema = current_columns(conn, SETTINGS_TABLE)?;
    if schema.is_empty() {
        return Err(AppError::SchemaUnavailable(format!(
            "table {} does not exist",
            SETTINGS_TABLE
        )));
    }
    if !schema.contains(ID_COLUMN) {
        return Err(AppError::SchemaUnavailable(format!(
            "table {} has no {} column",
            SETTINGS_TABLE, ID_COLUMN
        )));
    }
    Ok(schema)
}

fn not_initialized() -> AppError {
    AppError::NotFound(format!(
        "no {} row with {} = {}; run `init` first",
        SETTINGS_TABLE, ID_COLUMN, SETTINGS_ROW_ID
    ))
}
