use crate::errors::{AppError, AppResult};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SETTINGS_TABLE: &str = "security_settings";
pub const ID_COLUMN: &str = "id";
pub const SETTINGS_ROW_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ColumnInfo {
    pub position: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SettingValue {
    pub fn flag(enabled: bool) -> Self {
        Self::Integer(i64::from(enabled))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Real(value) => write!(f, "{}", value),
            Self::Text(value) if value.is_empty() => f.write_str("(empty)"),
            Self::Text(value) => f.write_str(value),
            Self::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<Value> for SettingValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Integer(value) => Self::Integer(value),
            Value::Real(value) => Self::Real(value),
            Value::Text(value) => Self::Text(value),
            Value::Blob(value) => Self::Blob(value),
        }
    }
}

impl ToSql for SettingValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            Self::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettingKind {
    Boolean,
    Integer,
    Text,
}

impl SettingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownSetting {
    GlobalProtection,
    ProtectionLevel,
    DiscordWebhookUrl,
    SteamQueryBypass,
    EbpfEnabled,
    GeoAllowedCountries,
    XdpHardBlocking,
    XdpRateLimitPps,
    AttackHistoryDays,
    SynCookies,
    AlertOnAttack,
    AlertOnBlock,
}

impl KnownSetting {
    pub const ALL: [KnownSetting; 12] = [
        Self::GlobalProtection,
        Self::ProtectionLevel,
        Self::DiscordWebhookUrl,
        Self::SteamQueryBypass,
        Self::EbpfEnabled,
        Self::GeoAllowedCountries,
        Self::XdpHardBlocking,
        Self::XdpRateLimitPps,
        Self::AttackHistoryDays,
        Self::SynCookies,
        Self::AlertOnAttack,
        Self::AlertOnBlock,
    ];

    pub const MAX_PROTECTION_LEVEL: i64 = 2;

    pub fn column(self) -> &'static str {
        match self {
            Self::GlobalProtection => "global_protection",
            Self::ProtectionLevel => "protection_level",
            Self::DiscordWebhookUrl => "discord_webhook_url",
            Self::SteamQueryBypass => "steam_query_bypass",
            Self::EbpfEnabled => "ebpf_enabled",
            Self::GeoAllowedCountries => "geo_allowed_countries",
            Self::XdpHardBlocking => "xdp_hard_blocking",
            Self::XdpRateLimitPps => "xdp_rate_limit_pps",
            Self::AttackHistoryDays => "attack_history_days",
            Self::SynCookies => "syn_cookies",
            Self::AlertOnAttack => "alert_on_attack",
            Self::AlertOnBlock => "alert_on_block",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|setting| setting.column() == column)
    }

    pub fn kind(self) -> SettingKind {
        match self {
            Self::ProtectionLevel | Self::XdpRateLimitPps | Self::AttackHistoryDays => SettingKind::Integer,
            Self::DiscordWebhookUrl | Self::GeoAllowedCountries => SettingKind::Text,
            _ => SettingKind::Boolean,
        }
    }

    pub fn default_value(self) -> SettingValue {
        match self {
            Self::GlobalProtection => SettingValue::flag(true),
            Self::ProtectionLevel => SettingValue::Integer(2),
            Self::DiscordWebhookUrl => SettingValue::text(""),
            Self::SteamQueryBypass => SettingValue::flag(true),
            Self::EbpfEnabled => SettingValue::flag(false),
            Self::GeoAllowedCountries => SettingValue::text("KR"),
            Self::XdpHardBlocking => SettingValue::flag(false),
            Self::XdpRateLimitPps => SettingValue::Integer(0),
            Self::AttackHistoryDays => SettingValue::Integer(30),
            Self::SynCookies => SettingValue::flag(true),
            Self::AlertOnAttack => SettingValue::flag(true),
            Self::AlertOnBlock => SettingValue::flag(false),
        }
    }

    pub fn validate(self, value: &SettingValue) -> AppResult<()> {
        let ok = match (self.kind(), value) {
            (SettingKind::Boolean, SettingValue::Integer(raw)) => *raw == 0 || *raw == 1,
            (SettingKind::Text, SettingValue::Text(_)) => true,
            (SettingKind::Integer, SettingValue::Integer(raw)) => match self {
                Self::ProtectionLevel => (0..=Self::MAX_PROTECTION_LEVEL).contains(raw),
                Self::XdpRateLimitPps => *raw >= 0,
                Self::AttackHistoryDays => *raw > 0,
                _ => true,
            },
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(AppError::InvalidValue(format!(
                "{} is not a valid {} value for {}",
                value,
                self.kind().as_str(),
                self.column()
            )))
        }
    }

    pub fn parse(self, raw: &str) -> AppResult<SettingValue> {
        let trimmed = raw.trim();
        let value = match self.kind() {
            SettingKind::Text => SettingValue::text(trimmed),
            SettingKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => SettingValue::flag(true),
                "0" | "false" | "off" | "no" => SettingValue::flag(false),
                _ => {
                    return Err(AppError::InvalidValue(format!(
                        "'{}' is not a boolean for {}",
                        trimmed,
                        self.column()
                    )))
                }
            },
            SettingKind::Integer => trimmed.parse::<i64>().map(SettingValue::Integer).map_err(|_| {
                AppError::InvalidValue(format!("'{}' is not an integer for {}", trimmed, self.column()))
            })?,
        };
        self.validate(&value)?;
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub columns: Vec<ColumnInfo>,
    pub values: Vec<SettingValue>,
}

impl SettingsSnapshot {
    pub fn pairs(&self) -> impl Iterator<Item = (&ColumnInfo, &SettingValue)> {
        self.columns.iter().zip(self.values.iter())
    }

    pub fn get(&self, column: &str) -> Option<&SettingValue> {
        self.pairs()
            .find(|(info, _)| info.name == column)
            .map(|(_, value)| value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .pairs()
            .map(|(info, value)| {
                let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (info.name.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitAction {
    Created,
    Reset,
}

impl InitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InitReport {
    pub action: InitAction,
    pub written: Vec<KnownSetting>,
    pub skipped: Vec<KnownSetting>,
}
