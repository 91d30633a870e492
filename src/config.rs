use std::env;
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::AppError;
use crate::henrik::{HenrikClient, Region};
use crate::poller::interval::{PollBudget, compute_safe_poll_ms};

/// Process-wide configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub overlay: OverlaySettings,
    pub base_url: String,
    pub budget_rpm: NonZeroU32,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source, `OVERLAY_URL` first and explicit
    /// variables on top of it.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        const DEFAULT_DATABASE_URL: &str = "sqlite:stats-overlay.db";

        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut overlay = var("OVERLAY_URL")
            .map(|url| OverlaySettings::from_query(&url))
            .unwrap_or_else(|| OverlaySettings::from_query(""));

        if let Some(key) = var("HENRIK_API_KEY") {
            overlay.api_key = Some(key);
        }
        if let Some(region) = var("REGION") {
            overlay.region = Some(region);
        }
        if let Some(puuid) = var("PLAYER_PUUID") {
            overlay.puuid = Some(puuid);
        }
        if let Some(name) = var("PLAYER_NAME") {
            overlay.name = Some(name);
        }
        if let Some(tag) = var("PLAYER_TAG") {
            overlay.tag = Some(tag);
        }
        if let Some(accounts) = var("ACCOUNTS") {
            overlay.accounts = parse_accounts(&accounts);
        }
        if let Some(ms) = var("POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            overlay.poll_interval_ms = Some(ms);
        }

        let base_url = var("HENRIK_BASE_URL").unwrap_or_else(|| HenrikClient::DEFAULT_BASE_URL.into());

        let budget_rpm = var("BUDGET_RPM")
            .and_then(|v| v.parse().ok())
            .and_then(NonZeroU32::new)
            .unwrap_or(PollBudget::DEFAULT_BUDGET_RPM);

        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());

        Self {
            overlay,
            base_url,
            budget_rpm,
            database_url,
        }
    }

    pub fn budget(&self) -> PollBudget {
        PollBudget::default().with_budget_rpm(self.budget_rpm)
    }
}

/// Raw inbound configuration, as decoded from the overlay URL. Nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySettings {
    pub api_key: Option<String>,
    pub region: Option<String>,
    pub accounts: u32,
    pub puuid: Option<String>,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl OverlaySettings {
    /// Decode the overlay parameters from a full URL or a bare query string.
    pub fn from_query(input: &str) -> Self {
        let query = input.split_once('?').map_or(input, |(_, q)| q);
        let query = query.split_once('#').map_or(query, |(q, _)| q);

        let mut settings = Self {
            accounts: 1,
            ..Default::default()
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(value) = decode_component(raw) else {
                continue;
            };

            match key {
                "key" => settings.api_key = Some(value),
                "region" => settings.region = Some(value),
                "accounts" => settings.accounts = parse_accounts(&value),
                "puuid" => settings.puuid = Some(value),
                "name" => settings.name = Some(value),
                "tag" => settings.tag = Some(value),
                "poll" => settings.poll_interval_ms = value.parse().ok().filter(|ms| *ms > 0),
                _ => {}
            }
        }

        settings
    }

    /// Validate the settings into the configuration of one polling session.
    pub fn session_config(&self) -> Result<SessionConfig, AppError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("Missing API key".into()))?;

        let region: Region = self
            .region
            .as_deref()
            .ok_or_else(|| AppError::Config("Missing region".into()))?
            .parse()?;

        let account = match (&self.puuid, &self.name, &self.tag) {
            (Some(puuid), _, _) => AccountRef::Puuid(puuid.clone()),
            (None, Some(name), Some(tag)) => AccountRef::RiotId {
                name: name.clone(),
                tag: tag.clone(),
            },
            _ => return Err(AppError::Config("Provide either PUUID or name+tag".into())),
        };

        Ok(SessionConfig {
            identity: SessionIdentity {
                api_key,
                region,
                account,
            },
            accounts: self.accounts.max(1),
            poll_interval: self.poll_interval_ms.map(Duration::from_millis),
        })
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let value = urlencoding::decode(&raw.replace('+', " ")).ok()?.trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn parse_accounts(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(1).max(1)
}

/// The account a session tracks: a direct identifier or a name+tag pair needing resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Puuid(String),
    RiotId { name: String, tag: String },
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Puuid(puuid) => write!(f, "{puuid}"),
            Self::RiotId { name, tag } => write!(f, "{name}#{tag}"),
        }
    }
}

/// Immutable for the life of one polling session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub api_key: String,
    pub region: Region,
    pub account: AccountRef,
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .field("account", &self.account)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub identity: SessionIdentity,
    pub accounts: u32,
    pub poll_interval: Option<Duration>,
}

impl SessionConfig {
    /// Delay between two successful polls. An explicit override still honours the floor.
    pub fn base_interval(&self, budget: &PollBudget) -> Duration {
        match self.poll_interval {
            Some(interval) => interval.max(budget.floor),
            None => Duration::from_millis(compute_safe_poll_ms(self.accounts, budget)),
        }
    }
}
