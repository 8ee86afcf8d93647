//! Startup configuration.
//!
//! Loaded once in `main` and passed down explicitly; invoice rendering and
//! the API read site branding from [`SiteSettings`], never from globals.

use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::domain::lifecycle::TransitionPolicy;
use crate::invoice::BusinessProfile;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub transition_policy: TransitionPolicy,
    pub site: SiteSettings,
}

/// Branding and seller identity shown on storefront pages and invoices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteSettings {
    pub store_name: String,
    pub brand_color: String,
    pub business: BusinessProfile,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let store_name: String = try_load(lookup, "STORE_NAME", "Storefront")?;
        Ok(Self {
            port: try_load(lookup, "PORT", "8083")?,
            database_url: optional(lookup, "DATABASE_URL"),
            db_max_connections: try_load(lookup, "DB_MAX_CONNECTIONS", "10")?,
            nats_url: optional(lookup, "NATS_URL"),
            transition_policy: try_load(lookup, "ORDER_TRANSITION_POLICY", "admin_override")?,
            site: SiteSettings {
                brand_color: try_load(lookup, "STORE_BRAND_COLOR", "#1f2937")?,
                business: BusinessProfile {
                    legal_name: try_load(lookup, "STORE_LEGAL_NAME", &store_name)?,
                    address: required(lookup, "STORE_ADDRESS")?,
                    gst_number: required(lookup, "STORE_GST_NUMBER")?,
                    phone: required(lookup, "STORE_PHONE")?,
                    email: optional(lookup, "STORE_EMAIL"),
                },
                store_name,
            },
        })
    }
}

fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    optional(lookup, key).ok_or_else(|| anyhow!("{key} must be set"))
}

fn try_load<T: FromStr>(lookup: Lookup<'_>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = optional(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid {key}: {e}")
    })
}
