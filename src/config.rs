//! Runtime settings read from the environment (and `.env` when present)

use crate::core::bookings::MAX_SLOT_WINDOW_DAYS;
use crate::core::retry::RetryPolicy;
use crate::core::slots::SlotGrid;
use di::{inject, injectable};
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub slot_grid: SlotGrid,
    /// Days covered by an unavailable-slots query when the caller does not say.
    pub slot_window_days: u32,
    pub retry: RetryPolicy,
    /// Events queued per live session before new ones are dropped.
    pub realtime_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            slot_grid: SlotGrid::default(),
            slot_window_days: 7,
            retry: RetryPolicy::default(),
            realtime_buffer: 64,
        }
    }
}

#[injectable]
impl AppConfig {
    #[inject]
    pub fn create() -> AppConfig {
        AppConfig::from_env()
    }
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        dotenvy::dotenv().ok();
        let defaults = AppConfig::default();

        let open_hour = parse_var("SLOT_OPEN_HOUR", defaults.slot_grid.open_hour());
        let close_hour = parse_var("SLOT_CLOSE_HOUR", defaults.slot_grid.close_hour());
        let slot_grid = SlotGrid::new(open_hour, close_hour).unwrap_or_else(|| {
            warn!("invalid slot hours {open_hour}..{close_hour}, using defaults");
            defaults.slot_grid.clone()
        });

        let retry = RetryPolicy::builder()
            .max_retries(parse_var("RETRY_MAX", defaults.retry.max_retries))
            .initial_delay(Duration::from_millis(parse_var(
                "RETRY_INITIAL_MS",
                defaults.retry.initial_delay.as_millis() as u64,
            )))
            .build();

        AppConfig {
            database_url: env::var("DATABASE_URL").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| split_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            slot_grid,
            slot_window_days: window_days(
                parse_var("SLOT_WINDOW_DAYS", defaults.slot_window_days),
                defaults.slot_window_days,
            ),
            retry,
            realtime_buffer: parse_var("REALTIME_BUFFER", defaults.realtime_buffer).max(1),
        }
    }
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The default slot window must itself be a window the slot query accepts.
fn window_days(days: u32, default: u32) -> u32 {
    if (1..=MAX_SLOT_WINDOW_DAYS).contains(&days) {
        days
    } else {
        warn!(
            "ignoring SLOT_WINDOW_DAYS={days}, must be 1..={MAX_SLOT_WINDOW_DAYS}, using {default}"
        );
        default
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {name}={raw:?}, using {default}");
            default
        }),
        Err(_) => default,
    }
}
