//! Funding bot and SCPI simulator
//!
//! Two independent services sharing one crate:
//!
//! ```text
//! PayPal ──► BalanceMonitor ──► Discord alert
//!    │                              ▲
//!    └──► CommandHandler ◄── DiscordBot (channel polling)
//!              │
//!         FundingStore (JSON file)
//!
//! HTTP client ──► simulator::api ──► ScpiCalculator
//! ```

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod monitor;
pub mod notify;
pub mod simulator;
pub mod storage;

#[cfg(test)]
mod config_tests;
