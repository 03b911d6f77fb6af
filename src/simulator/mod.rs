//! SCPI investment simulator
//!
//! Fixed-formula projections for the two supported SCPIs. Wire values are
//! the French identifiers used by the web client.

pub mod api;
pub mod calculator;

pub use api::{create_router, start_server};
pub use calculator::ScpiCalculator;


use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScpiType {
    Comete,
    Activimmo,
}

impl ScpiType {
    pub const ALL: [ScpiType; 2] = [ScpiType::Comete, ScpiType::Activimmo];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScpiType::Comete => "comete",
            ScpiType::Activimmo => "activimmo",
        }
    }
}

impl fmt::Display for ScpiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScpiType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comete" => Ok(ScpiType::Comete),
            "activimmo" => Ok(ScpiType::Activimmo),
            other => Err(BotError::ScpiNotFound(format!("SCPI type {} not found", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentType {
    /// Full ownership, dividends paid
    #[serde(rename = "pleine_propriete")]
    FullOwnership,
    /// Bare ownership, no dividends during dismemberment
    #[serde(rename = "nue_propriete")]
    BareOwnership,
}

impl InvestmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::FullOwnership => "pleine_propriete",
            InvestmentType::BareOwnership => "nue_propriete",
        }
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pleine_propriete" | "full" => Ok(InvestmentType::FullOwnership),
            "nue_propriete" | "bare" => Ok(InvestmentType::BareOwnership),
            other => Err(BotError::InvestmentTypeNotSupported(format!(
                "Investment type {} not supported",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SavingsFrequency {
    #[serde(rename = "mensuelle")]
    Monthly,
    #[serde(rename = "trimestrielle")]
    Quarterly,
    #[serde(rename = "semestrielle")]
    SemiAnnual,
}

impl SavingsFrequency {
    pub fn per_year(&self) -> f64 {
        match self {
            SavingsFrequency::Monthly => 12.0,
            SavingsFrequency::Quarterly => 4.0,
            SavingsFrequency::SemiAnnual => 2.0,
        }
    }
}

impl FromStr for SavingsFrequency {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mensuelle" | "monthly" => Ok(SavingsFrequency::Monthly),
            "trimestrielle" | "quarterly" => Ok(SavingsFrequency::Quarterly),
            "semestrielle" | "semi-annual" => Ok(SavingsFrequency::SemiAnnual),
            other => Err(BotError::InvalidParameters(format!(
                "Unknown savings frequency {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub scpi_type: ScpiType,
    pub investment_type: InvestmentType,
    /// Initial investment in euros
    pub investment_amount: f64,
    pub duration_years: u32,
    /// Amount per savings period in euros
    #[serde(default)]
    pub programmed_savings_amount: Option<f64>,
    #[serde(default)]
    pub programmed_savings_frequency: Option<SavingsFrequency>,
    /// Share of dividends reinvested, 0 to 1
    #[serde(default)]
    pub dividend_reinvestment_rate: Option<f64>,
}

/// Hard upper bound on duration, before per-ownership limits
pub const MAX_DURATION_YEARS: u32 = 20;

impl SimulationRequest {
    pub fn new(
        scpi_type: ScpiType,
        investment_type: InvestmentType,
        investment_amount: f64,
        duration_years: u32,
    ) -> Self {
        Self {
            scpi_type,
            investment_type,
            investment_amount,
            duration_years,
            programmed_savings_amount: None,
            programmed_savings_frequency: None,
            dividend_reinvestment_rate: None,
        }
    }

    /// Shape checks on individual fields, independent of SCPI settings
    pub fn check_fields(&self) -> Result<(), String> {
        if !self.investment_amount.is_finite() || self.investment_amount <= 0.0 {
            return Err("investment_amount must be greater than 0".to_string());
        }
        if self.duration_years == 0 || self.duration_years > MAX_DURATION_YEARS {
            return Err(format!(
                "duration_years must be between 1 and {}",
                MAX_DURATION_YEARS
            ));
        }
        if let Some(amount) = self.programmed_savings_amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err("programmed_savings_amount must be greater than or equal to 0".to_string());
            }
        }
        if let Some(rate) = self.dividend_reinvestment_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err("dividend_reinvestment_rate must be between 0 and 1".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjection {
    pub year: u32,
    pub dividends_received: f64,
    pub dividends_reinvested: f64,
    pub programmed_savings: f64,
    pub total_shares: f64,
    pub share_value: f64,
    pub total_capital_value: f64,
    pub cumulative_dividends: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    pub scpi_type: ScpiType,
    pub investment_type: InvestmentType,
    pub initial_investment: f64,
    pub duration_years: u32,
    pub programmed_savings_monthly: Option<f64>,
    pub dividend_reinvestment_rate: Option<f64>,

    pub total_invested: f64,
    pub final_capital_value: f64,
    pub total_dividends_received: f64,
    /// Final capital plus dividends
    pub total_return: f64,
    /// Average annual yield in percent
    pub annual_yield: f64,

    pub initial_shares: f64,
    pub final_shares: f64,
    pub price_per_share: f64,

    pub yearly_projections: Vec<YearlyProjection>,

    pub risks: Vec<String>,
    pub disclaimers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScpiInfo {
    pub scpi_type: ScpiType,
    pub name: String,
    pub price_per_share: f64,
    pub minimum_investment: f64,
    pub annual_yield: f64,
    pub capital_appreciation: f64,
    pub supported_investment_types: Vec<InvestmentType>,
}
