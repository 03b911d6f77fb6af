//! Funding status embeds
//!
//! Texts are in French, matching the community the bot serves.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

pub const COLOR_GREEN: u32 = 0x00ff00;
pub const COLOR_RED: u32 = 0xff0000;
pub const COLOR_ORANGE: u32 = 0xffaa00;
pub const COLOR_ALERT: u32 = 0xff4444;

/// Day of the month the server bill is paid
const PAYMENT_DAY: u32 = 11;
const PROGRESS_BAR_LEN: usize = 20;
const DAYS_PER_MONTH: Decimal = dec!(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Rich message body, serialized in the chat API's embed shape
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    /// Value of the first field called `name`
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

fn euros(amount: Decimal) -> String {
    format!("{:.2}€", amount)
}

/// Whole months and remaining days the balance pays for
pub fn coverage(balance: Decimal, monthly_cost: Decimal) -> (i64, i64) {
    if monthly_cost <= Decimal::ZERO || balance <= Decimal::ZERO {
        return (0, 0);
    }
    let months = (balance / monthly_cost).floor();
    let remainder = balance % monthly_cost;
    let days = (remainder * DAYS_PER_MONTH / monthly_cost).floor();
    (months.to_i64().unwrap_or(0), days.to_i64().unwrap_or(0))
}

/// Share of the monthly cost covered, capped at 100
pub fn funding_percentage(balance: Decimal, monthly_cost: Decimal) -> Decimal {
    if monthly_cost <= Decimal::ZERO {
        return Decimal::ONE_HUNDRED;
    }
    (balance * Decimal::ONE_HUNDRED / monthly_cost).min(Decimal::ONE_HUNDRED)
}

pub fn progress_bar(percentage: Decimal) -> String {
    let filled = (percentage * Decimal::from(PROGRESS_BAR_LEN) / Decimal::ONE_HUNDRED)
        .floor()
        .to_i64()
        .unwrap_or(0)
        .clamp(0, PROGRESS_BAR_LEN as i64) as usize;

    format!(
        "{}{} {:.1}%",
        "█".repeat(filled),
        "░".repeat(PROGRESS_BAR_LEN - filled),
        percentage
    )
}

pub fn next_payment_date(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.day() < PAYMENT_DAY {
        (today.year(), today.month())
    } else if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, PAYMENT_DAY).unwrap_or(today)
}

const FRENCH_MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin",
    "juillet", "août", "septembre", "octobre", "novembre", "décembre",
];

/// `11 novembre 2026`
pub fn format_french_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        FRENCH_MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn balance_embed(balance: Decimal, monthly_cost: Decimal, today: NaiveDate) -> Embed {
    let (months, days) = coverage(balance, monthly_cost);
    let is_funded = balance >= monthly_cost;

    Embed::new()
        .title("💰 Statut des fonds")
        .color(if is_funded { COLOR_GREEN } else { COLOR_RED })
        .field("Nous avons", euros(balance), true)
        .field("Le serveur nous coûte", euros(monthly_cost), true)
        .field(
            "Statut",
            if is_funded { "✅ Ok pour le mois prochain" } else { "❌ Besoin de fonds !" },
            false,
        )
        .field("Temps de couverture", format!("{} mois, {} jours", months, days), true)
        .field("Prochain paiement", format_french_date(next_payment_date(today)), true)
        .timestamp(Utc::now())
        .footer("Dernière mise à jour")
}

pub fn progress_embed(balance: Decimal, monthly_cost: Decimal) -> Embed {
    let percentage = funding_percentage(balance, monthly_cost);
    let needed = (monthly_cost - balance).max(Decimal::ZERO);

    let color = if percentage >= Decimal::ONE_HUNDRED {
        COLOR_GREEN
    } else if percentage >= dec!(50) {
        COLOR_ORANGE
    } else {
        COLOR_ALERT
    };

    Embed::new()
        .title("📊 Progression des fonds")
        .description(format!("```{}```", progress_bar(percentage)))
        .field("Progression", format!("{:.1}%", percentage), true)
        .field("Nous avons", euros(balance), true)
        .field("Le serveur nous coûte", euros(monthly_cost), true)
        .field(
            "Il nous faut encore",
            if needed > Decimal::ZERO { euros(needed) } else { "Fonds suffisants! 🎉".to_string() },
            false,
        )
        .color(color)
        .timestamp(Utc::now())
}

pub fn low_balance_embed(balance: Decimal, monthly_cost: Decimal) -> Embed {
    let needed = monthly_cost - balance;

    Embed::new()
        .title("🚨 Alerte de fonds insuffisants !")
        .description(format!(
            "Nous avons besoin de **{}** de plus pour le prochain paiement du serveur.",
            euros(needed)
        ))
        .field("Nous avons", euros(balance), true)
        .field("Le serveur nous coûte", euros(monthly_cost), true)
        .field("Il nous faut encore", euros(needed), true)
        .color(COLOR_ALERT)
        .timestamp(Utc::now())
}
