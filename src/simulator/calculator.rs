//! Projection engine

use super::{
    InvestmentType, SavingsFrequency, ScpiInfo, ScpiType, SimulationRequest, SimulationResults,
    YearlyProjection,
};
use crate::config::{ScpiParams, SimulatorConfig};
use crate::error::{BotError, Result};
use crate::format::round_to_share_price;
use std::collections::HashMap;

const BASE_RISKS: [&str; 5] = [
    "Risque de perte en capital : le capital investi n'est ni garanti ni protégé.",
    "Risque de change : en raison de sa stratégie d'investissement, la SCPI pourra détenir \
     certains instruments financiers ou actifs immobiliers soumis à un risque de change.",
    "Risque de liquidité : la SCPI ne garantit pas la revente des parts, ni le retrait, \
     la sortie étant possible dans le cas de l'existence d'une contrepartie.",
    "Risque en matière de durabilité : la SCPI est exposée à des risques de durabilité, \
     définis par le règlement SFDR.",
    "Risque de marché : ce produit ne bénéficie pas de protection contre les aléas du \
     marché ; vous pourriez perdre tout ou partie de votre investissement.",
];

const DISMEMBERMENT_RISK: &str = "Risque spécifique au démembrement : aucun dividende ne sera \
     perçu pendant la durée du démembrement.";

const DISCLAIMERS: [&str; 5] = [
    "Ces calculs prévoient un compte des hypothèses de 25% de fiscalité correspondant à une \
     moyenne calculée en fonction de la fiscalité sur les revenus fonciers et financiers des \
     pays dans lesquels la SCPI investit et évite la double imposition grâce au pacte \
     d'investissement.",
    "Les impôts ont prévu à la source pour la SCPI, pour le compte des associés.",
    "Cette simulation est indicative et ne constitue en aucun cas une garantie de performance.",
    "Les performances passées ne préjugent pas des performances futures.",
    "Cette simulation est proposée à titre indicatif et n'a aucune valeur contractuelle.",
];

#[derive(Debug, Clone)]
struct ScpiProduct {
    name: &'static str,
    params: ScpiParams,
    supported_types: Vec<InvestmentType>,
}

pub struct ScpiCalculator {
    products: HashMap<ScpiType, ScpiProduct>,
    min_duration: u32,
    max_duration_full: u32,
    max_duration_bare: u32,
}

impl ScpiCalculator {
    pub fn new(config: &SimulatorConfig) -> Self {
        let both = vec![InvestmentType::FullOwnership, InvestmentType::BareOwnership];

        let mut products = HashMap::new();
        products.insert(
            ScpiType::Comete,
            ScpiProduct {
                name: "SCPI Comète",
                params: config.comete,
                supported_types: both.clone(),
            },
        );
        products.insert(
            ScpiType::Activimmo,
            ScpiProduct {
                name: "SCPI ActivImmo",
                params: config.activimmo,
                supported_types: both,
            },
        );

        Self {
            products,
            min_duration: config.min_duration,
            max_duration_full: config.max_duration_full,
            max_duration_bare: config.max_duration_bare,
        }
    }

    fn product(&self, scpi_type: ScpiType) -> Result<&ScpiProduct> {
        self.products
            .get(&scpi_type)
            .ok_or_else(|| BotError::ScpiNotFound(format!("SCPI type {} not found", scpi_type)))
    }

    pub fn scpi_info(&self, scpi_type: ScpiType) -> Result<ScpiInfo> {
        let product = self.product(scpi_type)?;
        Ok(ScpiInfo {
            scpi_type,
            name: product.name.to_string(),
            price_per_share: product.params.price_per_share,
            minimum_investment: product.params.min_investment,
            annual_yield: product.params.annual_yield,
            capital_appreciation: product.params.capital_appreciation,
            supported_investment_types: product.supported_types.clone(),
        })
    }

    /// Every configured SCPI, in a stable order
    pub fn list(&self) -> Vec<ScpiInfo> {
        ScpiType::ALL
            .iter()
            .filter_map(|t| self.scpi_info(*t).ok())
            .collect()
    }

    pub fn max_duration(&self, investment_type: InvestmentType) -> u32 {
        match investment_type {
            InvestmentType::FullOwnership => self.max_duration_full,
            InvestmentType::BareOwnership => self.max_duration_bare,
        }
    }

    /// Business rules that depend on the SCPI and ownership type
    pub fn validate(&self, request: &SimulationRequest) -> Result<()> {
        let product = self.product(request.scpi_type)?;

        if !product.supported_types.contains(&request.investment_type) {
            return Err(BotError::InvestmentTypeNotSupported(format!(
                "Investment type {} not supported for {}",
                request.investment_type, request.scpi_type
            )));
        }

        if request.investment_amount < product.params.min_investment {
            return Err(BotError::InvalidParameters(format!(
                "Investment amount must be at least €{}",
                product.params.min_investment
            )));
        }

        if request.duration_years < self.min_duration {
            return Err(BotError::InvalidParameters(format!(
                "Duration must be at least {} years",
                self.min_duration
            )));
        }

        let max_duration = self.max_duration(request.investment_type);
        if request.duration_years > max_duration {
            return Err(BotError::InvalidParameters(format!(
                "Duration cannot exceed {} years",
                max_duration
            )));
        }

        if request.investment_type == InvestmentType::BareOwnership
            && request.dividend_reinvestment_rate.is_some()
        {
            return Err(BotError::InvalidParameters(
                "Dividend reinvestment not applicable for bare ownership".to_string(),
            ));
        }

        Ok(())
    }

    pub fn calculate(&self, request: &SimulationRequest) -> Result<SimulationResults> {
        self.validate(request)?;

        let params = self.product(request.scpi_type)?.params;
        let price = params.price_per_share;

        let initial_investment = round_to_share_price(request.investment_amount, price);
        let initial_shares = initial_investment / price;

        let yearly_savings = match request.programmed_savings_amount {
            Some(amount) if amount > 0.0 => {
                let frequency = request
                    .programmed_savings_frequency
                    .unwrap_or(SavingsFrequency::Monthly);
                amount * frequency.per_year()
            }
            _ => 0.0,
        };
        let reinvest_rate = request
            .dividend_reinvestment_rate
            .filter(|r| *r > 0.0);
        let full_ownership = request.investment_type == InvestmentType::FullOwnership;

        let mut shares = initial_shares;
        let mut total_invested = initial_investment;
        let mut total_dividends = 0.0;
        let mut projections = Vec::with_capacity(request.duration_years as usize);

        for year in 1..=request.duration_years {
            let share_value = price * (1.0 + params.capital_appreciation).powi(year as i32);

            let mut dividends = 0.0;
            let mut reinvested = 0.0;
            if full_ownership {
                dividends = shares * price * params.annual_yield;
                total_dividends += dividends;

                if let Some(rate) = reinvest_rate {
                    reinvested = dividends * rate;
                    shares += reinvested / share_value;
                    total_invested += reinvested;
                }
            }

            if yearly_savings > 0.0 {
                shares += yearly_savings / share_value;
                total_invested += yearly_savings;
            }

            projections.push(YearlyProjection {
                year,
                dividends_received: dividends,
                dividends_reinvested: reinvested,
                programmed_savings: yearly_savings,
                total_shares: shares,
                share_value,
                total_capital_value: shares * share_value,
                cumulative_dividends: total_dividends,
            });
        }

        let final_capital_value = projections
            .last()
            .map(|p| p.total_capital_value)
            .unwrap_or(initial_investment);
        let total_return = final_capital_value + total_dividends;

        let annual_yield = if total_invested > 0.0 && request.duration_years > 0 {
            ((total_return / total_invested).powf(1.0 / request.duration_years as f64) - 1.0)
                * 100.0
        } else {
            0.0
        };

        Ok(SimulationResults {
            scpi_type: request.scpi_type,
            investment_type: request.investment_type,
            initial_investment,
            duration_years: request.duration_years,
            programmed_savings_monthly: request.programmed_savings_amount,
            dividend_reinvestment_rate: request.dividend_reinvestment_rate,
            total_invested,
            final_capital_value,
            total_dividends_received: total_dividends,
            total_return,
            annual_yield,
            initial_shares,
            final_shares: shares,
            price_per_share: price,
            yearly_projections: projections,
            risks: investment_risks(request.investment_type),
            disclaimers: DISCLAIMERS.iter().map(|d| d.to_string()).collect(),
        })
    }
}

fn investment_risks(investment_type: InvestmentType) -> Vec<String> {
    let mut risks: Vec<String> = BASE_RISKS.iter().map(|r| r.to_string()).collect();
    if investment_type == InvestmentType::BareOwnership {
        risks.push(DISMEMBERMENT_RISK.to_string());
    }
    risks
}
