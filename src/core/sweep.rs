use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::engine::{DebtRateCalculator, WealthCalculator};
use super::error::SimulationError;
use super::types::{LoanTerms, WealthTerms};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub min: f64,
    pub max: f64,
    pub steps: u32,
    #[serde(default)]
    pub inclusive: bool,
}

impl GridSpec {
    pub fn exclusive(min: f64, max: f64, steps: u32) -> Self {
        Self {
            min,
            max,
            steps,
            inclusive: false,
        }
    }

    pub fn inclusive(min: f64, max: f64, steps: u32) -> Self {
        Self {
            min,
            max,
            steps,
            inclusive: true,
        }
    }

    pub fn points(&self) -> Vec<f64> {
        linear_grid(self.min, self.max, self.steps, self.inclusive)
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
            ..self
        }
    }
}

/// Parses `min..max/steps` (exclusive) or `min..=max/steps` (inclusive).
impl FromStr for GridSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (range, steps) = s
            .split_once('/')
            .ok_or_else(|| format!("grid '{s}' must look like min..max/steps"))?;
        let steps = steps
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("grid '{s}' has invalid steps: {e}"))?;
        let (min, max, inclusive) = if let Some((min, max)) = range.split_once("..=") {
            (min, max, true)
        } else if let Some((min, max)) = range.split_once("..") {
            (min, max, false)
        } else {
            return Err(format!("grid '{s}' must look like min..max/steps"));
        };
        let min = min
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("grid '{s}' has invalid min: {e}"))?;
        let max = max
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("grid '{s}' has invalid max: {e}"))?;
        Ok(Self {
            min,
            max,
            steps,
            inclusive,
        })
    }
}

pub fn linear_grid(min: f64, max: f64, steps: u32, inclusive: bool) -> Vec<f64> {
    if steps == 0 {
        return if inclusive { vec![min] } else { Vec::new() };
    }
    let count = if inclusive { steps + 1 } else { steps };
    (0..count)
        .map(|i| min + i as f64 * (max - min) / steps as f64)
        .collect()
}

// One row per repayment rate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalarySweep {
    pub salaries: Vec<f64>,
    pub repayment_rates: Vec<f64>,
    pub effective_rates: Vec<Vec<f64>>,
    pub years_to_repay: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentSweep {
    pub salaries: Vec<f64>,
    pub repayment_rates: Vec<f64>,
    pub effective_rates: Vec<Vec<f64>>,
    pub total_paid: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthSweep {
    pub salaries: Vec<f64>,
    pub prepayment_proportions: Vec<f64>,
    pub terminal_wealth: Vec<Vec<f64>>,
    pub years_to_repay: Vec<Vec<f64>>,
}

pub fn rate_vs_salary(
    terms: &LoanTerms,
    salaries: &[f64],
    repayment_rates: &[f64],
) -> Result<SalarySweep, SimulationError> {
    let mut calculators = salaries
        .iter()
        .map(|&salary| DebtRateCalculator::new(salary, terms))
        .collect::<Result<Vec<_>, _>>()?;
    let periods_per_year = terms.compounding_period as f64;

    let mut effective_rates = Vec::with_capacity(repayment_rates.len());
    let mut years_to_repay = Vec::with_capacity(repayment_rates.len());
    for &rate in repayment_rates {
        let mut rate_row = Vec::with_capacity(salaries.len());
        let mut years_row = Vec::with_capacity(salaries.len());
        for calc in calculators.iter_mut() {
            let outcome = calc.calculate(rate)?;
            rate_row.push(outcome.effective_annual_rate);
            years_row.push(outcome.months_to_repay as f64 / periods_per_year);
        }
        effective_rates.push(rate_row);
        years_to_repay.push(years_row);
    }

    info!(
        salaries = salaries.len(),
        rates = repayment_rates.len(),
        "salary sweep finished"
    );
    Ok(SalarySweep {
        salaries: salaries.to_vec(),
        repayment_rates: repayment_rates.to_vec(),
        effective_rates,
        years_to_repay,
    })
}

pub fn rate_vs_repayment_rate(
    terms: &LoanTerms,
    salaries: &[f64],
    repayment_rates: &[f64],
) -> Result<RepaymentSweep, SimulationError> {
    let mut effective_rates = Vec::with_capacity(salaries.len());
    let mut total_paid = Vec::with_capacity(salaries.len());
    for &salary in salaries {
        let mut calc = DebtRateCalculator::new(salary, terms)?;
        let mut rate_row = Vec::with_capacity(repayment_rates.len());
        let mut paid_row = Vec::with_capacity(repayment_rates.len());
        for &rate in repayment_rates {
            let outcome = calc.calculate(rate)?;
            rate_row.push(outcome.effective_annual_rate);
            paid_row.push(outcome.total_paid);
        }
        effective_rates.push(rate_row);
        total_paid.push(paid_row);
    }

    info!(
        salaries = salaries.len(),
        rates = repayment_rates.len(),
        "repayment rate sweep finished"
    );
    Ok(RepaymentSweep {
        salaries: salaries.to_vec(),
        repayment_rates: repayment_rates.to_vec(),
        effective_rates,
        total_paid,
    })
}

pub fn wealth_vs_prepayment(
    terms: &WealthTerms,
    salaries: &[f64],
    proportions: &[f64],
) -> Result<WealthSweep, SimulationError> {
    let periods_per_year = terms.loan.compounding_period as f64;
    let mut terminal_wealth = Vec::with_capacity(salaries.len());
    let mut years_to_repay = Vec::with_capacity(salaries.len());
    for &salary in salaries {
        let template = WealthCalculator::new(salary, terms)?;
        let mut wealth_row = Vec::with_capacity(proportions.len());
        let mut years_row = Vec::with_capacity(proportions.len());
        for &proportion in proportions {
            let outcome = template.clone().calculate(proportion)?;
            wealth_row.push(outcome.terminal_wealth);
            years_row.push(outcome.months_to_repay as f64 / periods_per_year);
        }
        terminal_wealth.push(wealth_row);
        years_to_repay.push(years_row);
    }

    info!(
        salaries = salaries.len(),
        proportions = proportions.len(),
        "wealth sweep finished"
    );
    Ok(WealthSweep {
        salaries: salaries.to_vec(),
        prepayment_proportions: proportions.to_vec(),
        terminal_wealth,
        years_to_repay,
    })
}
