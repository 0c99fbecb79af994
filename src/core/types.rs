use serde::Serialize;

use super::error::SimulationError;

pub const MAX_HORIZON_PERIODS: u32 = 1_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResetPolicy {
    Reset,
    Retain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanTerms {
    pub initial_debt: f64,
    pub yearly_raise_rate: f64,
    pub interest_salary_floor: f64,
    pub interest_salary_ceiling: f64,
    pub max_adjustable_rate: f64,
    pub inflation_linked_rate: f64,
    pub repayment_salary_floor: f64,
    pub compounding_period: u32,
    pub automatic_repayment_rate: f64,
    pub horizon_years: u32,
}

impl Default for LoanTerms {
    fn default() -> Self {
        Self {
            initial_debt: 40_000.0,
            yearly_raise_rate: 0.05,
            interest_salary_floor: 26_575.0,
            interest_salary_ceiling: 47_835.0,
            max_adjustable_rate: 0.03,
            inflation_linked_rate: 0.03,
            repayment_salary_floor: 26_575.0,
            compounding_period: 365,
            automatic_repayment_rate: 0.09,
            horizon_years: 30,
        }
    }
}

impl LoanTerms {
    pub fn horizon_periods(&self) -> u32 {
        self.horizon_years.saturating_mul(self.compounding_period)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.compounding_period == 0 {
            return Err(SimulationError::config("compounding_period", "must be > 0"));
        }
        if self.horizon_years == 0 {
            return Err(SimulationError::config("horizon_years", "must be > 0"));
        }
        match self.horizon_years.checked_mul(self.compounding_period) {
            Some(periods) if periods <= MAX_HORIZON_PERIODS => {}
            _ => {
                return Err(SimulationError::config(
                    "horizon_years",
                    format!(
                        "horizon of {} years at {} periods per year exceeds {MAX_HORIZON_PERIODS} periods",
                        self.horizon_years, self.compounding_period
                    ),
                ));
            }
        }
        if !self.initial_debt.is_finite() || self.initial_debt < 0.0 {
            return Err(SimulationError::config("initial_debt", "must be finite and >= 0"));
        }
        if !self.yearly_raise_rate.is_finite() || self.yearly_raise_rate < 0.0 {
            return Err(SimulationError::config("yearly_raise_rate", "must be finite and >= 0"));
        }
        if !self.repayment_salary_floor.is_finite() || self.repayment_salary_floor < 0.0 {
            return Err(SimulationError::config(
                "repayment_salary_floor",
                "must be finite and >= 0",
            ));
        }
        if !self.max_adjustable_rate.is_finite() || self.max_adjustable_rate < 0.0 {
            return Err(SimulationError::config("max_adjustable_rate", "must be finite and >= 0"));
        }
        if !self.inflation_linked_rate.is_finite() || self.inflation_linked_rate <= -1.0 {
            return Err(SimulationError::config(
                "inflation_linked_rate",
                "must be finite and > -100%",
            ));
        }
        if !(0.0..=1.0).contains(&self.automatic_repayment_rate) {
            return Err(SimulationError::config(
                "automatic_repayment_rate",
                "must be between 0 and 1",
            ));
        }
        if self.interest_salary_ceiling <= self.interest_salary_floor {
            return Err(SimulationError::config(
                "interest_salary_ceiling",
                format!(
                    "must be > interest salary floor ({} <= {})",
                    self.interest_salary_ceiling, self.interest_salary_floor
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WealthTerms {
    pub loan: LoanTerms,
    pub yearly_return: f64,
    pub disposable_income_fraction: f64,
}

impl Default for WealthTerms {
    fn default() -> Self {
        Self {
            loan: LoanTerms {
                initial_debt: 36_000.0,
                yearly_raise_rate: 0.036,
                compounding_period: 12,
                ..LoanTerms::default()
            },
            yearly_return: 0.05,
            disposable_income_fraction: 0.4,
        }
    }
}

impl WealthTerms {
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.loan.validate()?;
        if !self.yearly_return.is_finite() || self.yearly_return <= -1.0 {
            return Err(SimulationError::config("yearly_return", "must be finite and > -100%"));
        }
        if !(0.0..=1.0).contains(&self.disposable_income_fraction) {
            return Err(SimulationError::config(
                "disposable_income_fraction",
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtRateOutcome {
    pub effective_annual_rate: f64,
    pub months_to_repay: u32,
    pub total_paid: f64,
    pub remaining_debt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthOutcome {
    pub terminal_wealth: f64,
    pub months_to_repay: u32,
    pub repaid: bool,
    pub total_repaid: f64,
}
