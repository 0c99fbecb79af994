mod engine;
mod error;
mod rules;
mod sweep;
mod types;

pub use engine::{
    DebtRateCalculator, SimulationState, WealthCalculator, WealthState, effective_annual_rate,
};
pub use error::SimulationError;
pub use rules::{InterestBand, automatic_contribution, per_period, period_rate};
pub use sweep::{
    GridSpec, RepaymentSweep, SalarySweep, WealthSweep, linear_grid, rate_vs_repayment_rate,
    rate_vs_salary, wealth_vs_prepayment,
};
pub use types::{
    DebtRateOutcome, LoanTerms, MAX_HORIZON_PERIODS, ResetPolicy, WealthOutcome, WealthTerms,
};
