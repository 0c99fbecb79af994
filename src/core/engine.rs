use serde::Serialize;
use tracing::debug;

use super::error::SimulationError;
use super::rules::{InterestBand, automatic_contribution, per_period, period_rate, tick_growth};
use super::types::{DebtRateOutcome, LoanTerms, ResetPolicy, WealthOutcome, WealthTerms};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub monthly_salary: f64,
    pub debt_balance: f64,
    pub total_paid: f64,
    pub current_month: u32,
}

impl SimulationState {
    fn initial(initial_yearly_salary: f64, terms: &LoanTerms) -> Self {
        Self {
            monthly_salary: per_period(initial_yearly_salary, terms.compounding_period),
            debt_balance: terms.initial_debt,
            total_paid: 0.0,
            current_month: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthState {
    pub loan: SimulationState,
    pub is_repaid: bool,
    pub repayment_month: u32,
    pub asset_price: f64,
    pub invested_units: f64,
    pub available_income: f64,
}

impl WealthState {
    pub fn terminal_wealth(&self) -> f64 {
        self.asset_price * self.invested_units
    }
}

#[derive(Debug, Clone, Copy)]
struct PeriodTerms {
    compounding_period: u32,
    horizon: u32,
    raise_rate: f64,
    band: InterestBand,
    repayment_floor: f64,
    automatic_rate: f64,
}

impl PeriodTerms {
    fn from_terms(terms: &LoanTerms) -> Result<Self, SimulationError> {
        terms.validate()?;
        let n = terms.compounding_period;
        Ok(Self {
            compounding_period: n,
            horizon: terms.horizon_periods(),
            raise_rate: period_rate(terms.yearly_raise_rate, n),
            band: InterestBand::new(
                per_period(terms.interest_salary_floor, n),
                per_period(terms.interest_salary_ceiling, n),
                terms.max_adjustable_rate,
                terms.inflation_linked_rate,
            )?,
            repayment_floor: per_period(terms.repayment_salary_floor, n),
            automatic_rate: terms.automatic_repayment_rate,
        })
    }

    fn compound_debt(&self, salary: f64, debt: f64) -> f64 {
        tick_growth(self.band.rate(salary), self.compounding_period) * debt
    }

    fn raise_salary(&self, salary: f64) -> f64 {
        salary * tick_growth(self.raise_rate, self.compounding_period)
    }

    fn automatic(&self, salary: f64) -> f64 {
        automatic_contribution(salary, self.repayment_floor, self.automatic_rate)
    }
}

fn validate_salary(initial_yearly_salary: f64) -> Result<(), SimulationError> {
    if !initial_yearly_salary.is_finite() || initial_yearly_salary < 0.0 {
        return Err(SimulationError::config(
            "initial_yearly_salary",
            "must be finite and >= 0",
        ));
    }
    Ok(())
}

fn validate_fraction(voluntary_fraction: f64, max: Option<f64>) -> Result<(), SimulationError> {
    if !voluntary_fraction.is_finite() || voluntary_fraction < 0.0 {
        return Err(SimulationError::config(
            "voluntary_fraction",
            "must be finite and >= 0",
        ));
    }
    match max {
        Some(max) if voluntary_fraction > max => Err(SimulationError::config(
            "voluntary_fraction",
            format!("must be <= {max}"),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct DebtRateCalculator {
    initial_debt: f64,
    periodic: PeriodTerms,
    initial: SimulationState,
    state: SimulationState,
    reset_policy: ResetPolicy,
}

impl DebtRateCalculator {
    pub fn new(initial_yearly_salary: f64, terms: &LoanTerms) -> Result<Self, SimulationError> {
        validate_salary(initial_yearly_salary)?;
        let periodic = PeriodTerms::from_terms(terms)?;
        let initial = SimulationState::initial(initial_yearly_salary, terms);
        Ok(Self {
            initial_debt: terms.initial_debt,
            periodic,
            initial,
            state: initial,
            reset_policy: ResetPolicy::Reset,
        })
    }

    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn horizon(&self) -> u32 {
        self.periodic.horizon
    }

    pub fn interest_rate(&self, salary: f64) -> f64 {
        self.periodic.band.rate(salary)
    }

    pub fn is_finished(&self) -> bool {
        self.state.current_month >= self.periodic.horizon || self.state.debt_balance <= 0.0
    }

    pub fn step(&mut self, voluntary_fraction: f64) -> Result<f64, SimulationError> {
        validate_fraction(voluntary_fraction, None)?;
        Ok(self.advance(voluntary_fraction))
    }

    fn advance(&mut self, voluntary_fraction: f64) -> f64 {
        let state = &mut self.state;
        let compounded = self
            .periodic
            .compound_debt(state.monthly_salary, state.debt_balance);
        let payment = base_repayment(
            &self.periodic,
            voluntary_fraction,
            state.monthly_salary,
            compounded,
        );
        state.debt_balance = compounded - payment;
        state.total_paid += payment;
        state.monthly_salary = self.periodic.raise_salary(state.monthly_salary);
        state.current_month += 1;
        payment
    }

    pub fn calculate(&mut self, voluntary_fraction: f64) -> Result<DebtRateOutcome, SimulationError> {
        validate_fraction(voluntary_fraction, None)?;
        while !self.is_finished() {
            self.advance(voluntary_fraction);
        }

        let outcome = self.outcome();
        if let Ok(result) = &outcome {
            debug!(
                voluntary_fraction,
                months = result.months_to_repay,
                effective_rate = result.effective_annual_rate,
                "debt rate calculation finished"
            );
        }
        if self.reset_policy == ResetPolicy::Reset {
            self.reset();
        }
        outcome
    }

    pub fn reset(&mut self) {
        self.state = self.initial;
    }

    fn outcome(&self) -> Result<DebtRateOutcome, SimulationError> {
        Ok(DebtRateOutcome {
            effective_annual_rate: effective_annual_rate(
                self.state.total_paid,
                self.initial_debt,
                self.state.current_month,
                self.periodic.compounding_period,
            )?,
            months_to_repay: self.state.current_month,
            total_paid: self.state.total_paid,
            remaining_debt: self.state.debt_balance,
        })
    }
}

/// Payment for one tick of the base calculator. A payment that would
/// overshoot returns the whole compounded debt instead.
fn base_repayment(
    periodic: &PeriodTerms,
    voluntary_fraction: f64,
    salary: f64,
    compounded_debt: f64,
) -> f64 {
    let automatic = periodic.automatic(salary);
    let voluntary = voluntary_fraction * salary;
    let payment = automatic + voluntary;
    if compounded_debt - payment < 0.0 {
        return compounded_debt;
    }
    payment
}

pub fn effective_annual_rate(
    total_paid: f64,
    initial_debt: f64,
    periods: u32,
    compounding_period: u32,
) -> Result<f64, SimulationError> {
    if periods == 0 {
        return Err(SimulationError::InvalidResult(
            "effective rate is undefined before any period has elapsed".to_string(),
        ));
    }
    if initial_debt <= 0.0 {
        return Err(SimulationError::InvalidResult(
            "effective rate is undefined for a zero initial debt".to_string(),
        ));
    }
    Ok((total_paid / initial_debt).powf(compounding_period as f64 / periods as f64) - 1.0)
}

#[derive(Debug, Clone)]
pub struct WealthCalculator {
    periodic: PeriodTerms,
    investment_return: f64,
    disposable_income_fraction: f64,
    initial: WealthState,
    state: WealthState,
    reset_policy: ResetPolicy,
}

impl WealthCalculator {
    pub fn new(initial_yearly_salary: f64, terms: &WealthTerms) -> Result<Self, SimulationError> {
        validate_salary(initial_yearly_salary)?;
        terms.validate()?;
        let periodic = PeriodTerms::from_terms(&terms.loan)?;
        let loan = SimulationState::initial(initial_yearly_salary, &terms.loan);
        let initial = WealthState {
            loan,
            is_repaid: false,
            repayment_month: periodic.horizon,
            asset_price: 1.0,
            invested_units: 0.0,
            available_income: loan.monthly_salary * terms.disposable_income_fraction,
        };
        Ok(Self {
            periodic,
            investment_return: period_rate(terms.yearly_return, terms.loan.compounding_period),
            disposable_income_fraction: terms.disposable_income_fraction,
            initial,
            state: initial,
            reset_policy: ResetPolicy::Retain,
        })
    }

    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    pub fn state(&self) -> &WealthState {
        &self.state
    }

    pub fn horizon(&self) -> u32 {
        self.periodic.horizon
    }

    pub fn is_finished(&self) -> bool {
        self.state.loan.current_month >= self.periodic.horizon
    }

    pub fn step(&mut self, voluntary_fraction: f64) -> Result<f64, SimulationError> {
        validate_fraction(voluntary_fraction, Some(1.0))?;
        Ok(self.advance(voluntary_fraction))
    }

    fn advance(&mut self, voluntary_fraction: f64) -> f64 {
        let salary = self.state.loan.monthly_salary;
        let compounded = self
            .periodic
            .compound_debt(salary, self.state.loan.debt_balance);
        let payment = self.repayment(voluntary_fraction, compounded);

        let periodic = self.periodic;
        let state = &mut self.state;
        state.loan.debt_balance = (compounded - payment).max(0.0);
        state.loan.total_paid += payment;

        // Price moves first; this period's residual income buys at the new price.
        state.asset_price *= tick_growth(self.investment_return, periodic.compounding_period);
        state.invested_units += state.available_income / state.asset_price;

        state.loan.monthly_salary = periodic.raise_salary(salary);
        state.loan.current_month += 1;
        payment
    }

    pub fn calculate(&mut self, voluntary_fraction: f64) -> Result<WealthOutcome, SimulationError> {
        validate_fraction(voluntary_fraction, Some(1.0))?;
        while !self.is_finished() {
            self.advance(voluntary_fraction);
        }

        let outcome = WealthOutcome {
            terminal_wealth: self.state.terminal_wealth(),
            months_to_repay: self.state.repayment_month,
            repaid: self.state.is_repaid,
            total_repaid: self.state.loan.total_paid,
        };
        debug!(
            voluntary_fraction,
            months = outcome.months_to_repay,
            terminal_wealth = outcome.terminal_wealth,
            "wealth calculation finished"
        );
        if self.reset_policy == ResetPolicy::Reset {
            self.reset();
        }
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.state = self.initial;
    }

    fn repayment(&mut self, voluntary_fraction: f64, compounded_debt: f64) -> f64 {
        let state = &mut self.state;
        let salary = state.loan.monthly_salary;
        state.available_income = salary * self.disposable_income_fraction;

        if state.is_repaid {
            return 0.0;
        }

        let mut automatic = self.periodic.automatic(salary);
        let remaining_income = (state.available_income - automatic).max(0.0);
        let mut voluntary = voluntary_fraction * remaining_income;

        if compounded_debt <= 0.0 {
            state.is_repaid = true;
            state.repayment_month = state.loan.current_month;
            automatic = 0.0;
            voluntary = 0.0;
        }

        if compounded_debt - automatic < 0.0 {
            automatic = compounded_debt.max(0.0);
            voluntary = 0.0;
        }

        if compounded_debt - automatic < voluntary {
            voluntary = (compounded_debt - automatic).max(0.0);
        }

        let contribution = automatic + voluntary;
        state.available_income = (state.available_income - contribution).max(0.0);
        contribution
    }
}
