use super::error::SimulationError;

// n * ((1 + r)^(1/n) - 1)
pub fn period_rate(yearly_rate: f64, compounding_period: u32) -> f64 {
    let n = compounding_period as f64;
    n * ((1.0 + yearly_rate).powf(1.0 / n) - 1.0)
}

pub fn per_period(yearly_amount: f64, compounding_period: u32) -> f64 {
    yearly_amount / compounding_period as f64
}

pub fn tick_growth(period_rate: f64, compounding_period: u32) -> f64 {
    1.0 + period_rate / compounding_period as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestBand {
    floor: f64,
    ceiling: f64,
    max_adjustable_rate: f64,
    inflation_linked_rate: f64,
}

impl InterestBand {
    pub fn new(
        floor: f64,
        ceiling: f64,
        max_adjustable_rate: f64,
        inflation_linked_rate: f64,
    ) -> Result<Self, SimulationError> {
        if !floor.is_finite() || !ceiling.is_finite() {
            return Err(SimulationError::config(
                "interest_salary_ceiling",
                "thresholds must be finite",
            ));
        }
        if ceiling <= floor {
            return Err(SimulationError::config(
                "interest_salary_ceiling",
                format!("must be > interest salary floor ({ceiling} <= {floor})"),
            ));
        }
        Ok(Self {
            floor,
            ceiling,
            max_adjustable_rate,
            inflation_linked_rate,
        })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn rate(&self, salary: f64) -> f64 {
        let floating = if salary < self.floor {
            0.0
        } else if salary <= self.ceiling {
            self.max_adjustable_rate * ((salary - self.floor) / (self.ceiling - self.floor))
        } else {
            self.max_adjustable_rate
        };
        self.inflation_linked_rate + floating
    }
}

pub fn automatic_contribution(salary: f64, repayment_floor: f64, contribution_rate: f64) -> f64 {
    contribution_rate * (salary - repayment_floor).max(0.0)
}
