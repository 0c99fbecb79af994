use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    DebtRateCalculator, DebtRateOutcome, GridSpec, LoanTerms, RepaymentSweep, SalarySweep,
    WealthCalculator, WealthOutcome, WealthSweep, WealthTerms, rate_vs_repayment_rate,
    rate_vs_salary, wealth_vs_prepayment,
};

const SALARY_SWEEP_SALARIES: &str = "25000..65000/100";
const SALARY_SWEEP_RATES: &str = "0..=20/4";
const REPAYMENT_SWEEP_SALARIES: &str = "50000..80000/1";
const REPAYMENT_SWEEP_RATES: &str = "0..=50/100";
const WEALTH_SWEEP_SALARIES: &str = "40000..10000/3";
const WEALTH_SWEEP_PROPORTIONS: &str = "0..=100/1000";
const MAX_GRID_POINTS: usize = 10_001;
const MAX_SWEEP_PERIODS: u64 = 100_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "student-debt",
    about = "Income-contingent student loan repayment and wealth simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Effective annual interest rate and time to repay for one salary")]
    DebtRate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(
            long,
            default_value_t = 0.0,
            help = "Voluntary repayment as percent of gross salary"
        )]
        voluntary_rate: f64,
    },
    #[command(about = "Terminal investment wealth when overpaying the loan")]
    Wealth {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(
            long,
            default_value_t = 0.0,
            help = "Percent of disposable income left after mandatory repayment that goes to the loan"
        )]
        prepayment_proportion: f64,
    },
    #[command(about = "Effective rate and years to repay across salaries and repayment rates")]
    SweepSalary {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, default_value = SALARY_SWEEP_SALARIES, help = "Yearly salaries, min..max/steps")]
        salaries: GridSpec,
        #[arg(long, default_value = SALARY_SWEEP_RATES, help = "Voluntary rates in percent, min..=max/steps")]
        rates: GridSpec,
    },
    #[command(about = "Effective rate and total spent across repayment rates")]
    SweepRepayment {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, default_value = REPAYMENT_SWEEP_SALARIES)]
        salaries: GridSpec,
        #[arg(long, default_value = REPAYMENT_SWEEP_RATES)]
        rates: GridSpec,
    },
    #[command(about = "Terminal wealth and years to repay across prepayment proportions")]
    SweepWealth {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, default_value = WEALTH_SWEEP_SALARIES)]
        salaries: GridSpec,
        #[arg(long, default_value = WEALTH_SWEEP_PROPORTIONS)]
        proportions: GridSpec,
    },
    #[command(about = "Serve the JSON API over HTTP")]
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct ScenarioArgs {
    #[arg(long, help = "Initial yearly salary")]
    initial_salary: Option<f64>,
    #[arg(long)]
    initial_debt: Option<f64>,
    #[arg(long, help = "Yearly pay rise in percent")]
    raise_rate: Option<f64>,
    #[arg(long, help = "Yearly salary where variable interest starts")]
    interest_floor: Option<f64>,
    #[arg(long, help = "Yearly salary where variable interest reaches its maximum")]
    interest_ceiling: Option<f64>,
    #[arg(long, help = "Maximum variable interest in percent")]
    max_adjustable_rate: Option<f64>,
    #[arg(long, help = "Fixed inflation-linked interest in percent")]
    inflation_linked_rate: Option<f64>,
    #[arg(long, help = "Yearly salary above which mandatory repayment applies")]
    repayment_floor: Option<f64>,
    #[arg(long, help = "Compounding periods per year, e.g. 12 or 365")]
    compounding_period: Option<u32>,
    #[arg(long, help = "Mandatory repayment in percent of salary above the floor")]
    automatic_repayment_rate: Option<f64>,
    #[arg(long)]
    horizon_years: Option<u32>,
    #[arg(long, help = "Yearly investment return in percent (wealth only)")]
    investment_return: Option<f64>,
    #[arg(long, help = "Disposable income in percent of salary (wealth only)")]
    disposable_income: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    #[serde(alias = "salary")]
    initial_salary: Option<f64>,
    #[serde(alias = "debt")]
    initial_debt: Option<f64>,
    raise_rate: Option<f64>,
    interest_floor: Option<f64>,
    interest_ceiling: Option<f64>,
    max_adjustable_rate: Option<f64>,
    inflation_linked_rate: Option<f64>,
    repayment_floor: Option<f64>,
    compounding_period: Option<u32>,
    automatic_repayment_rate: Option<f64>,
    horizon_years: Option<u32>,
    investment_return: Option<f64>,
    disposable_income: Option<f64>,
    voluntary_rate: Option<f64>,
    prepayment_proportion: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SweepPayload {
    #[serde(flatten)]
    scenario: ScenarioPayload,
    salaries: Option<GridSpec>,
    #[serde(alias = "proportions")]
    rates: Option<GridSpec>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SweepKind {
    Salary,
    Repayment,
    Wealth,
}

#[derive(Debug)]
struct DebtRateRequest {
    initial_salary: f64,
    terms: LoanTerms,
    voluntary_rate: f64,
}

#[derive(Debug)]
struct WealthRequest {
    initial_salary: f64,
    terms: WealthTerms,
    prepayment_proportion: f64,
}

#[derive(Debug)]
enum SweepTerms {
    Loan(LoanTerms),
    Wealth(WealthTerms),
}

#[derive(Debug)]
struct SweepRequest {
    kind: SweepKind,
    terms: SweepTerms,
    salaries: Vec<f64>,
    rates: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebtRateResponse {
    initial_salary: f64,
    voluntary_rate: f64,
    compounding_period: u32,
    years_to_repay: f64,
    #[serde(flatten)]
    outcome: DebtRateOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WealthResponse {
    initial_salary: f64,
    prepayment_proportion: f64,
    compounding_period: u32,
    years_to_repay: f64,
    #[serde(flatten)]
    outcome: WealthOutcome,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SweepResponse {
    Salary(SalarySweep),
    Repayment(RepaymentSweep),
    Wealth(WealthSweep),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn percent(flag: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        return Err(format!("--{flag} must be a finite number"));
    }
    Ok(value / 100.0)
}

fn build_loan_terms(args: &ScenarioArgs, defaults: LoanTerms) -> Result<LoanTerms, String> {
    let mut terms = defaults;
    if let Some(v) = args.initial_debt {
        terms.initial_debt = v;
    }
    if let Some(v) = args.raise_rate {
        terms.yearly_raise_rate = percent("raise-rate", v)?;
    }
    if let Some(v) = args.interest_floor {
        terms.interest_salary_floor = v;
    }
    if let Some(v) = args.interest_ceiling {
        terms.interest_salary_ceiling = v;
    }
    if let Some(v) = args.max_adjustable_rate {
        terms.max_adjustable_rate = percent("max-adjustable-rate", v)?;
    }
    if let Some(v) = args.inflation_linked_rate {
        terms.inflation_linked_rate = percent("inflation-linked-rate", v)?;
    }
    if let Some(v) = args.repayment_floor {
        terms.repayment_salary_floor = v;
    }
    if let Some(v) = args.compounding_period {
        terms.compounding_period = v;
    }
    if let Some(v) = args.automatic_repayment_rate {
        terms.automatic_repayment_rate = percent("automatic-repayment-rate", v)?;
    }
    if let Some(v) = args.horizon_years {
        terms.horizon_years = v;
    }

    terms.validate().map_err(|e| e.to_string())?;
    Ok(terms)
}

fn build_debt_terms(args: &ScenarioArgs) -> Result<LoanTerms, String> {
    if args.investment_return.is_some() {
        return Err("--investment-return only applies to wealth calculations".to_string());
    }
    if args.disposable_income.is_some() {
        return Err("--disposable-income only applies to wealth calculations".to_string());
    }
    build_loan_terms(args, LoanTerms::default())
}

fn build_wealth_terms(args: &ScenarioArgs) -> Result<WealthTerms, String> {
    let defaults = WealthTerms::default();
    let mut terms = WealthTerms {
        loan: build_loan_terms(args, defaults.loan)?,
        ..defaults
    };
    if let Some(v) = args.investment_return {
        terms.yearly_return = percent("investment-return", v)?;
    }
    if let Some(v) = args.disposable_income {
        terms.disposable_income_fraction = percent("disposable-income", v)?;
    }

    terms.validate().map_err(|e| e.to_string())?;
    Ok(terms)
}

fn require_salary(args: &ScenarioArgs) -> Result<f64, String> {
    let salary = args
        .initial_salary
        .ok_or_else(|| "--initial-salary is required".to_string())?;
    if !salary.is_finite() || salary < 0.0 {
        return Err("--initial-salary must be >= 0".to_string());
    }
    Ok(salary)
}

fn fraction_from_percent(flag: &str, value: f64) -> Result<f64, String> {
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("--{flag} must be between 0 and 100"));
    }
    Ok(value / 100.0)
}

fn build_debt_rate_request(
    args: &ScenarioArgs,
    voluntary_rate: f64,
) -> Result<DebtRateRequest, String> {
    Ok(DebtRateRequest {
        initial_salary: require_salary(args)?,
        terms: build_debt_terms(args)?,
        voluntary_rate: fraction_from_percent("voluntary-rate", voluntary_rate)?,
    })
}

fn build_wealth_request(
    args: &ScenarioArgs,
    prepayment_proportion: f64,
) -> Result<WealthRequest, String> {
    Ok(WealthRequest {
        initial_salary: require_salary(args)?,
        terms: build_wealth_terms(args)?,
        prepayment_proportion: fraction_from_percent(
            "prepayment-proportion",
            prepayment_proportion,
        )?,
    })
}

fn grid_points(flag: &str, grid: GridSpec) -> Result<Vec<f64>, String> {
    if !grid.min.is_finite() || !grid.max.is_finite() {
        return Err(format!("--{flag} bounds must be finite"));
    }
    let points = grid.points();
    if points.is_empty() {
        return Err(format!("--{flag} must contain at least one point"));
    }
    if points.len() > MAX_GRID_POINTS {
        return Err(format!("--{flag} must contain at most {MAX_GRID_POINTS} points"));
    }
    Ok(points)
}

fn build_sweep_request(
    kind: SweepKind,
    args: &ScenarioArgs,
    salaries: GridSpec,
    rates: GridSpec,
) -> Result<SweepRequest, String> {
    let salaries = grid_points("salaries", salaries)?;
    if salaries.iter().any(|s| *s < 0.0) {
        return Err("--salaries must be >= 0".to_string());
    }
    let rate_flag = match kind {
        SweepKind::Wealth => "proportions",
        SweepKind::Salary | SweepKind::Repayment => "rates",
    };
    let rates = grid_points(rate_flag, rates.scaled(0.01))?;
    if rates.iter().any(|r| *r < 0.0) {
        return Err(format!("--{rate_flag} must be >= 0"));
    }
    let terms = match kind {
        SweepKind::Wealth => SweepTerms::Wealth(build_wealth_terms(args)?),
        SweepKind::Salary | SweepKind::Repayment => SweepTerms::Loan(build_debt_terms(args)?),
    };
    let horizon = match &terms {
        SweepTerms::Loan(loan) | SweepTerms::Wealth(WealthTerms { loan, .. }) => {
            loan.horizon_periods()
        }
    };
    let cells = salaries.len() as u64 * rates.len() as u64;
    if cells.saturating_mul(u64::from(horizon)) > MAX_SWEEP_PERIODS {
        return Err(format!(
            "sweep of {cells} cells over {horizon} periods exceeds {MAX_SWEEP_PERIODS} simulated periods"
        ));
    }
    Ok(SweepRequest {
        kind,
        terms,
        salaries,
        rates,
    })
}

fn default_grids(kind: SweepKind) -> Result<(GridSpec, GridSpec), String> {
    let (salaries, rates) = match kind {
        SweepKind::Salary => (SALARY_SWEEP_SALARIES, SALARY_SWEEP_RATES),
        SweepKind::Repayment => (REPAYMENT_SWEEP_SALARIES, REPAYMENT_SWEEP_RATES),
        SweepKind::Wealth => (WEALTH_SWEEP_SALARIES, WEALTH_SWEEP_PROPORTIONS),
    };
    Ok((salaries.parse()?, rates.parse()?))
}

fn run_debt_rate(request: &DebtRateRequest) -> Result<DebtRateResponse, String> {
    let mut calc = DebtRateCalculator::new(request.initial_salary, &request.terms)
        .map_err(|e| e.to_string())?;
    let outcome = calc
        .calculate(request.voluntary_rate)
        .map_err(|e| e.to_string())?;
    Ok(DebtRateResponse {
        initial_salary: request.initial_salary,
        voluntary_rate: request.voluntary_rate,
        compounding_period: request.terms.compounding_period,
        years_to_repay: outcome.months_to_repay as f64 / request.terms.compounding_period as f64,
        outcome,
    })
}

fn run_wealth(request: &WealthRequest) -> Result<WealthResponse, String> {
    let mut calc = WealthCalculator::new(request.initial_salary, &request.terms)
        .map_err(|e| e.to_string())?;
    let outcome = calc
        .calculate(request.prepayment_proportion)
        .map_err(|e| e.to_string())?;
    let periods_per_year = request.terms.loan.compounding_period;
    Ok(WealthResponse {
        initial_salary: request.initial_salary,
        prepayment_proportion: request.prepayment_proportion,
        compounding_period: periods_per_year,
        years_to_repay: outcome.months_to_repay as f64 / periods_per_year as f64,
        outcome,
    })
}

fn run_sweep(request: &SweepRequest) -> Result<SweepResponse, String> {
    let response = match (&request.terms, request.kind) {
        (SweepTerms::Loan(terms), SweepKind::Salary) => SweepResponse::Salary(
            rate_vs_salary(terms, &request.salaries, &request.rates).map_err(|e| e.to_string())?,
        ),
        (SweepTerms::Loan(terms), SweepKind::Repayment) => SweepResponse::Repayment(
            rate_vs_repayment_rate(terms, &request.salaries, &request.rates)
                .map_err(|e| e.to_string())?,
        ),
        (SweepTerms::Wealth(terms), SweepKind::Wealth) => SweepResponse::Wealth(
            wealth_vs_prepayment(terms, &request.salaries, &request.rates)
                .map_err(|e| e.to_string())?,
        ),
        (_, kind) => return Err(format!("terms do not match the {kind:?} sweep")),
    };
    Ok(response)
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("server error: {e}")),
        Command::DebtRate {
            scenario,
            voluntary_rate,
        } => {
            let request = build_debt_rate_request(&scenario, voluntary_rate)?;
            print_json(&run_debt_rate(&request)?)
        }
        Command::Wealth {
            scenario,
            prepayment_proportion,
        } => {
            let request = build_wealth_request(&scenario, prepayment_proportion)?;
            print_json(&run_wealth(&request)?)
        }
        Command::SweepSalary {
            scenario,
            salaries,
            rates,
        } => {
            let request = build_sweep_request(SweepKind::Salary, &scenario, salaries, rates)?;
            print_json(&run_sweep(&request)?)
        }
        Command::SweepRepayment {
            scenario,
            salaries,
            rates,
        } => {
            let request = build_sweep_request(SweepKind::Repayment, &scenario, salaries, rates)?;
            print_json(&run_sweep(&request)?)
        }
        Command::SweepWealth {
            scenario,
            salaries,
            proportions,
        } => {
            let request =
                build_sweep_request(SweepKind::Wealth, &scenario, salaries, proportions)?;
            print_json(&run_sweep(&request)?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/debt-rate",
            get(debt_rate_get_handler).post(debt_rate_post_handler),
        )
        .route(
            "/api/wealth",
            get(wealth_get_handler).post(wealth_post_handler),
        )
        .route("/api/sweep/salary", post(sweep_salary_handler))
        .route("/api/sweep/repayment", post(sweep_repayment_handler))
        .route("/api/sweep/wealth", post(sweep_wealth_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "student debt HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/debt-rate?initialSalary=40000");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn debt_rate_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    debt_rate_handler_impl(payload)
}

async fn debt_rate_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    debt_rate_handler_impl(payload)
}

async fn wealth_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    wealth_handler_impl(payload)
}

async fn wealth_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    wealth_handler_impl(payload)
}

async fn sweep_salary_handler(Json(payload): Json<SweepPayload>) -> Response {
    sweep_handler_impl(SweepKind::Salary, payload).await
}

async fn sweep_repayment_handler(Json(payload): Json<SweepPayload>) -> Response {
    sweep_handler_impl(SweepKind::Repayment, payload).await
}

async fn sweep_wealth_handler(Json(payload): Json<SweepPayload>) -> Response {
    sweep_handler_impl(SweepKind::Wealth, payload).await
}

fn debt_rate_handler_impl(payload: ScenarioPayload) -> Response {
    let result = build_debt_rate_request(
        &scenario_args_from_payload(&payload),
        payload.voluntary_rate.unwrap_or(0.0),
    )
    .and_then(|request| run_debt_rate(&request));
    respond(result)
}

fn wealth_handler_impl(payload: ScenarioPayload) -> Response {
    let result = build_wealth_request(
        &scenario_args_from_payload(&payload),
        payload.prepayment_proportion.unwrap_or(0.0),
    )
    .and_then(|request| run_wealth(&request));
    respond(result)
}

async fn sweep_handler_impl(kind: SweepKind, payload: SweepPayload) -> Response {
    let result = tokio::task::spawn_blocking(move || {
        sweep_request_from_payload(kind, payload).and_then(|request| run_sweep(&request))
    })
    .await
    .unwrap_or_else(|e| Err(format!("sweep task failed: {e}")));
    respond(result)
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            warn!(error = %msg, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn scenario_args_from_payload(payload: &ScenarioPayload) -> ScenarioArgs {
    ScenarioArgs {
        initial_salary: payload.initial_salary,
        initial_debt: payload.initial_debt,
        raise_rate: payload.raise_rate,
        interest_floor: payload.interest_floor,
        interest_ceiling: payload.interest_ceiling,
        max_adjustable_rate: payload.max_adjustable_rate,
        inflation_linked_rate: payload.inflation_linked_rate,
        repayment_floor: payload.repayment_floor,
        compounding_period: payload.compounding_period,
        automatic_repayment_rate: payload.automatic_repayment_rate,
        horizon_years: payload.horizon_years,
        investment_return: payload.investment_return,
        disposable_income: payload.disposable_income,
    }
}

fn sweep_request_from_payload(
    kind: SweepKind,
    payload: SweepPayload,
) -> Result<SweepRequest, String> {
    let (default_salaries, default_rates) = default_grids(kind)?;
    build_sweep_request(
        kind,
        &scenario_args_from_payload(&payload.scenario),
        payload.salaries.unwrap_or(default_salaries),
        payload.rates.unwrap_or(default_rates),
    )
}

#[cfg(test)]
fn sweep_request_from_json(kind: SweepKind, json: &str) -> Result<SweepRequest, String> {
    let payload = serde_json::from_str::<SweepPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    sweep_request_from_payload(kind, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        ScenarioArgs {
            initial_salary: Some(40_000.0),
            ..ScenarioArgs::default()
        }
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, json)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request")
    }

    #[test]
    fn build_debt_terms_uses_base_defaults() {
        let terms = build_debt_terms(&sample_args()).expect("valid terms");
        assert_eq!(terms, LoanTerms::default());
    }

    #[test]
    fn build_wealth_terms_uses_wealth_defaults() {
        let terms = build_wealth_terms(&sample_args()).expect("valid terms");
        assert_eq!(terms, WealthTerms::default());
    }

    #[test]
    fn build_loan_terms_converts_percentages() {
        let mut args = sample_args();
        args.raise_rate = Some(3.6);
        args.max_adjustable_rate = Some(2.0);
        args.inflation_linked_rate = Some(1.5);
        args.automatic_repayment_rate = Some(6.0);
        args.compounding_period = Some(12);
        args.horizon_years = Some(40);

        let terms = build_debt_terms(&args).expect("valid terms");
        assert_approx(terms.yearly_raise_rate, 0.036);
        assert_approx(terms.max_adjustable_rate, 0.02);
        assert_approx(terms.inflation_linked_rate, 0.015);
        assert_approx(terms.automatic_repayment_rate, 0.06);
        assert_eq!(terms.compounding_period, 12);
        assert_eq!(terms.horizon_periods(), 480);
    }

    #[test]
    fn build_debt_terms_rejects_wealth_only_flags() {
        let mut args = sample_args();
        args.disposable_income = Some(40.0);
        let err = build_debt_terms(&args).expect_err("wealth-only flag");
        assert!(err.contains("--disposable-income"));
    }

    #[test]
    fn build_loan_terms_rejects_inverted_interest_band() {
        let mut args = sample_args();
        args.interest_floor = Some(50_000.0);
        args.interest_ceiling = Some(30_000.0);
        let err = build_debt_terms(&args).expect_err("ceiling below floor");
        assert!(err.contains("interest_salary_ceiling"));
    }

    #[test]
    fn build_debt_rate_request_requires_salary() {
        let err = build_debt_rate_request(&ScenarioArgs::default(), 0.0).expect_err("no salary");
        assert!(err.contains("--initial-salary"));
    }

    #[test]
    fn build_debt_rate_request_rejects_out_of_range_rate() {
        let err = build_debt_rate_request(&sample_args(), 120.0).expect_err("rate above 100");
        assert!(err.contains("--voluntary-rate"));
        assert!(build_debt_rate_request(&sample_args(), -1.0).is_err());
    }

    #[test]
    fn run_debt_rate_reports_years_and_outcome() {
        let mut args = sample_args();
        args.initial_salary = Some(200_000.0);
        args.initial_debt = Some(10.0);
        let request = build_debt_rate_request(&args, 50.0).expect("valid request");
        assert_approx(request.voluntary_rate, 0.5);

        let response = run_debt_rate(&request).expect("rate defined");
        assert_eq!(response.outcome.months_to_repay, 1);
        assert_approx(response.years_to_repay, 1.0 / 365.0);
    }

    #[test]
    fn run_debt_rate_surfaces_invalid_result() {
        let mut args = sample_args();
        args.initial_debt = Some(0.0);
        let request = build_debt_rate_request(&args, 0.0).expect("valid request");
        let err = run_debt_rate(&request).expect_err("zero debt");
        assert!(err.contains("invalid result"));
    }

    #[test]
    fn run_wealth_matches_core_calculator() {
        let request = build_wealth_request(&sample_args(), 50.0).expect("valid request");
        let response = run_wealth(&request).expect("valid terms");
        assert_eq!(response.outcome.months_to_repay, 52);
        assert_approx(response.years_to_repay, 52.0 / 12.0);
        assert!(response.outcome.repaid);
    }

    #[test]
    fn sweep_request_from_json_uses_default_grids() {
        let request = sweep_request_from_json(SweepKind::Salary, "{}").expect("valid request");
        assert_eq!(request.salaries.len(), 100);
        assert_eq!(request.rates.len(), 5);
        assert_approx(request.rates[4], 0.2);

        let request = sweep_request_from_json(SweepKind::Wealth, "{}").expect("valid request");
        assert_eq!(request.salaries, vec![40_000.0, 30_000.0, 20_000.0]);
        assert_eq!(request.rates.len(), 1_001);
        assert!(matches!(request.terms, SweepTerms::Wealth(_)));
    }

    #[test]
    fn sweep_request_from_json_parses_web_keys() {
        let json = r#"{
          "salaries": { "min": 30000, "max": 60000, "steps": 3 },
          "proportions": { "min": 0, "max": 100, "steps": 2, "inclusive": true },
          "debt": 20000,
          "compoundingPeriod": 12,
          "investmentReturn": 7,
          "disposableIncome": 30
        }"#;
        let request = sweep_request_from_json(SweepKind::Wealth, json).expect("json should parse");
        assert_eq!(request.salaries, vec![30_000.0, 40_000.0, 50_000.0]);
        assert_eq!(request.rates, vec![0.0, 0.5, 1.0]);
        let SweepTerms::Wealth(terms) = request.terms else {
            panic!("expected wealth terms");
        };
        assert_approx(terms.loan.initial_debt, 20_000.0);
        assert_approx(terms.yearly_return, 0.07);
        assert_approx(terms.disposable_income_fraction, 0.3);
    }

    #[test]
    fn sweep_request_rejects_oversized_grid() {
        let json = r#"{ "salaries": { "min": 0, "max": 1, "steps": 20000 } }"#;
        let err = sweep_request_from_json(SweepKind::Salary, json).expect_err("too many points");
        assert!(err.contains("--salaries"));
    }

    #[test]
    fn sweep_request_bounds_total_simulated_periods() {
        let json = r#"{
          "salaries": { "min": 0, "max": 100000, "steps": 10000, "inclusive": true },
          "rates": { "min": 0, "max": 100, "steps": 10000, "inclusive": true }
        }"#;
        let err = sweep_request_from_json(SweepKind::Salary, json).expect_err("grid too large");
        assert!(err.contains("simulated periods"));

        let json = r#"{
          "salaries": { "min": 20000, "max": 60000, "steps": 2 },
          "horizonYears": 4000000000,
          "compoundingPeriod": 365
        }"#;
        let err = sweep_request_from_json(SweepKind::Repayment, json).expect_err("horizon too long");
        assert!(err.contains("horizon_years"));
    }

    #[test]
    fn cli_parses_sweep_defaults_and_flags() {
        let cli = Cli::try_parse_from([
            "student-debt",
            "sweep-repayment",
            "--compounding-period",
            "12",
        ])
        .expect("valid cli");
        let Command::SweepRepayment {
            scenario,
            salaries,
            rates,
        } = cli.command
        else {
            panic!("expected sweep-repayment");
        };
        assert_eq!(scenario.compounding_period, Some(12));
        assert_eq!(salaries, GridSpec::exclusive(50_000.0, 80_000.0, 1));
        assert_eq!(rates, GridSpec::inclusive(0.0, 50.0, 100));
    }

    #[test]
    fn cli_parses_debt_rate_command() {
        let cli = Cli::try_parse_from([
            "student-debt",
            "debt-rate",
            "--initial-salary",
            "60000",
            "--voluntary-rate",
            "10",
        ])
        .expect("valid cli");
        let Command::DebtRate {
            scenario,
            voluntary_rate,
        } = cli.command
        else {
            panic!("expected debt-rate");
        };
        let request = build_debt_rate_request(&scenario, voluntary_rate).expect("valid request");
        let response = run_debt_rate(&request).expect("rate defined");
        assert_eq!(response.outcome.months_to_repay, 1_619);
    }

    #[test]
    fn debt_rate_response_serialization_contains_expected_fields() {
        let request = build_debt_rate_request(&sample_args(), 0.0).expect("valid request");
        let response = run_debt_rate(&request).expect("rate defined");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"effectiveAnnualRate\""));
        assert!(json.contains("\"monthsToRepay\""));
        assert!(json.contains("\"totalPaid\""));
        assert!(json.contains("\"remainingDebt\""));
        assert!(json.contains("\"yearsToRepay\""));
    }

    #[tokio::test]
    async fn get_debt_rate_returns_outcome() {
        let request = Request::builder()
            .uri("/api/debt-rate?initialSalary=200000&initialDebt=10&voluntaryRate=50")
            .body(Body::empty())
            .expect("valid request");
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["monthsToRepay"], 1);
        assert!(json["effectiveAnnualRate"].as_f64().is_some());
    }

    #[tokio::test]
    async fn post_wealth_returns_outcome() {
        let (status, json) = send(post_json(
            "/api/wealth",
            r#"{ "salary": 40000, "prepaymentProportion": 100 }"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["monthsToRepay"], 28);
        assert_eq!(json["repaid"], true);
    }

    #[tokio::test]
    async fn invalid_configuration_is_bad_request() {
        let (status, json) = send(post_json(
            "/api/debt-rate",
            r#"{ "initialSalary": 40000, "interestFloor": 50000, "interestCeiling": 50000 }"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .expect("error message")
                .contains("interest_salary_ceiling")
        );
    }

    #[tokio::test]
    async fn post_repayment_sweep_returns_matrices() {
        let (status, json) = send(post_json(
            "/api/sweep/repayment",
            r#"{ "salaries": { "min": 60000, "max": 60000, "steps": 1 },
                 "rates": { "min": 0, "max": 20, "steps": 2, "inclusive": true } }"#,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["effectiveRates"][0].as_array().map(Vec::len), Some(3));
        assert_eq!(json["totalPaid"][0].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn oversized_sweep_is_bad_request() {
        let (status, json) = send(post_json(
            "/api/sweep/wealth",
            r#"{ "salaries": { "min": 10000, "max": 90000, "steps": 10000 },
                 "proportions": { "min": 0, "max": 100, "steps": 10000, "inclusive": true } }"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .expect("error message")
                .contains("simulated periods")
        );
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .expect("valid request");
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found");
    }
}
