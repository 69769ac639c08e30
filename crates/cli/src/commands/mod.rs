//! Subcommand implementations

pub mod predict;
pub mod resolve;
pub mod service;

use clap::Args;
use predictor_lib::PredictionRequest;

/// Case fields shared by `predict` and `resolve`
#[derive(Args, Debug, Clone)]
pub struct CaseArgs {
    /// Case type (e.g. "Family Law", "Criminal")
    #[arg(long)]
    pub case_type: String,

    /// Case complexity (Low, Medium, High)
    #[arg(long)]
    pub complexity: String,

    /// Client age in years
    #[arg(long)]
    pub client_age: f64,

    /// Client income level (Low, Medium, High)
    #[arg(long = "income-level")]
    pub client_income_level: String,

    /// Days the case has been open
    #[arg(long)]
    pub days_open: f64,

    /// Case has been escalated
    #[arg(long)]
    pub escalated: bool,
}

impl From<CaseArgs> for PredictionRequest {
    fn from(args: CaseArgs) -> Self {
        Self {
            case_type: args.case_type,
            complexity: args.complexity,
            client_age: args.client_age,
            client_income_level: args.client_income_level,
            days_open: args.days_open,
            escalated: args.escalated,
        }
    }
}
