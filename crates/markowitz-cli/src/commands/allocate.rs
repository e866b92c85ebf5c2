use clap::Args;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use markowitz_core::allocator::frontier::{self, FrontierInput};
use markowitz_core::allocator::mean_variance::{self, AllocationInput};

use crate::input;

#[derive(Args)]
pub struct AllocateArgs {
    /// Path to a JSON or YAML allocation document
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct FrontierArgs {
    /// Path to a JSON or YAML frontier document
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of frontier points in the document
    #[arg(long)]
    pub points: Option<u32>,
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let alloc_input: AllocationInput = load(args.input.as_deref(), "allocation")?;
    info!(
        assets = alloc_input.expected_returns.len(),
        target = %alloc_input.target_return,
        "running allocation"
    );
    let result = mean_variance::allocate_portfolio(&alloc_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut fr_input: FrontierInput = load(args.input.as_deref(), "frontier tracing")?;
    if args.points.is_some() {
        fr_input.points = args.points;
    }
    info!(
        assets = fr_input.expected_returns.len(),
        points = ?fr_input.points,
        "tracing frontier"
    );
    let result = frontier::trace_frontier(&fr_input)?;
    Ok(serde_json::to_value(result)?)
}

fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_document(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json|file.yaml> or stdin required for {}", what).into())
    }
}
