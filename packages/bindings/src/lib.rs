use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use markowitz_core::allocator::frontier::{self, FrontierInput};
use markowitz_core::allocator::mean_variance::{self, AllocationInput};
use markowitz_core::MarkowitzResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse a JSON document, run a computation, serialise its output.
fn run_json<I, O, F>(input_json: &str, compute: F) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(&I) -> MarkowitzResult<O>,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = compute(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Minimum-variance weights for a target return.
#[napi]
pub fn allocate(input_json: String) -> NapiResult<String> {
    run_json::<AllocationInput, _, _>(&input_json, mean_variance::allocate_portfolio)
}

/// Minimum-variance frontier over a grid of target returns.
#[napi]
pub fn trace_frontier(input_json: String) -> NapiResult<String> {
    run_json::<FrontierInput, _, _>(&input_json, frontier::trace_frontier)
}
