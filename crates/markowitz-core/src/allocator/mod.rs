pub mod mean_variance;
pub mod options;
mod validation;

#[cfg(feature = "frontier")]
pub mod frontier;

pub use mean_variance::{
    allocate, allocate_portfolio, frontier_coefficients, global_minimum_variance, Allocation,
    AllocationInput, AllocationOutput, AssetWeight, FrontierCoefficients,
};
pub use options::AllocatorOptions;
