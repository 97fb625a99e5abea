//! Sampling planner.
//!
//! Groups estimators to match the source dataset's row chunking and draws
//! each estimator's row sample and optional feature subset.

pub mod features;
pub mod planner;
pub mod rng;

pub use features::{FeatureIndexChunk, FeatureIndexSet};
pub use planner::{
    assign_groups, sample_estimator, EstimatorGroup, EstimatorSample, SamplePlan,
    SamplingPlanner,
};
pub use rng::{estimator_rng, estimator_seed, splitmix64};
