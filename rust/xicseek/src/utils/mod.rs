pub mod correlation;
pub mod rolling_calculators;
