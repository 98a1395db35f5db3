//! API handlers grouped by resource

pub mod collateral;
pub mod work_packages;
