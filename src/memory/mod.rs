pub mod planner;

pub use planner::{DeallocationSchedule, LifetimeScheduler};
