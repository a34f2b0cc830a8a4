//! Geometry and motion math shared by the stimulus renderer's target engine
//!.

pub mod flow_field;
pub mod grating;
pub mod geometry;
pub mod period;
pub mod vector;

pub use geometry::DisplayGeometry;
pub use period::{measure_period, MeasuredPeriod, PeriodError, PeriodRefiner, MIN_REFRESH_HZ};
pub use vector::Vec2;
