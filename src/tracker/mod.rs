mod error;
mod pass;
mod time_table;
mod tracker;

pub use error::TrackError;
pub use pass::PassReport;
pub use time_table::{TimeTable, TimeTableSample};
pub use tracker::{Tracker, DEFAULT_GRANULARITY, DOPPLER_C_M_S};
