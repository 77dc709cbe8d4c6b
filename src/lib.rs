//! Satellite pass prediction and Doppler tracking.
//!
//! Given a ground observer and a TTL-refreshed catalog of TLEs, decides
//! which satellites are above the horizon, predicts the current or next
//! visible pass for each, and computes Doppler-corrected downlink
//! frequencies for overhead satellites.

pub mod catalog;
pub mod config;
pub mod driver;
pub mod ephemeris;
pub mod registry;
pub mod tracker;
