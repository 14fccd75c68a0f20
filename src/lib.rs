//! Satellite pass interpolation and antenna rotator control.
//!
//! A pass (start, peak and end waypoints) is sampled into a time-stepped
//! trajectory, which is then played to a rotator controller over a serial
//! line protocol.

pub mod config;
pub mod ephemeris;
pub mod executor;
pub mod jobs;
pub mod link;
pub mod pass;
