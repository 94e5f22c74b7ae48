pub mod calibration;
pub mod config;
pub mod pose;
pub mod replay;
pub mod tracker;
