pub mod calibration;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod ingress;
pub mod logging;
pub mod pipeline;
pub mod pose;
pub mod render;
pub mod rig;
pub mod tracker;
