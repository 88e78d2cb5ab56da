// DeepShield: content-trust backend
//
// This is the library root. Detectors analyze media and text, results are
// stored, and affected users are notified over mail, SMS and a live stream.

pub mod config;
pub mod db;
pub mod detectors;
pub mod moderation;
pub mod notify;
pub mod output;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
