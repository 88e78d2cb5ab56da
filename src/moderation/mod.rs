// Content moderation: multilingual text toxicity and image explicitness.
//
// The pipeline lives in moderator.rs. Classifiers and the translator sit
// behind traits so the local ONNX model, the Google APIs and the offline
// mocks are interchangeable.

pub mod blacklist;
pub mod classifier;
pub mod download;
pub mod moderator;
pub mod onnx;
pub mod rate_limiter;
pub mod translation;
pub mod vision;

pub use moderator::{ContentModerator, ImageModeration, TextModeration};
