//! Hand-gesture trajectory recognition: palm-center trails per hand, shape
//! and pose classifiers with cooldown, and a debug overlay surface.

pub mod actions;
pub mod config;
pub mod debug;
pub mod error;
pub mod gestures;
pub mod landmarks;
pub mod pipeline;
pub mod session;
pub mod trail;

pub use error::ConfigError;
pub use gestures::{Classifier, Gesture, GestureResult, Thresholds};
pub use landmarks::{HandDetection, HandSide, Keypoint, PalmCenter};
pub use session::{GestureEvent, Recognizer, RecognizerSettings};
