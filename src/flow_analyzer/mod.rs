pub mod congestion;

pub use congestion::{classify, CongestionLevel, CongestionTracker};
