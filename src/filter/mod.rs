pub mod adaptive;
pub mod classifier;

pub use adaptive::{AdaptiveFilterFetcher, FilterRequest, FilterResult, FilterWarning};
pub use classifier::{DebugLineClassifier, LineClassifier};
