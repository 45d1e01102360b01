//! Trait seams: storage, page fetching, learners, and vision.

pub mod fetcher;
pub mod learner;
pub mod store;
pub mod vision;

pub use fetcher::PageFetcher;
pub use learner::{LearnedCandidate, Learner};
pub use store::StrategyStore;
pub use vision::{ProductRegion, VisionModel};
