//! Scaler, classifier, evaluation and persisted model pairs

pub mod artifact;
pub mod evaluation;
pub mod forest;
pub mod scaler;

pub use artifact::{load_pair, save_pair, ModelArtifact};
pub use evaluation::{ClassMetrics, ClassificationReport};
pub use forest::{ClassProbabilities, DirectionForest, ForestParams};
pub use scaler::StandardScaler;
