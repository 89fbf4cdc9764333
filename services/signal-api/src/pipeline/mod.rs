//! Raw candles -> feature rows -> labelled training matrices

pub mod dataset;
pub mod features;
pub mod labels;

pub use dataset::{prepare_training_data, TrainingSet};
pub use features::{
    add_technical_features, feature_names, latest_feature_vector, FeatureRow, FEATURE_COLUMNS,
    N_FEATURES,
};
pub use labels::{create_direction_labels, LabelledRow, LABEL_DOWN, LABEL_UP};
