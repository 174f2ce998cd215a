//! Tree ensemble used as the forecast regressor.

pub mod forest;
pub mod tree;

pub use forest::{FeatureRow, RandomForest};
pub use tree::{RegressionTree, TreeParams};
