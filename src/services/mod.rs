//! Services for locating, reducing and merging usage data

pub mod cache;
pub mod data_loader;
pub mod directory;
pub mod locator;
pub mod merger;
pub mod normalizer;
pub mod pricing;
pub mod reducer;
pub mod temporal;

pub use cache::StatsCacheReader;
pub use data_loader::{DataLoaderService, EngineConfig};
pub use directory::{resolve_model, ModelDirectory, ModelInfo};
pub use locator::SourceLocator;
pub use merger::StatsMerger;
pub use normalizer::{display_name, normalize_model_name};
pub use pricing::{NoPricing, PricingResolver, PricingService};
pub use reducer::UsageReducer;
