mod health;
mod stats;

// Re-export public items
pub use health::ScrapeHealth;
pub use stats::{PartitionFilter, StatCollector};
