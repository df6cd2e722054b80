pub mod error;
pub mod evaluation;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod util;

pub use error::{MetricsError, MetricsResult};
