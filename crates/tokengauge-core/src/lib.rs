// Domain modules
pub mod error;
pub mod metrics;
pub mod prompts;
pub mod service;

pub use error::{BenchError, Result};
pub use metrics::{BenchmarkMetrics, LiveMetrics, MetricsSnapshot, SessionReport, SessionSummary};
pub use prompts::{PromptJob, PromptSet};
pub use service::{ServiceDescriptor, ServiceKind};
