// Observability: metrics recording and the Prometheus recorder

pub mod metrics;

pub use metrics::{init, MetricName};
