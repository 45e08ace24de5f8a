// Route handlers. Each file serves one endpoint.

pub mod batch;
pub mod check;
pub mod metrics;
pub mod topics;
