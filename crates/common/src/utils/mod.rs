pub mod backoff;
pub mod deadline;
pub mod logging;
