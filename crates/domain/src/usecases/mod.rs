//! Application use cases / business logic

pub mod generate;
pub mod publish;
pub mod retry;

pub use generate::{GenerateConfig, GenerateError, GenerateThread};
pub use publish::{PublishConfig, PublishFailure, PublishReport, PublishThread};
pub use retry::RetryPolicy;
