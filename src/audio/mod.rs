pub mod backend;
pub mod synthetic;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame};
pub use synthetic::SyntheticBackend;
