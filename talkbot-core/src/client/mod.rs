pub mod factory;
pub mod mime;
pub mod ollama;
pub mod openai;
pub mod traits;
pub mod types;


pub use factory::{ClientFactory, UnifiedClient};
pub use traits::*;
pub use types::*;
