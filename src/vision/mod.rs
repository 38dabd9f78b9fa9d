pub mod openai;
pub mod provider;

pub use openai::OpenAiVisionProvider;
pub use provider::VisionProvider;
