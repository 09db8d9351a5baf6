pub mod inference;

pub use inference::{InferenceClient, TextGenerator};
