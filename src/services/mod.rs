pub mod analysis;
pub mod gemini;
pub mod similarity;
pub mod validation;
pub mod worker;
