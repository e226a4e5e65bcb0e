// Job posting extraction pipeline.
// chunk → index → retrieve → summarize → extract, all scoped to one `JobSession`.
// Model calls go through the `LanguageModel` trait only.

pub mod chunker;
pub mod extractor;
pub mod handlers;
pub mod index;
pub mod prompts;
pub mod retrieval;
pub mod session;
pub mod summarizer;
