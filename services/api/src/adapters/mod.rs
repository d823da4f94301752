pub mod case_llm;
pub mod db;
pub mod embeddings;

pub use case_llm::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use embeddings::OpenAiEmbeddingAdapter;
