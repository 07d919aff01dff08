pub mod chat_completion;
pub mod chroma;
pub mod dataset;
pub mod moderation;
pub mod recommendation;
pub mod retrieval;
pub mod summaries;

// Re-export public types
pub use chat_completion::{ChatModel, OpenAiChatClient};
pub use chroma::{ChromaCollection, VectorStore};
pub use moderation::ProfanityFilter;
pub use recommendation::{RecommendationOptions, RecommendationService};
pub use retrieval::Retriever;
pub use summaries::SummaryIndex;
