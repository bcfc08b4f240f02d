pub mod archive;
mod chunker;
mod embedding;
mod extractor;
mod pipeline;
pub mod vector_store;
mod writer;

pub use archive::{BlobStore, GcsStorage, LocalBlobStore, SupabaseStorage, create_blob_store};
pub use chunker::TextChunker;
pub use embedding::{Embedder, OpenAiEmbedder};
pub use extractor::{
    MarkdownExtractor, PdfExtractor, TextExtractor, extract_text, extractor_for, join_pages,
};
pub use pipeline::{Pipeline, PipelineState, dry_run};
pub use vector_store::{CollectionInfo, VectorStore, create_backend};
pub use writer::VectorStoreWriter;
