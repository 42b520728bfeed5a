//! Bulk Ingestion Pipeline: validates an uploaded JSON document, normalizes each object into
//! an [`Action`](respond_types::Action), and upserts in fixed-size batches.

mod error;
mod normalize;
mod pipeline;

pub use error::{IngestError, NormalizeError};
pub use normalize::{has_codeid, normalize_record, parse_upload};
pub use pipeline::{IngestPipeline, BATCH_SIZE, MAX_FILE_SIZE};
