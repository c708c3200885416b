//! Service layer for post ingestion.
//!
//! - Media download (`MediaStore`)
//! - Image text extraction (`Ocr`, `TesseractOcr`)
//! - Body normalization (`ContentNormalizer`)
//! - Tag enrichment (`Enricher`, `EnrichmentResolver`)

mod enrichment;
mod media;
mod normalizer;
mod ocr;

pub use enrichment::{
    ChatTagger, DEFAULT_ANSWER, DEFAULT_TAG, Enricher, EnrichmentResolver, PlaceholderEnricher,
    parse_tags,
};
pub use media::MediaStore;
pub use normalizer::{BodyLayout, BodyNode, ContentNormalizer, plan_body};
pub use ocr::{Ocr, TesseractOcr, binarize, otsu_level};
