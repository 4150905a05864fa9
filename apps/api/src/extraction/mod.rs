//! Résumé ingestion: document text extraction, the skill lexicon, and
//! structured profile extraction.

pub mod entities;
pub mod handlers;
pub mod lexicon;
pub mod skills;
pub mod text;
