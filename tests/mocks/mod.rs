pub mod catalog;
pub mod extractor;
