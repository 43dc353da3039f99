pub mod aggregator;
pub mod exif;
pub mod image_loader;
pub mod inference;
pub mod orchestrator;
pub mod scanner;
pub mod translation;
pub mod vocabulary;
