// Fusion - combines the scraped and vision halves of a run into one draft

pub mod draft_merger;

pub use draft_merger::merge;
