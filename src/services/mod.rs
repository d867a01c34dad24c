pub mod capture;
pub mod diff;
pub mod merge;
pub mod ocr;
pub mod style;
pub mod translation;

// Re-export commonly used services
pub use capture::{CaptureBackend, CaptureFactory};
pub use diff::ChangeDetector;
pub use merge::merge_paragraph_lines;
pub use ocr::OcrBackend;
pub use style::StyleSampler;
pub use translation::{TranslationBackend, TranslationCache};
