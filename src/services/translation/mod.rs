pub mod cache;

pub use cache::TranslationCache;

use std::path::Path;

use anyhow::Result;

/// Machine-translation collaborator. Implementations wrap a translation
/// model or remote service; the pipeline batches cache misses into one call
/// per cycle.
pub trait TranslationBackend: Send {
    /// Load the translation model. Fatal on failure; the session never
    /// starts.
    fn load(&mut self, model_dir: &Path) -> Result<()>;

    /// Translate a batch of texts. The result must have the same length and
    /// order as `texts`; an empty batch returns an empty vec.
    fn translate_batch(
        &mut self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>>;
}
