use engine_core::{cache::CachePopulator, error::TransformError, processor::Processor};
use model::records::{document::TargetGenre, source::Genre};

/// Transforms genres and records each one in the reference cache for the
/// book step.
pub struct GenreProcessor {
    cache: CachePopulator<TargetGenre>,
}

impl GenreProcessor {
    pub fn new(cache: CachePopulator<TargetGenre>) -> Self {
        GenreProcessor { cache }
    }
}

impl Processor<Genre, TargetGenre> for GenreProcessor {
    fn process(&self, row: Genre) -> Result<TargetGenre, TransformError> {
        let key = row.id;
        let doc = TargetGenre {
            id: row.id.to_string(),
            name: row.name,
        };
        self.cache.insert(key, doc.clone())?;
        Ok(doc)
    }
}
