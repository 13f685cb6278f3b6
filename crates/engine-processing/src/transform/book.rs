use crate::transform::author::AuthorProcessor;
use engine_core::{cache::CacheReader, error::TransformError, processor::Processor};
use model::records::{
    document::{TargetBook, TargetGenre},
    source::BookRow,
};

/// Builds the denormalized book: the author row read with the book is
/// embedded directly, genres are resolved through the reference cache in
/// ascending genre id order.
pub struct BookProcessor {
    genres: CacheReader<TargetGenre>,
}

impl BookProcessor {
    pub fn new(genres: CacheReader<TargetGenre>) -> Self {
        BookProcessor { genres }
    }
}

impl Processor<BookRow, TargetBook> for BookProcessor {
    fn process(&self, row: BookRow) -> Result<TargetBook, TransformError> {
        let BookRow { book, author } = row;

        let genres = book
            .genre_ids
            .iter()
            .map(|id| self.genres.get(*id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TargetBook {
            id: book.id.to_string(),
            title: book.title,
            author: AuthorProcessor::to_document(author),
            genres,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::cache::ReferenceCache;
    use model::records::source::{Author, Book};

    fn sealed_cache(ids: &[i64]) -> ReferenceCache<TargetGenre> {
        let cache = ReferenceCache::new();
        let populator = cache.populator().unwrap();
        for id in ids {
            populator
                .insert(
                    *id,
                    TargetGenre {
                        id: id.to_string(),
                        name: format!("G{id}"),
                    },
                )
                .unwrap();
        }
        cache.seal();
        cache
    }

    fn row(genres: &[i64]) -> BookRow {
        BookRow {
            book: Book {
                id: 1,
                title: "B1".into(),
                author_id: 1,
                genre_ids: genres.iter().copied().collect(),
            },
            author: Author {
                id: 1,
                full_name: "A1".into(),
            },
        }
    }

    #[test]
    fn embeds_author_and_genres_in_id_order() {
        let processor = BookProcessor::new(sealed_cache(&[1, 2]).reader().unwrap());

        let book = processor.process(row(&[2, 1])).unwrap();

        assert_eq!(book.author.full_name, "A1");
        let names: Vec<_> = book.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["G1", "G2"]);
    }

    #[test]
    fn missing_genre_is_an_error_not_an_omission() {
        let processor = BookProcessor::new(sealed_cache(&[1]).reader().unwrap());

        let err = processor.process(row(&[1, 9])).unwrap_err();
        assert_eq!(err, TransformError::MissingKey { key: 9 });
    }

    #[test]
    fn book_without_genres_has_empty_list() {
        let processor = BookProcessor::new(sealed_cache(&[]).reader().unwrap());
        assert!(processor.process(row(&[])).unwrap().genres.is_empty());
    }
}
