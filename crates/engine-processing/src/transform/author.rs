use engine_core::{error::TransformError, processor::Processor};
use model::records::{document::TargetAuthor, source::Author};

pub struct AuthorProcessor;

impl AuthorProcessor {
    pub fn to_document(author: Author) -> TargetAuthor {
        TargetAuthor {
            id: author.id.to_string(),
            full_name: author.full_name,
        }
    }
}

impl Processor<Author, TargetAuthor> for AuthorProcessor {
    fn process(&self, row: Author) -> Result<TargetAuthor, TransformError> {
        Ok(Self::to_document(row))
    }
}
