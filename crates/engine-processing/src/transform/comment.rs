use engine_core::{error::TransformError, processor::Processor};
use model::records::{document::TargetComment, source::Comment};

pub struct CommentProcessor;

impl Processor<Comment, TargetComment> for CommentProcessor {
    fn process(&self, row: Comment) -> Result<TargetComment, TransformError> {
        Ok(TargetComment {
            id: row.id.to_string(),
            text: row.text,
            book_id: row.book_id.to_string(),
        })
    }
}
