/// A bounded batch of transformed rows handed to a writer as one unit.
#[derive(Debug, Clone)]
pub struct Chunk<T> {
    pub rows: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Chunk {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: T) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
