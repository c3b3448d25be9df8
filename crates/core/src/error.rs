use thiserror::Error;

use crate::model::{QuestionError, SessionError, TaxonomyError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}
