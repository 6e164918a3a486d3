#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}
