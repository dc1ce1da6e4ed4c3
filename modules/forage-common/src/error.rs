use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForageError {
    /// The LLM or vision collaborator failed (timeout, transport error,
    /// non-JSON response). Always degrades to a reject verdict for the
    /// segment; the caller should retry the post rather than record a
    /// permanent reject.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
