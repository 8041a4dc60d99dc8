#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tableau error: {0}")]
    Tableau(&'static str),

    #[error("internal invariant violated: {0}")]
    Internal(&'static str),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dim { expected: usize, got: usize },
}
