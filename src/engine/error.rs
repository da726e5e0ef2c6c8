use uuid::Uuid;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Uuid),
    /// Which uniqueness rule was violated ("email", "username", "room").
    Duplicate(&'static str),
    /// Zero or negative proposed duration.
    InvalidInterval,
    /// Every active meeting overlapping the proposed slot, not just the first.
    Conflict(Vec<Uuid>),
    LimitExceeded(&'static str),
    /// Store I/O failure. The mutation did not commit.
    Persistence(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Duplicate(what) => write!(f, "duplicate {what}"),
            EngineError::InvalidInterval => write!(f, "start time must be before end time"),
            EngineError::Conflict(ids) => {
                write!(f, "conflicts with meeting(s): ")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Persistence(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
