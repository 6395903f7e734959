/// Result of a domain client call, before response validation.
///
/// `Failure` holds a message that is already safe to show to the caller.
/// Unexpected failures never land here; they travel as `Err(GatewayError)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(String),
}

impl<T> Envelope<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Apply `f` to the success payload, leaving a failure untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(value) => Envelope::Success(f(value)),
            Self::Failure(message) => Envelope::Failure(message),
        }
    }

    /// Like [`Envelope::map`] for fallible steps such as response validation.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Envelope<U>, E> {
        match self {
            Self::Success(value) => f(value).map(Envelope::Success),
            Self::Failure(message) => Ok(Envelope::Failure(message)),
        }
    }
}
