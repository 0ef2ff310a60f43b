use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn capacity_exceeded(requested: usize, limit: usize) -> Error {
        Error(ErrorKind::CapacityExceeded { requested, limit }.into())
    }

    pub fn corrupt_data(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::CorruptData {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn serialize<E>(codec: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::Serialize {
                codec: codec.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn deserialize<E>(codec: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::Deserialize {
                codec: codec.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` for the `CapacityExceeded` condition, after which the
    /// buffer that raised it must be discarded.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self.kind(), ErrorKind::CapacityExceeded { .. })
    }

    pub fn is_corrupt_data(&self) -> bool {
        matches!(self.kind(), ErrorKind::CorruptData { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("buffer capacity exceeded: requested {requested} elements, limit is {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    #[error("corrupt data in '{element}': {message}")]
    CorruptData { element: String, message: String },

    #[error("{codec} serialization failed: {source}")]
    Serialize {
        codec: String,
        source: StdErrorBoxed,
    },

    #[error("{codec} deserialization failed: {source}")]
    Deserialize {
        codec: String,
        source: StdErrorBoxed,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

/// Recovers an `Error` that travelled through an `std::io::Write`/`Read`
/// adapter; any other io error is wrapped as `Io`.
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::io("", e);
        }
        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(err)) => *err,
            Some(Err(other)) => Error::io("", std::io::Error::new(kind, other)),
            None => Error::io("", kind.into()),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e.into_kind() {
            ErrorKind::Io { source, .. } => source,
            kind => std::io::Error::other(Error::from(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let e = Error::capacity_exceeded(10, 5);
        assert!(e.is_capacity_exceeded());
        assert!(!e.is_corrupt_data());
        assert!(e.to_string().contains("requested 10"));

        let e = Error::corrupt_data("pickle header", "too short");
        assert!(e.is_corrupt_data());
        assert_eq!(
            e.to_string(),
            "corrupt data in 'pickle header': too short"
        );
    }

    #[test]
    fn test_io_round_trip() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let e: Error = io_err.into();
        let back: std::io::Error = e.into();
        assert_eq!(back.kind(), std::io::ErrorKind::UnexpectedEof);

        let back: std::io::Error = Error::capacity_exceeded(10, 5).into();
        assert_eq!(back.kind(), std::io::ErrorKind::Other);
        assert!(back.to_string().contains("limit is 5"));
        let again: Error = back.into();
        assert!(again.is_capacity_exceeded());
    }

    #[test]
    fn test_codec_errors_keep_source() {
        let source = std::io::Error::other("boom");
        let e = Error::deserialize("json", source);
        match e.kind() {
            ErrorKind::Deserialize { codec, source } => {
                assert_eq!(codec, "json");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
