use std::io;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("cannot accept new client: {0}")]
    Accept(#[source] io::Error),

    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("received empty frame")]
    EmptyFrame,

    #[error("frame of {0} bytes is shorter than an ethernet header")]
    Truncated(usize),

    #[error("send aborted")]
    Aborted,

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_frame_too_large() {
        let err = NetError::FrameTooLarge { len: 1600, max: 1514 };
        assert_eq!(
            err.to_string(),
            "frame of 1600 bytes exceeds limit of 1514 bytes"
        );
    }

    #[test]
    fn error_display_unsupported() {
        let err = NetError::Unsupported("raw packet writes");
        assert_eq!(err.to_string(), "operation not supported: raw packet writes");
    }

    #[test]
    fn error_display_accept_keeps_source() {
        let io_err = io::Error::new(io::ErrorKind::Other, "listener closed");
        let err = NetError::Accept(io_err);
        assert_eq!(err.to_string(), "cannot accept new client: listener closed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "early eof");
        let err: NetError = io_err.into();
        assert!(matches!(err, NetError::Io(_)));
        assert!(err.to_string().contains("early eof"));
    }
}
