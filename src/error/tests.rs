//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing watcher binary");
        assert_eq!(err.to_string(), "configuration error: missing watcher binary");
    }

    #[test]
    fn test_spawn_error_launch() {
        let err = SpawnError::launch("/opt/rust-watcher", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to spawn '/opt/rust-watcher': permission denied"
        );
    }

    #[test]
    fn test_spawn_error_missing_pipe() {
        let err = SpawnError::MissingPipe("stdin");
        assert_eq!(err.to_string(), "watcher process has no stdin handle");
    }

    #[test]
    fn test_spawn_error_conversion() {
        let err: Error = SpawnError::MissingPipe("stdout").into();
        assert!(matches!(err, Error::Spawn(_)));
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: Error = TransportError::Closed.into();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "transport error: transport is closed");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MissingDelimiter("garbage".to_string());
        assert_eq!(err.to_string(), "invalid watcher output: garbage");

        let err = ProtocolError::UnknownKind("rename".to_string());
        assert_eq!(err.to_string(), "unknown event kind 'rename'");
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: Error = ProtocolError::InvalidId("abc".to_string()).into();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<i32> {
            Err(TransportError::Write("broken pipe".to_string()).into())
        }

        fn outer() -> Result<i32> {
            let _ = inner()?;
            Ok(0)
        }

        let result = outer();
        assert_eq!(
            result.unwrap_err().to_string(),
            "transport error: failed to write to watcher process: broken pipe"
        );
    }
}
