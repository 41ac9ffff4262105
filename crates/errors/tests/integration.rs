//! Integration tests for error types

#[cfg(test)]
mod tests {
    use pkbridge_errors::*;

    #[test]
    fn test_error_conversion() {
        let err: Error = TransactionError::NoActiveTransaction.into();
        assert!(matches!(err, Error::Transaction(_)));
    }

    #[test]
    fn test_engine_message_with_prefix() {
        let err = TransactionError::engine(
            EngineErrorCode::UnsatisfiedDeps,
            Some("foo>=2 <- bar".into()),
            "could not satisfy dependencies",
        );
        assert_eq!(
            err.to_string(),
            "foo>=2 <- bar: could not satisfy dependencies"
        );
        assert_eq!(err.kind(), ErrorKind::UnsatisfiedDependencies);
    }

    #[test]
    fn test_engine_message_without_prefix() {
        let err = TransactionError::engine(EngineErrorCode::DiskSpace, None, "not enough free disk space");
        assert_eq!(err.to_string(), "not enough free disk space");
        assert_eq!(err.kind(), ErrorKind::EngineError);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            EngineErrorCode::DeltaInvalid.kind(),
            ErrorKind::InvalidPackageOrDelta
        );
        assert_eq!(
            EngineErrorCode::PackageInvalidArch.kind(),
            ErrorKind::InvalidArchitecture
        );
        let config: Error = ConfigError::Invalid {
            message: "bad".into(),
        }
        .into();
        assert_eq!(config.kind(), ErrorKind::ConfigInvalid);
        let held: Error = TransactionError::PackageHeld {
            package: "glibc".into(),
        }
        .into();
        assert_eq!(held.kind(), ErrorKind::PackageHeld);
        assert_eq!(held.to_string(), "glibc: could not remove held package");
    }

    #[test]
    fn test_user_facing_codes() {
        let err: Error = TransactionError::engine(EngineErrorCode::FileConflicts, None, "conflicting files").into();
        assert_eq!(err.user_code(), Some("transaction.file_conflicts"));
        assert!(err.user_hint().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
        assert!(err.is_retryable());
    }
}
