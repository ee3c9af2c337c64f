/*!
Tests for error types and callback error wrapping.
*/

#[cfg(test)]
mod tests {
    use crate::error::{Direction, PrefsError};
    use std::error::Error;
    use std::io;

    #[test]
    fn test_prefs_error_display() {
        let error = PrefsError::validation("max_depth must be at least 1");
        assert_eq!(error.to_string(), "Validation error: max_depth must be at least 1");

        let error = PrefsError::compression("bad header");
        assert_eq!(error.to_string(), "Compression error: bad header");

        let error = PrefsError::storage("disk full");
        assert_eq!(error.to_string(), "Storage error: disk full");

        let error = PrefsError::UnknownClass("person".to_string());
        assert_eq!(error.to_string(), "Unknown class \"person\"");
    }

    #[test]
    fn test_prefs_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let prefs_error = PrefsError::from(io_error);

        match prefs_error {
            PrefsError::Io(ref e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_prefs_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let prefs_error = PrefsError::from(json_error);

        match prefs_error {
            PrefsError::Json(_) => {}
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_malformed_value_mentions_property_and_value() {
        let error = PrefsError::MalformedValue {
            property: "alive".to_string(),
            value: "yes".to_string(),
            expected: "bool",
        };

        let text = error.to_string();
        assert!(text.contains("alive"));
        assert!(text.contains("yes"));
        assert!(text.contains("bool"));
    }

    #[test]
    fn test_missing_callback_names_direction() {
        let error = PrefsError::MissingCallback {
            class: "logger".to_string(),
            direction: Direction::Restore,
        };
        assert!(error.to_string().contains("logger"));
        assert!(error.to_string().contains(&Direction::Restore.to_string()));
    }

    #[test]
    fn test_callback_failed_keeps_source() {
        let error = PrefsError::callback_failed("person", PrefsError::NotFound("age".to_string()));

        match &error {
            PrefsError::CallbackFailed { class, source } => {
                assert_eq!(class, "person");
                assert!(matches!(**source, PrefsError::NotFound(ref p) if p == "age"));
            }
            _ => panic!("Expected CallbackFailed"),
        }
        assert!(error.source().unwrap().to_string().contains("age"));
    }

    #[test]
    fn test_nested_callback_failure_propagates_verbatim() {
        let inner = PrefsError::callback_failed("person", PrefsError::custom("boom"));
        let outer = PrefsError::callback_failed("people", inner);

        match outer {
            PrefsError::CallbackFailed { class, .. } => assert_eq!(class, "person"),
            _ => panic!("Expected CallbackFailed"),
        }
    }

    #[test]
    fn test_depth_exceeded_is_not_wrapped() {
        let error = PrefsError::callback_failed("people", PrefsError::DepthExceeded { limit: 64 });
        assert!(matches!(error, PrefsError::DepthExceeded { limit: 64 }));
    }

    #[test]
    fn test_unnamed_missing_callback_gets_class() {
        let error = PrefsError::callback_failed(
            "logger",
            PrefsError::MissingCallback {
                class: String::new(),
                direction: Direction::Snapshot,
            },
        );

        match error {
            PrefsError::MissingCallback { class, direction } => {
                assert_eq!(class, "logger");
                assert_eq!(direction, Direction::Snapshot);
            }
            _ => panic!("Expected MissingCallback"),
        }
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<PrefsError>();
        assert_sync::<PrefsError>();
    }

    #[test]
    fn test_error_result_type() {
        fn returns_error() -> crate::Result<()> {
            Err(PrefsError::custom("test error"))
        }

        let result = returns_error();
        assert_eq!(result.unwrap_err().to_string(), "test error");
    }
}
