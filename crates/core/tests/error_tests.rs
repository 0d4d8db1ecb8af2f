// ═══════════════════════════════════════════════════════════════════
// Error Tests — Display messages and From conversions
// ═══════════════════════════════════════════════════════════════════

use valuta_hub_core::errors::CoreError;

// ═══════════════════════════════════════════════════════════════════
// Display
// ═══════════════════════════════════════════════════════════════════

mod display {
    use super::*;

    #[test]
    fn api_error_names_provider() {
        let e = CoreError::Api {
            provider: "CoinGecko".into(),
            message: "HTTP 500".into(),
        };
        assert_eq!(e.to_string(), "API request failed (CoinGecko): HTTP 500");
    }

    #[test]
    fn rate_unavailable_names_both_codes() {
        let e = CoreError::RateUnavailable {
            from: "BTC".into(),
            to: "EUR".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("BTC"));
        assert!(msg.contains("EUR"));
        assert!(msg.contains("unavailable"));
    }

    #[test]
    fn insufficient_funds_shows_amounts() {
        let e = CoreError::InsufficientFunds {
            available: 10.5,
            required: 20.0,
            code: "USD".into(),
        };
        assert_eq!(
            e.to_string(),
            "Insufficient funds: available 10.5 USD, required 20 USD"
        );
    }

    #[test]
    fn currency_not_found() {
        let e = CoreError::CurrencyNotFound("XYZ".into());
        assert_eq!(e.to_string(), "Unknown currency 'XYZ'");
    }

    #[test]
    fn user_errors() {
        assert_eq!(
            CoreError::UsernameTaken("alice".into()).to_string(),
            "Username 'alice' is already taken"
        );
        assert_eq!(
            CoreError::UserNotFound("bob".into()).to_string(),
            "User 'bob' not found"
        );
        assert_eq!(CoreError::InvalidPassword.to_string(), "Invalid password");
        assert!(CoreError::NotLoggedIn.to_string().contains("login"));
    }

    #[test]
    fn config_and_validation() {
        assert_eq!(
            CoreError::Config("bad".into()).to_string(),
            "Configuration error: bad"
        );
        assert_eq!(
            CoreError::ValidationError("nope".into()).to_string(),
            "Validation failed: nope"
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// From conversions
// ═══════════════════════════════════════════════════════════════════

mod conversions {
    use super::*;

    #[test]
    fn io_error_becomes_file_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: CoreError = io.into();
        match e {
            CoreError::FileIO(msg) => assert!(msg.contains("denied")),
            other => panic!("Expected FileIO, got: {other:?}"),
        }
    }

    #[test]
    fn serde_json_error_becomes_deserialization() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: CoreError = err.into();
        assert!(matches!(e, CoreError::Deserialization(_)));
    }

    #[test]
    fn toml_error_becomes_config() {
        let err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let e: CoreError = err.into();
        match e {
            CoreError::Config(msg) => assert!(msg.starts_with("Invalid config file")),
            other => panic!("Expected Config, got: {other:?}"),
        }
    }

    #[test]
    fn question_mark_propagates() {
        fn read() -> Result<String, CoreError> {
            Ok(std::fs::read_to_string("/definitely/not/here/valuta.json")?)
        }
        assert!(matches!(read(), Err(CoreError::FileIO(_))));
    }
}
