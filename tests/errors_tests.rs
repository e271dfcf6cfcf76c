use storestats::errors::{Result, StatsError};
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = StatsError::validation("rating out of range");

        assert!(matches!(error, StatsError::Validation(_)));
        assert!(error.to_string().contains("Validation Error"));
        assert!(error.to_string().contains("rating out of range"));
        assert!(error.is_user_facing());
    }

    #[test]
    fn test_date_errors_are_user_facing() {
        assert!(StatsError::date_parse("bad date").is_user_facing());
        assert!(StatsError::invalid_date_range("from > to").is_user_facing());
    }

    #[test]
    fn test_storage_errors_are_internal() {
        assert!(!StatsError::database_operation("deadlock").is_user_facing());
        assert!(!StatsError::database_connection("refused").is_user_facing());
        assert!(!StatsError::not_found("store 1").is_user_facing());
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(StatsError::database_config("x").code(), "E001");
        assert_eq!(StatsError::not_found("x").code(), "E006");
        assert_eq!(StatsError::date_parse("x").code(), "E008");
        assert_eq!(StatsError::invalid_date_range("x").code(), "E009");
    }
}

#[cfg(test)]
mod conversion_tests {
    use super::*;

    #[test]
    fn test_from_db_err() {
        let error: StatsError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(error, StatsError::DatabaseOperation(_)));
        assert!(error.message().contains("boom"));
    }

    #[test]
    fn test_from_chrono_parse_error() {
        let parse_err = chrono::NaiveDate::parse_from_str("nope", "%Y-%m-%d").unwrap_err();
        let error: StatsError = parse_err.into();
        assert!(matches!(error, StatsError::DateParse(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: StatsError = json_err.into();
        assert!(matches!(error, StatsError::Serialization(_)));
    }

    #[test]
    fn test_question_mark_propagation() {
        fn parse(s: &str) -> Result<chrono::NaiveDate> {
            Ok(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
        }
        assert!(parse("2026-03-01").is_ok());
        assert_eq!(parse("03/01/2026").unwrap_err().code(), "E008");
    }
}

#[cfg(test)]
mod formatting_tests {
    use super::*;

    #[test]
    fn test_error_trait() {
        let error = StatsError::not_found("product 3");
        let as_dyn: &dyn Error = &error;
        assert!(as_dyn.source().is_none());
        assert_eq!(as_dyn.to_string(), "Resource Not Found: product 3");
    }

    #[test]
    fn test_colored_format_contains_code_and_message() {
        colored::control::set_override(false);
        let formatted = StatsError::validation("bad input").format_colored();
        assert!(formatted.contains("E005"));
        assert!(formatted.contains("bad input"));
    }
}
