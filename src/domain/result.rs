//! Result type alias for Weighbridge

use super::errors::BridgeError;

/// Result type alias for Weighbridge operations
///
/// # Examples
///
/// ```
/// use weighbridge::domain::result::Result;
/// use weighbridge::domain::errors::BridgeError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BridgeError::Configuration("missing client_id".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(BridgeError::SyncInProgress);
        assert!(result.is_err());
    }
}
