use crate::error::ConditionError;

/// Predicate over a successful describe response.
///
/// `Ok(false)` keeps polling; `Err` aborts the wait. Implemented for plain
/// closures:
///
/// ```
/// use nodevisor::{Condition, ConditionError};
///
/// let running = |state: &String| -> Result<bool, ConditionError> {
///     match state.as_str() {
///         "running" => Ok(true),
///         "pending" => Ok(false),
///         other => Err(ConditionError::new(format!("unexpected state {other}"))),
///     }
/// };
/// assert!(running.evaluate(&"running".to_string()).unwrap());
/// assert!(running.evaluate(&"terminated".to_string()).is_err());
/// ```
pub trait Condition<O>: Send + Sync {
    /// Decides whether `output` satisfies the condition.
    fn evaluate(&self, output: &O) -> Result<bool, ConditionError>;
}

impl<O, F> Condition<O> for F
where
    F: Fn(&O) -> Result<bool, ConditionError> + Send + Sync,
{
    fn evaluate(&self, output: &O) -> Result<bool, ConditionError> {
        self(output)
    }
}
