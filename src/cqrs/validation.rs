//! Declarative + programmatic validation pipeline stage.
//!
//! Grounded in the teacher's `validation/mod.rs` convention of centralized
//! field-level error constants and explicit char/length checks, generalized
//! from gRPC-input validation to arbitrary command/query validation.

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), code: code.into(), message: message.into() }
    }
}

/// Monotonic validation outcome: errors are only ever added, `combine`
/// concatenates two results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn single(error: FieldError) -> Self {
        Self { errors: vec![error] }
    }

    pub fn with_error(mut self, error: FieldError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn combine(mut self, other: ValidationResult) -> ValidationResult {
        self.errors.extend(other.errors);
        self
    }
}

/// A single validation rule over a concrete message type `C`.
pub trait Validator<C>: Send + Sync {
    fn validate(&self, message: &C) -> ValidationResult;
}

/// Runs every registered rule against a message and combines the results.
/// Declarative rules and a programmatic closure-based rule are both plain
/// `Validator<C>` implementations, composed here rather than distinguished
/// by kind.
pub struct ValidationProcessor<C> {
    rules: Vec<Box<dyn Validator<C>>>,
}

impl<C> ValidationProcessor<C> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: Box<dyn Validator<C>>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, message: &C) -> ValidationResult {
        self.rules
            .iter()
            .map(|rule| rule.validate(message))
            .fold(ValidationResult::ok(), ValidationResult::combine)
    }
}

impl<C> Default for ValidationProcessor<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a plain closure into a `Validator<C>`, for ad hoc programmatic
/// rules registered alongside declarative ones.
pub struct FnValidator<C, F>
where
    F: Fn(&C) -> ValidationResult + Send + Sync,
{
    f: F,
    _marker: std::marker::PhantomData<fn(&C)>,
}

impl<C, F> FnValidator<C, F>
where
    F: Fn(&C) -> ValidationResult + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f, _marker: std::marker::PhantomData }
    }
}

impl<C, F> Validator<C> for FnValidator<C, F>
where
    F: Fn(&C) -> ValidationResult + Send + Sync,
{
    fn validate(&self, message: &C) -> ValidationResult {
        (self.f)(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OpenAccount {
        customer_id: String,
        initial_deposit: f64,
    }

    #[test]
    fn combine_concatenates_errors() {
        let a = ValidationResult::single(FieldError::new("customerId", "required", "must not be empty"));
        let b = ValidationResult::single(FieldError::new("initialDeposit", "range", "must be >= 0"));
        let combined = a.combine(b);
        assert!(!combined.valid());
        assert_eq!(combined.errors().len(), 2);
    }

    #[test]
    fn processor_runs_all_rules_and_reports_every_error() {
        let processor = ValidationProcessor::<OpenAccount>::new()
            .with_rule(Box::new(FnValidator::new(|cmd: &OpenAccount| {
                if cmd.customer_id.is_empty() {
                    ValidationResult::single(FieldError::new("customerId", "required", "must not be empty"))
                } else {
                    ValidationResult::ok()
                }
            })))
            .with_rule(Box::new(FnValidator::new(|cmd: &OpenAccount| {
                if cmd.initial_deposit < 0.0 {
                    ValidationResult::single(FieldError::new("initialDeposit", "range", "must be >= 0"))
                } else {
                    ValidationResult::ok()
                }
            })));

        let result = processor.validate(&OpenAccount { customer_id: String::new(), initial_deposit: -1.0 });
        assert!(!result.valid());
        let fields: Vec<_> = result.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["customerId", "initialDeposit"]);
    }

    #[test]
    fn valid_message_produces_no_errors() {
        let processor = ValidationProcessor::<OpenAccount>::new().with_rule(Box::new(FnValidator::new(
            |cmd: &OpenAccount| {
                if cmd.customer_id.is_empty() {
                    ValidationResult::single(FieldError::new("customerId", "required", "must not be empty"))
                } else {
                    ValidationResult::ok()
                }
            },
        )));
        let result = processor.validate(&OpenAccount { customer_id: "CUST-1".into(), initial_deposit: 10.0 });
        assert!(result.valid());
    }
}
