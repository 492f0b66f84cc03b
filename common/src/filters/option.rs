use super::types::{normalize_operator, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionOperator {
    Is,
    IsAnyOf,
    IsNot,
    IsNoneOf,
}

impl OptionOperator {
    /// Unrecognised operators behave like `is_any_of`.
    pub fn parse(raw: &str) -> Self {
        Self::parse_strict(raw).unwrap_or(Self::IsAnyOf)
    }

    /// Returns `None` for operators outside the option vocabulary.
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match normalize_operator(raw).as_str() {
            "is" | "equals" | "eq" => Some(Self::Is),
            "is_any_of" | "in" => Some(Self::IsAnyOf),
            "is_not" | "not_equals" | "neq" => Some(Self::IsNot),
            "is_none_of" | "not_in" => Some(Self::IsNoneOf),
            _ => None,
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Self::IsNot | Self::IsNoneOf)
    }
}

/// Set-membership test of a field against the accepted operand strings.
///
/// An empty operand list admits every record. `Null` is never a member, so
/// it fails `is`/`is_any_of` and passes `is_not`/`is_none_of`.
pub fn evaluate_option_filter(field_value: &FieldValue, operands: &[String], operator: &str) -> bool {
    if operands.is_empty() {
        return true;
    }
    let is_member = field_value
        .as_text()
        .map(|value| operands.iter().any(|operand| *operand == value))
        .unwrap_or(false);

    if OptionOperator::parse(operator).is_negated() {
        !is_member
    } else {
        is_member
    }
}

/// Free-text match used by text columns (names, emails, titles).
///
/// `contains` is a case-insensitive substring match against any operand.
/// The option operators are also accepted and compare case-insensitively.
pub fn evaluate_text_filter(field_value: &FieldValue, operands: &[String], operator: &str) -> bool {
    if operands.is_empty() {
        return true;
    }
    let value = field_value.as_text().map(|v| v.to_lowercase());
    let normalized = normalize_operator(operator);

    match normalized.as_str() {
        "contains" => value
            .map(|v| operands.iter().any(|o| v.contains(&o.to_lowercase())))
            .unwrap_or(false),
        "does_not_contain" | "not_contains" => !value
            .map(|v| operands.iter().any(|o| v.contains(&o.to_lowercase())))
            .unwrap_or(false),
        _ => {
            let is_member = value
                .map(|v| operands.iter().any(|o| o.to_lowercase() == v))
                .unwrap_or(false);
            if OptionOperator::parse(&normalized).is_negated() {
                !is_member
            } else {
                is_member
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_operands_admit_everything() {
        for operator in ["is", "is_any_of", "is_not", "is_none_of", "bogus"] {
            assert!(evaluate_option_filter(&FieldValue::from("paid"), &[], operator));
            assert!(evaluate_option_filter(&FieldValue::Null, &[], operator));
        }
    }

    #[test]
    fn test_membership_and_negation() {
        let operands = ops(&["paid", "interested"]);
        let paid = FieldValue::from("paid");
        let withdrawn = FieldValue::from("withdrawn");

        assert!(evaluate_option_filter(&paid, &operands, "is_any_of"));
        assert!(evaluate_option_filter(&paid, &operands, "is any of"));
        assert!(!evaluate_option_filter(&withdrawn, &operands, "is_any_of"));
        assert!(!evaluate_option_filter(&paid, &operands, "is_none_of"));
        assert!(evaluate_option_filter(&withdrawn, &operands, "is none of"));
        assert!(evaluate_option_filter(&withdrawn, &operands, "is_not"));
    }

    #[test]
    fn test_negation_symmetry() {
        let operand_sets = [ops(&["a"]), ops(&["a", "b"]), ops(&["1", "true"])];
        let values = [
            FieldValue::from("a"),
            FieldValue::from("c"),
            FieldValue::Integer(1),
            FieldValue::Bool(true),
            FieldValue::Null,
        ];
        for operands in &operand_sets {
            for value in &values {
                assert_eq!(
                    evaluate_option_filter(value, operands, "is_any_of"),
                    !evaluate_option_filter(value, operands, "is_none_of"),
                    "value {:?} operands {:?}",
                    value,
                    operands
                );
            }
        }
    }

    #[test]
    fn test_unknown_operator_falls_back_to_any_of() {
        let operands = ops(&["paid"]);
        assert!(evaluate_option_filter(&FieldValue::from("paid"), &operands, "whatever"));
        assert!(!evaluate_option_filter(&FieldValue::from("lead"), &operands, "whatever"));
    }

    #[test]
    fn test_primitive_values_use_string_form() {
        assert!(evaluate_option_filter(&FieldValue::Integer(3), &ops(&["3"]), "is"));
        assert!(evaluate_option_filter(&FieldValue::Bool(false), &ops(&["false"]), "is"));
        assert!(!evaluate_option_filter(&FieldValue::Null, &ops(&["null"]), "is"));
    }

    #[test]
    fn test_text_contains_is_case_insensitive() {
        let name = FieldValue::from("Maria Gonzalez");
        assert!(evaluate_text_filter(&name, &ops(&["gonz"]), "contains"));
        assert!(evaluate_text_filter(&name, &ops(&["xyz", "MARIA"]), "contains"));
        assert!(!evaluate_text_filter(&name, &ops(&["peter"]), "contains"));
        assert!(evaluate_text_filter(&name, &ops(&["peter"]), "does not contain"));
        assert!(evaluate_text_filter(&name, &ops(&["maria gonzalez"]), "is"));
        assert!(!evaluate_text_filter(&name, &ops(&["maria gonzalez"]), "is_not"));
        assert!(!evaluate_text_filter(&FieldValue::Null, &ops(&["a"]), "contains"));
    }
}
