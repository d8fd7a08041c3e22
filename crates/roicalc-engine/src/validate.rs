//! Input validation run before a calculation.

use crate::error::ValidationError;
use crate::model::{AssumptionField, InputField, RoiAssumptions, RoiInputs};

/// Upper bounds for percentage inputs, with the name used in range messages.
const PERCENT_RANGES: [(InputField, &str, f64); 3] = [
    (InputField::PctTicketsMigrated, "% tickets migrated", 100.0),
    (
        InputField::OnboardingEfficiencyGainPct,
        "Accelerated developer onboarding gain",
        90.0,
    ),
    (InputField::EfficiencyGainPct, "Efficiency gain", 100.0),
];

fn non_negative(value: f64, label: &str, messages: &mut Vec<String>) {
    if !value.is_finite() {
        messages.push(format!("{label} must be a number."));
    } else if value < 0.0 {
        messages.push(format!("{label} must be ≥ 0."));
    }
}

/// Messages for every invalid input, in field order.
pub fn validate_inputs(inputs: &RoiInputs) -> Vec<String> {
    let mut messages = Vec::new();
    for field in InputField::ALL {
        let value = inputs.get(field);
        non_negative(value, field.label(), &mut messages);
        if let Some((_, name, max)) = PERCENT_RANGES.iter().find(|(f, _, _)| *f == field) {
            if value.is_finite() && !(0.0..=*max).contains(&value) {
                messages.push(format!("{name} must be between 0 and {max}."));
            }
        }
    }
    messages
}

pub fn validate_assumptions(assumptions: &RoiAssumptions) -> Vec<String> {
    let mut messages = Vec::new();
    for field in AssumptionField::ALL {
        non_negative(assumptions.get(field), field.label(), &mut messages);
    }
    messages
}

/// Validate inputs and assumptions together.
pub fn validate(inputs: &RoiInputs, assumptions: &RoiAssumptions) -> Result<(), ValidationError> {
    let mut messages = validate_inputs(inputs);
    messages.extend(validate_assumptions(assumptions));
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(messages))
    }
}
