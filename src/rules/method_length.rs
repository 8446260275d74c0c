use crate::config::Thresholds;
use crate::finding::{Finding, Location, Severity};
use crate::ir::Class;
use crate::rules::{Check, CheckCategory, CheckMetadata};

const ID: &str = "METHOD_LENGTH";

/// Instruction-count ceilings per method.
pub struct MethodLengthCheck {
    warning: usize,
    error: usize,
}

impl MethodLengthCheck {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            warning: thresholds.method_length_warning() as usize,
            error: thresholds.method_length_error() as usize,
        }
    }
}

impl Check for MethodLengthCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Method length",
            description: "Methods whose bytecode exceeds the configured instruction counts",
            category: CheckCategory::Style,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        for method in class.methods.iter().filter(|method| !method.is_initializer()) {
            let count = method.instructions.len();
            let (severity, limit) = if count > self.error {
                (Severity::Error, self.error)
            } else if count > self.warning {
                (Severity::Warning, self.warning)
            } else {
                continue;
            };
            findings.push(Finding::new(
                ID,
                severity,
                format!("Method has {count} instructions, exceeding the {severity} threshold of {limit}"),
                Location::member(class.dotted_name(), format!("{}()", method.name)),
            ));
        }
        findings
    }
}
