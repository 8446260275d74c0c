use once_cell::sync::Lazy;
use regex::Regex;

use crate::finding::{Finding, Location, Severity};
use crate::ir::Class;
use crate::rules::{Check, CheckCategory, CheckMetadata, field_location};

const METHOD_ID: &str = "METHOD_NAMING";
const FIELD_ID: &str = "FIELD_NAMING";

static CAMEL_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("valid camel case regex"));
static UPPER_SNAKE_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$").expect("valid upper snake case regex")
});

/// Method names must be camelCase.
pub struct MethodNamingCheck;

impl Check for MethodNamingCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: METHOD_ID,
            name: "Method naming",
            description: "Method names that do not follow camelCase",
            category: CheckCategory::Style,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        if class.is_interface() {
            return Vec::new();
        }
        class
            .methods
            .iter()
            .filter(|method| !method.is_initializer() && !method.name.contains('$'))
            .filter(|method| !CAMEL_CASE.is_match(&method.name))
            .map(|method| {
                Finding::new(
                    METHOD_ID,
                    Severity::Warning,
                    format!(
                        "Method '{}' does not follow camelCase convention. {}",
                        method.name,
                        method_suggestion(&method.name)
                    ),
                    Location::member(class.dotted_name(), format!("{}()", method.name)),
                )
            })
            .collect()
    }
}

fn method_suggestion(name: &str) -> &'static str {
    if name.starts_with(|c: char| c.is_uppercase()) {
        "Method names should start with a lowercase letter."
    } else if name.contains('_') {
        "Method names should not contain underscores; use camelCase instead."
    } else {
        "Method names use camelCase, e.g. getTotal or calculateSum."
    }
}

/// Constants (`static final`) must be UPPER_SNAKE_CASE, other fields
/// camelCase.
pub struct FieldNamingCheck;

impl Check for FieldNamingCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: FIELD_ID,
            name: "Field naming",
            description: "Constants that are not UPPER_SNAKE_CASE and fields that are not camelCase",
            category: CheckCategory::Style,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        for field in &class.fields {
            if field.access.is_synthetic
                || field.name.contains('$')
                || field.name == "serialVersionUID"
            {
                continue;
            }
            let is_constant = field.access.is_static && field.access.is_final;
            let (pattern, convention) = if is_constant {
                (&*UPPER_SNAKE_CASE, "UPPER_SNAKE_CASE")
            } else {
                (&*CAMEL_CASE, "camelCase")
            };
            if pattern.is_match(&field.name) {
                continue;
            }
            let kind = if is_constant { "Constant" } else { "Field" };
            findings.push(Finding::new(
                FIELD_ID,
                Severity::Warning,
                format!(
                    "{kind} '{}' does not follow {convention} convention",
                    field.name
                ),
                field_location(class, field),
            ));
        }
        findings
    }
}
