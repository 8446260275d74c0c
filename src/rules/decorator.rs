use crate::descriptor;
use crate::finding::{Confidence, Finding, Severity};
use crate::ir::Class;
use crate::registry::ClassRegistry;
use crate::rules::adapter::delegation_count;
use crate::rules::{Check, CheckCategory, CheckMetadata, class_location};

const ID: &str = "DECORATOR_PATTERN";

/// Detects classes that wrap and delegate to a field of their own supertype.
pub struct DecoratorCheck;

impl Check for DecoratorCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Decorator pattern",
            description: "Classes that wrap and delegate to a field of their own supertype",
            category: CheckCategory::Pattern,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        detect(class, None)
    }

    fn check_with_context(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
        detect(class, Some(registry))
    }
}

fn detect(class: &Class, registry: Option<&ClassRegistry<'_>>) -> Vec<Finding> {
    if !class.is_concrete() {
        return Vec::new();
    }
    let mut findings = Vec::new();
    for field in class.instance_fields() {
        let Some(wrapped) = field.type_internal_name() else {
            continue;
        };
        if !class.supertypes().any(|supertype| supertype == wrapped) {
            continue;
        }
        let delegations = delegation_count(class, &wrapped);
        if delegations == 0 {
            continue;
        }
        let confidence = registry
            .map(|registry| registry.resolve(&wrapped).confidence())
            .unwrap_or(Confidence::Medium);
        findings.push(
            Finding::new(
                ID,
                Severity::Info,
                format!(
                    "Decorator pattern: '{}' wraps field '{}' of type '{}' and delegates {delegations} call(s)",
                    class.dotted_name(),
                    field.name,
                    descriptor::to_dotted(&wrapped)
                ),
                class_location(class),
            )
            .with_confidence(confidence),
        );
    }
    findings
}
