use crate::descriptor;
use crate::finding::{Confidence, Finding, Severity};
use crate::ir::{Class, Field};
use crate::registry::{ClassRegistry, Resolution};
use crate::rules::{Check, CheckCategory, CheckMetadata, class_location};

const ID: &str = "ADAPTER_PATTERN";

/// Detects classes that implement a target interface by delegating to a
/// field of an unrelated type (the adaptee).
pub struct AdapterCheck;

impl Check for AdapterCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Adapter pattern",
            description: "Classes that implement an interface by delegating to an unrelated type",
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
    if !class.is_concrete() || class.interfaces.is_empty() {
        return Vec::new();
    }
    let mut findings = Vec::new();
    for field in class.instance_fields() {
        let Some(adaptee) = adaptee_type(class, field) else {
            continue;
        };
        let delegations = delegation_count(class, &adaptee);
        if delegations == 0 {
            continue;
        }

        let confidence = match registry {
            Some(registry) => {
                let resolution = registry.resolve(&adaptee);
                // An adaptee that already implements the target is not being adapted.
                if let Resolution::Resolved(resolved) = resolution {
                    if class.interfaces.iter().any(|target| resolved.implements(target)) {
                        continue;
                    }
                }
                let targets_verified = class.interfaces.iter().all(|target| {
                    registry
                        .get(target)
                        .is_some_and(|target| target.is_interface())
                });
                if targets_verified {
                    resolution.confidence()
                } else {
                    Confidence::Medium
                }
            }
            None => Confidence::Medium,
        };

        let targets: Vec<String> = class
            .interfaces
            .iter()
            .map(|name| descriptor::to_dotted(name))
            .collect();
        findings.push(
            Finding::new(
                ID,
                Severity::Info,
                format!(
                    "Adapter pattern: '{}' adapts '{}' (field '{}') to {}; {delegations} delegating call(s)",
                    class.dotted_name(),
                    descriptor::to_dotted(&adaptee),
                    field.name,
                    targets.join(", ")
                ),
                class_location(class),
            )
            .with_confidence(confidence),
        );
    }
    findings
}

/// Internal name of `field`'s type when it is unrelated to `class`.
fn adaptee_type(class: &Class, field: &Field) -> Option<String> {
    let type_name = field.type_internal_name()?;
    let related = type_name == class.name
        || class.implements(&type_name)
        || class.super_name.as_deref() == Some(type_name.as_str());
    if related || is_value_type(&type_name) {
        return None;
    }
    Some(type_name)
}

fn is_value_type(internal_name: &str) -> bool {
    matches!(
        internal_name,
        "java/lang/Object"
            | "java/lang/String"
            | "java/lang/Integer"
            | "java/lang/Long"
            | "java/lang/Short"
            | "java/lang/Byte"
            | "java/lang/Character"
            | "java/lang/Boolean"
            | "java/lang/Float"
            | "java/lang/Double"
    )
}

/// Calls to `owner` made outside constructors.
pub(crate) fn delegation_count(class: &Class, owner: &str) -> usize {
    class
        .methods
        .iter()
        .filter(|method| !method.is_constructor())
        .flat_map(|method| method.calls())
        .filter(|call| call.owner == owner && call.name != "<init>")
        .count()
}
