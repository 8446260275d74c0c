use crate::descriptor;
use crate::finding::{Confidence, Finding, Severity};
use crate::ir::{Class, Field};
use crate::registry::{ClassRegistry, Resolution};
use crate::rules::{Check, CheckCategory, CheckMetadata, field_location, is_platform_type};

const ID: &str = "STRATEGY_PATTERN";

/// Verifies interface-typed fields against the implementers present in the
/// analyzed set. Needs whole-program context; single-class mode reports
/// nothing.
pub struct StrategyCheck;

impl Check for StrategyCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Strategy pattern",
            description: "Interface-typed fields with interchangeable implementations",
            category: CheckCategory::Pattern,
        }
    }

    fn check(&self, _class: &Class) -> Vec<Finding> {
        Vec::new()
    }

    fn check_with_context(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
        if class.is_interface() {
            return Vec::new();
        }
        let mut findings = Vec::new();
        for field in class.instance_fields() {
            let Some(type_name) = field.type_internal_name() else {
                continue;
            };
            if is_platform_type(&type_name) || type_name == class.name {
                continue;
            }
            match registry.resolve(&type_name) {
                Resolution::Unresolved => findings.push(
                    Finding::new(
                        ID,
                        Severity::Error,
                        format!(
                            "Field '{}' has type '{}', which was not found in the analyzed set",
                            field.name,
                            descriptor::to_dotted(&type_name)
                        ),
                        field_location(class, field),
                    )
                    .with_confidence(Resolution::Unresolved.confidence()),
                ),
                Resolution::Resolved(strategy) if strategy.is_interface() => {
                    findings.extend(verify_strategy(class, field, strategy, registry));
                }
                Resolution::Resolved(_) => {}
            }
        }
        findings
    }
}

fn verify_strategy(
    class: &Class,
    field: &Field,
    strategy: &Class,
    registry: &ClassRegistry<'_>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let implementers: Vec<String> = registry
        .implementers_of(&strategy.name)
        .iter()
        .map(|class| class.dotted_name())
        .collect();
    let interface_name = strategy.dotted_name();

    let (severity, message) = match implementers.len() {
        0 => (
            Severity::Error,
            format!(
                "Field '{}' has strategy interface '{interface_name}', but no implementation was found in the analyzed set",
                field.name
            ),
        ),
        1 => (
            Severity::Warning,
            format!(
                "Incomplete Strategy: field '{}' of interface '{interface_name}' has a single implementation ({})",
                field.name, implementers[0]
            ),
        ),
        count => (
            Severity::Info,
            format!(
                "Strategy pattern: field '{}' of interface '{interface_name}' has {count} implementations ({})",
                field.name,
                implementers.join(", ")
            ),
        ),
    };
    findings.push(
        Finding::new(ID, severity, message, field_location(class, field))
            .with_confidence(Confidence::High),
    );

    let delegates = class
        .methods
        .iter()
        .flat_map(|method| method.calls())
        .any(|call| call.owner == strategy.name);
    if !delegates {
        findings.push(
            Finding::new(
                ID,
                Severity::Warning,
                format!(
                    "Field '{}' of interface '{interface_name}' is never invoked; no delegation to the strategy was found",
                    field.name
                ),
                field_location(class, field),
            )
            .with_confidence(Confidence::Medium),
        );
    }
    findings
}
