use std::collections::BTreeSet;

use crate::finding::{Confidence, Finding, Severity};
use crate::ir::{Class, Method, Visibility};
use crate::rules::{Check, CheckCategory, CheckMetadata, method_location};

const ID: &str = "TEMPLATE_METHOD";
const MIN_STEPS: usize = 2;

/// Detects abstract classes whose concrete methods orchestrate the class's
/// own abstract steps.
pub struct TemplateMethodCheck;

impl Check for TemplateMethodCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Template Method pattern",
            description: "Methods of abstract classes that call two or more of the class's abstract steps",
            category: CheckCategory::Pattern,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        if !class.is_abstract() {
            return Vec::new();
        }
        let abstract_steps: BTreeSet<&str> = class
            .methods
            .iter()
            .filter(|method| method.access.is_abstract)
            .map(|method| method.name.as_str())
            .collect();
        if abstract_steps.len() < MIN_STEPS {
            return Vec::new();
        }

        class
            .methods
            .iter()
            .filter(|method| {
                !method.access.is_abstract
                    && !method.access.is_static
                    && !method.access.is_synthetic
                    && !method.is_initializer()
            })
            .filter_map(|method| {
                let steps = called_steps(class, method, &abstract_steps);
                if steps.len() < MIN_STEPS {
                    return None;
                }
                let steps = steps.into_iter().collect::<Vec<_>>().join(", ");
                if method.access.is_final {
                    Some(
                        Finding::new(
                            ID,
                            Severity::Info,
                            format!(
                                "Template Method pattern detected: final method '{}' defines the algorithm; abstract steps: {steps}",
                                method.name
                            ),
                            method_location(class, method),
                        )
                        .with_confidence(Confidence::High),
                    )
                } else if method.access.visibility != Visibility::Private {
                    Some(
                        Finding::new(
                            ID,
                            Severity::Info,
                            format!(
                                "Possible Template Method: '{}' calls abstract steps {steps}; consider making it final so subclasses cannot change the algorithm",
                                method.name
                            ),
                            method_location(class, method),
                        )
                        .with_confidence(Confidence::Low),
                    )
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Distinct abstract steps of `class` invoked from `method`, counting only
/// call sites owned by the class itself.
fn called_steps<'a>(
    class: &Class,
    method: &'a Method,
    abstract_steps: &BTreeSet<&str>,
) -> BTreeSet<&'a str> {
    method
        .calls()
        .filter(|call| call.owner == class.name && abstract_steps.contains(call.name.as_str()))
        .map(|call| call.name.as_str())
        .collect()
}
