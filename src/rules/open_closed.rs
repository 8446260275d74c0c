use std::collections::BTreeSet;

use crate::config::Thresholds;
use crate::finding::{Confidence, Finding, Severity};
use crate::ir::Class;
use crate::registry::ClassRegistry;
use crate::rules::{Check, CheckCategory, CheckMetadata, class_location, method_location};

const ID: &str = "OPEN_CLOSED";
const CONCRETE_DEPENDENCY_LIMIT: usize = 3;
const REFERENCE_FIELD_LIMIT: usize = 4;

/// Flags branch-heavy concrete classes and rigid concrete coupling, and notes
/// interfaces that serve as extension points.
pub struct OpenClosedCheck {
    max_method_branches: usize,
    max_class_branches: usize,
}

impl OpenClosedCheck {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            max_method_branches: thresholds.max_method_branches() as usize,
            max_class_branches: thresholds.max_class_branches() as usize,
        }
    }

    fn branch_findings(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut total = 0;
        for method in class.methods.iter().filter(|method| !method.access.is_synthetic) {
            let branches = method.branch_count();
            total += branches;
            if branches > self.max_method_branches {
                findings.push(Finding::new(
                    ID,
                    Severity::Error,
                    format!(
                        "Method '{}' has {branches} conditional branches (max {}); new cases will require modifying it. Consider polymorphism or a strategy",
                        method.name, self.max_method_branches
                    ),
                    method_location(class, method),
                ));
            }
        }
        if total > self.max_class_branches {
            findings.push(Finding::new(
                ID,
                Severity::Error,
                format!(
                    "Class '{}' has {total} conditional branches in total (max {}); behavior is selected by conditionals instead of extension",
                    class.dotted_name(),
                    self.max_class_branches
                ),
                class_location(class),
            ));
        }
        findings
    }

    fn coupling_findings(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut reference_fields = 0;
        let mut abstraction_fields = 0;
        let mut concrete_dependencies = BTreeSet::new();

        for field in class.instance_fields() {
            let Some(type_name) = field.type_internal_name() else {
                continue;
            };
            reference_fields += 1;
            let Some(dependency) = registry.get(&type_name) else {
                continue;
            };
            if dependency.is_interface() || dependency.is_abstract() {
                abstraction_fields += 1;
            } else if dependency.name != class.name {
                concrete_dependencies.insert(dependency.dotted_name());
            }
        }

        if concrete_dependencies.len() >= CONCRETE_DEPENDENCY_LIMIT {
            findings.push(
                Finding::new(
                    ID,
                    Severity::Warning,
                    format!(
                        "Class '{}' composes {} concrete dependencies ({}); this reduces extensibility",
                        class.dotted_name(),
                        concrete_dependencies.len(),
                        concrete_dependencies
                            .iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    class_location(class),
                )
                .with_confidence(Confidence::High),
            );
        }
        if reference_fields >= REFERENCE_FIELD_LIMIT && abstraction_fields == 0 {
            findings.push(
                Finding::new(
                    ID,
                    Severity::Warning,
                    format!(
                        "Class '{}' has {reference_fields} reference fields but none are typed to an interface or abstract class in the analyzed set",
                        class.dotted_name()
                    ),
                    class_location(class),
                )
                .with_confidence(Confidence::Medium),
            );
        }
        findings
    }
}

impl Check for OpenClosedCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Open/closed",
            description: "Branch-heavy classes, concrete coupling and interface extension points",
            category: CheckCategory::Principle,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        if class.is_interface() {
            return vec![Finding::new(
                ID,
                Severity::Info,
                format!(
                    "Interface '{}' is a potential extension point",
                    class.dotted_name()
                ),
                class_location(class),
            )];
        }
        if class.is_abstract() {
            return Vec::new();
        }
        self.branch_findings(class)
    }

    fn check_with_context(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
        if class.is_interface() {
            let implementers = registry.implementers_of(&class.name);
            if implementers.is_empty() {
                return Vec::new();
            }
            let names: Vec<String> = implementers.iter().map(|class| class.dotted_name()).collect();
            return vec![
                Finding::new(
                    ID,
                    Severity::Info,
                    format!(
                        "Interface '{}' supports extensibility with {} implementation(s): {}",
                        class.dotted_name(),
                        names.len(),
                        names.join(", ")
                    ),
                    class_location(class),
                )
                .with_confidence(Confidence::High),
            ];
        }
        if class.is_abstract() {
            return Vec::new();
        }
        let mut findings = self.branch_findings(class);
        findings.extend(self.coupling_findings(class, registry));
        findings
    }
}
