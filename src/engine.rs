use tracing::debug;

use crate::config::Thresholds;
use crate::error::ConfigError;
use crate::finding::Finding;
use crate::ir::Class;
use crate::registry::ClassRegistry;
use crate::rules::{Check, default_checks};

/// Holds the enabled checks and runs them over classes.
pub struct Engine {
    checks: Vec<Box<dyn Check>>,
}

impl Engine {
    /// Engine with every built-in check configured from `thresholds`.
    pub fn new(thresholds: &Thresholds) -> Result<Self, ConfigError> {
        Ok(Self::with_checks(default_checks(thresholds)?))
    }

    pub fn with_checks(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn add_check(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    /// Remove the check with `id`; returns whether one was registered.
    pub fn remove_check(&mut self, id: &str) -> bool {
        let before = self.checks.len();
        self.checks.retain(|check| check.metadata().id != id);
        self.checks.len() != before
    }

    pub fn checks(&self) -> &[Box<dyn Check>] {
        &self.checks
    }

    /// Single-class analysis: no other class is resolvable.
    pub fn analyze(&self, class: &Class) -> Vec<Finding> {
        self.checks
            .iter()
            .flat_map(|check| check.check(class))
            .collect()
    }

    /// Whole-program analysis over `classes`, each resolvable by the others.
    pub fn analyze_all(&self, classes: &[Class]) -> Vec<Finding> {
        self.analyze_with_classpath(classes, &[])
    }

    /// Whole-program analysis of `targets`. Classpath classes can be resolved
    /// but are not analyzed themselves.
    pub fn analyze_with_classpath(&self, targets: &[Class], classpath: &[Class]) -> Vec<Finding> {
        let registry = ClassRegistry::new(targets.iter().chain(classpath));
        debug!(
            targets = targets.len(),
            registered = registry.len(),
            checks = self.checks.len(),
            "starting analysis pass"
        );
        let mut findings = Vec::new();
        for class in targets {
            let before = findings.len();
            for check in &self.checks {
                findings.extend(check.check_with_context(class, &registry));
            }
            debug!(
                class = %class.name,
                findings = findings.len() - before,
                "analyzed class"
            );
        }
        findings
    }
}

/// Run `checks` over `units` with whole-program context.
pub fn run_all(checks: &[Box<dyn Check>], units: &[Class]) -> Vec<Finding> {
    let registry = ClassRegistry::new(units);
    units
        .iter()
        .flat_map(|class| {
            let registry = &registry;
            checks
                .iter()
                .flat_map(move |check| check.check_with_context(class, registry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Location, Severity};
    use crate::rules::{CheckCategory, CheckMetadata};
    use crate::test_support::{class, implementing, interface};

    /// Reports how many classes the registry could resolve.
    struct RegistrySize;

    impl Check for RegistrySize {
        fn metadata(&self) -> CheckMetadata {
            CheckMetadata {
                id: "REGISTRY_SIZE",
                name: "Registry size",
                description: "Test probe",
                category: CheckCategory::Style,
            }
        }

        fn check(&self, class: &Class) -> Vec<Finding> {
            vec![Finding::new(
                "REGISTRY_SIZE",
                Severity::Info,
                "0",
                Location::class(class.dotted_name()),
            )]
        }

        fn check_with_context(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
            vec![Finding::new(
                "REGISTRY_SIZE",
                Severity::Info,
                registry.len().to_string(),
                Location::class(class.dotted_name()),
            )]
        }
    }

    /// Single-class check relying on the default context entry point.
    struct ClassName;

    impl Check for ClassName {
        fn metadata(&self) -> CheckMetadata {
            CheckMetadata {
                id: "CLASS_NAME",
                name: "Class name",
                description: "Test probe",
                category: CheckCategory::Style,
            }
        }

        fn check(&self, class: &Class) -> Vec<Finding> {
            vec![Finding::new(
                "CLASS_NAME",
                Severity::Info,
                class.simple_name(),
                Location::class(class.dotted_name()),
            )]
        }
    }

    fn classes() -> Vec<Class> {
        vec![
            class("com/example/A", Vec::new(), Vec::new()),
            class("com/example/B", Vec::new(), Vec::new()),
        ]
    }

    #[test]
    fn every_check_runs_for_every_class_in_order() {
        let engine = Engine::with_checks(vec![Box::new(RegistrySize), Box::new(ClassName)]);

        let findings = engine.analyze_all(&classes());
        let messages: Vec<&str> = findings.iter().map(|finding| finding.message.as_str()).collect();

        assert_eq!(vec!["2", "A", "2", "B"], messages);
    }

    #[test]
    fn classpath_classes_resolve_but_are_not_analyzed() {
        let engine = Engine::with_checks(vec![Box::new(RegistrySize)]);
        let library = vec![class("org/lib/C", Vec::new(), Vec::new())];

        let findings = engine.analyze_with_classpath(&classes(), &library);

        assert_eq!(2, findings.len());
        assert!(findings.iter().all(|finding| finding.message == "3"));
    }

    #[test]
    fn single_class_mode_uses_plain_check() {
        let engine = Engine::with_checks(vec![Box::new(RegistrySize)]);

        let findings = engine.analyze(&classes()[0]);

        assert_eq!("0", findings[0].message);
    }

    #[test]
    fn checks_can_be_added_and_removed() {
        let mut engine = Engine::with_checks(Vec::new());
        engine.add_check(Box::new(ClassName));

        assert_eq!(1, engine.checks().len());
        assert!(!engine.remove_check("MISSING"));
        assert!(engine.remove_check("CLASS_NAME"));
        assert!(engine.checks().is_empty());
    }

    #[test]
    fn run_all_shares_one_registry_for_cross_class_checks() {
        let units = vec![
            interface("com/example/Shape", Vec::new()),
            implementing(class("com/example/Circle", Vec::new(), Vec::new()), &["com/example/Shape"]),
        ];
        let checks = default_checks(&Thresholds::default()).expect("checks");

        let findings = run_all(&checks, &units);

        assert!(findings.iter().any(|finding| finding.check_id == "OPEN_CLOSED"
            && finding.message.contains("com.example.Circle")));
    }

    #[test]
    fn default_engine_registers_builtin_checks() {
        let engine = Engine::new(&Thresholds::default()).expect("engine");

        assert_eq!(14, engine.checks().len());
    }
}
