use crate::config::Thresholds;
use crate::error::ConfigError;
use crate::finding::{Finding, Location};
use crate::ir::{Class, Field, Method};
use crate::registry::ClassRegistry;

pub mod adapter;
pub mod cohesion;
pub mod console_print;
pub mod decorator;
pub mod least_knowledge;
pub mod method_length;
pub mod naming;
pub mod open_closed;
pub mod program_to_interface;
pub mod security;
pub mod strategy;
pub mod template_method;
pub mod unused;

/// Reporting group of a check. Used for presentation only, never for
/// dispatch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckCategory {
    Style,
    Principle,
    Pattern,
}

impl CheckCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckCategory::Style => "style",
            CheckCategory::Principle => "principle",
            CheckCategory::Pattern => "pattern",
        }
    }
}

/// Metadata describing a check.
#[derive(Clone, Debug)]
pub struct CheckMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: CheckCategory,
}

/// Analysis over the structural model.
///
/// Checks only read the class and the registry. Types that cannot be resolved
/// lower the confidence of a finding or suppress it; they are never errors.
pub trait Check {
    fn metadata(&self) -> CheckMetadata;

    /// Single-class analysis.
    fn check(&self, class: &Class) -> Vec<Finding>;

    /// Whole-program analysis. Checks without cross-class logic keep the
    /// default, so the engine calls this entry point for every check.
    fn check_with_context(&self, class: &Class, registry: &ClassRegistry<'_>) -> Vec<Finding> {
        let _ = registry;
        self.check(class)
    }
}

/// Every built-in check, configured from `thresholds`.
pub fn default_checks(thresholds: &Thresholds) -> Result<Vec<Box<dyn Check>>, ConfigError> {
    thresholds.validate()?;
    Ok(vec![
        Box::new(cohesion::SingleResponsibilityCheck::new(thresholds)),
        Box::new(open_closed::OpenClosedCheck::new(thresholds)),
        Box::new(least_knowledge::LeastKnowledgeCheck),
        Box::new(program_to_interface::ProgramToInterfaceCheck),
        Box::new(security::SecurityCheck::new(thresholds)?),
        Box::new(adapter::AdapterCheck),
        Box::new(decorator::DecoratorCheck),
        Box::new(strategy::StrategyCheck),
        Box::new(template_method::TemplateMethodCheck),
        Box::new(unused::UnusedCheck),
        Box::new(method_length::MethodLengthCheck::new(thresholds)),
        Box::new(naming::MethodNamingCheck),
        Box::new(naming::FieldNamingCheck),
        Box::new(console_print::ConsolePrintCheck),
    ])
}

pub(crate) fn class_location(class: &Class) -> Location {
    Location::class(class.dotted_name())
}

pub(crate) fn method_location(class: &Class, method: &Method) -> Location {
    Location::member(class.dotted_name(), method.name.clone())
}

pub(crate) fn field_location(class: &Class, field: &Field) -> Location {
    Location::member(class.dotted_name(), field.name.clone())
}

/// JDK and other platform types never defined by the analyzed program.
pub(crate) fn is_platform_type(internal_name: &str) -> bool {
    ["java/", "javax/", "jdk/", "sun/", "kotlin/", "scala/"]
        .iter()
        .any(|prefix| internal_name.starts_with(prefix))
}
