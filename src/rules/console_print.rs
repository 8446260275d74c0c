use crate::finding::{Finding, Severity};
use crate::ir::{CallKind, Class, InstructionKind, Method};
use crate::rules::{Check, CheckCategory, CheckMetadata, method_location};

const ID: &str = "CONSOLE_PRINT";

/// Flags direct printing through `System.out` and `System.err`.
pub struct ConsolePrintCheck;

impl Check for ConsolePrintCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Console printing",
            description: "Direct use of System.out or System.err print methods",
            category: CheckCategory::Style,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        for method in &class.methods {
            for (stream, call, line) in console_prints(method) {
                findings.push(Finding::new(
                    ID,
                    Severity::Warning,
                    format!(
                        "Direct console printing (System.{stream}.{call}) in method '{}'; use a logger unless this is intended program output",
                        method.name
                    ),
                    method_location(class, method).at_line(line),
                ));
            }
        }
        findings
    }
}

/// Stream name, print method and line of every print call preceded by a
/// `System.out`/`System.err` read in the same method.
fn console_prints(method: &Method) -> Vec<(&str, &str, Option<u32>)> {
    let mut prints = Vec::new();
    let mut armed: Option<&str> = None;
    for instruction in &method.instructions {
        match &instruction.kind {
            InstructionKind::FieldRead(field)
                if field.is_static
                    && field.owner == "java/lang/System"
                    && (field.name == "out" || field.name == "err") =>
            {
                armed = Some(field.name.as_str());
            }
            InstructionKind::Invoke(call)
                if call.kind == CallKind::Virtual
                    && call.owner == "java/io/PrintStream"
                    && call.name.starts_with("print") =>
            {
                if let Some(stream) = armed.take() {
                    prints.push((stream, call.name.as_str(), instruction.line));
                }
            }
            _ => {}
        }
    }
    prints
}
