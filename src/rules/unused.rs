use std::collections::BTreeSet;

use crate::descriptor;
use crate::finding::{Finding, Severity};
use crate::ir::{Class, FieldAccessKind, InstructionKind, Method};
use crate::rules::{Check, CheckCategory, CheckMetadata, field_location, method_location};

const ID: &str = "UNUSED_VARIABLE";

/// Reports local variables that are never read and private fields that are
/// never read by the class itself.
pub struct UnusedCheck;

impl Check for UnusedCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Unused variables",
            description: "Local variables and private fields that are never read",
            category: CheckCategory::Style,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        if class.is_interface() {
            return Vec::new();
        }
        let mut findings = Vec::new();
        for method in &class.methods {
            findings.extend(unused_locals(method).into_iter().map(|name| {
                Finding::new(
                    ID,
                    Severity::Warning,
                    format!("Local variable '{name}' is declared but never used"),
                    method_location(class, method),
                )
            }));
        }
        findings.extend(unused_private_fields(class));
        findings
    }
}

/// Names of declared locals whose slot is never loaded or incremented.
/// Debug info is required; without a `LocalVariableTable` nothing is
/// reported.
fn unused_locals(method: &Method) -> Vec<&str> {
    let read_slots: BTreeSet<u16> = method
        .instructions
        .iter()
        .filter_map(|instruction| match instruction.kind {
            InstructionKind::LoadLocal(slot) | InstructionKind::IncrementLocal(slot) => Some(slot),
            _ => None,
        })
        .collect();
    let receiver_slots = u16::from(!method.access.is_static);
    let parameter_slots = receiver_slots
        + method
            .parsed_descriptor()
            .map(|parsed| descriptor::parameter_slots(&parsed))
            .unwrap_or(0);

    let mut reported = BTreeSet::new();
    method
        .local_variables
        .iter()
        .filter(|local| local.index >= parameter_slots)
        .filter(|local| !local.name.contains('$'))
        .filter(|local| !read_slots.contains(&local.index))
        .filter(|local| reported.insert((local.index, local.name.as_str())))
        .map(|local| local.name.as_str())
        .collect()
}

fn unused_private_fields(class: &Class) -> Vec<Finding> {
    let read: BTreeSet<&str> = class
        .methods
        .iter()
        .flat_map(|method| method.field_accesses())
        .filter(|(field, kind)| *kind == FieldAccessKind::Read && field.owner == class.name)
        .map(|(field, _)| field.name.as_str())
        .collect();

    class
        .fields
        .iter()
        .filter(|field| field.is_private() && !field.access.is_synthetic)
        // Reads of compile-time constants are inlined at the use site.
        .filter(|field| !field.has_constant_value)
        .filter(|field| field.name != "serialVersionUID")
        .filter(|field| !read.contains(field.name.as_str()))
        .map(|field| {
            Finding::new(
                ID,
                Severity::Warning,
                format!(
                    "Private field '{}' is never read (only written or completely unused)",
                    field.name
                ),
                field_location(class, field),
            )
        })
        .collect()
}
