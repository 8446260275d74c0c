use std::collections::BTreeSet;

use crate::finding::{Finding, Location, Severity};
use crate::ir::Class;
use crate::rules::{Check, CheckCategory, CheckMetadata, field_location};

const ID: &str = "PROGRAM_TO_INTERFACE";

/// Flags concrete collection types used where the collection interface would
/// do: fields, return types and parameters.
pub struct ProgramToInterfaceCheck;

fn preferred_interface(type_name: &str) -> Option<&'static str> {
    let interface = match type_name {
        "java.util.ArrayList" | "java.util.LinkedList" | "java.util.Vector" => "java.util.List",
        "java.util.HashSet" | "java.util.LinkedHashSet" | "java.util.TreeSet" => "java.util.Set",
        "java.util.HashMap" | "java.util.LinkedHashMap" | "java.util.TreeMap"
        | "java.util.Hashtable" => "java.util.Map",
        _ => return None,
    };
    Some(interface)
}

impl Check for ProgramToInterfaceCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Program to interface",
            description: "Concrete collection types in declarations instead of their interfaces",
            category: CheckCategory::Principle,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut reported_fields = BTreeSet::new();

        for field in class.fields.iter().filter(|field| !field.access.is_synthetic) {
            let Some(interface) = preferred_interface(&field.type_name) else {
                continue;
            };
            if reported_fields.insert(field.name.as_str()) {
                findings.push(Finding::new(
                    ID,
                    Severity::Warning,
                    format!(
                        "Field type '{}' should use interface '{interface}' instead",
                        field.type_name
                    ),
                    field_location(class, field),
                ));
            }
        }

        for method in class
            .methods
            .iter()
            .filter(|method| !method.access.is_synthetic && !method.access.is_bridge)
        {
            let location = Location::member(class.dotted_name(), format!("{}()", method.name));
            let return_type = method.return_type_name();
            if let Some(interface) = preferred_interface(&return_type) {
                findings.push(Finding::new(
                    ID,
                    Severity::Warning,
                    format!("Return type '{return_type}' should use interface '{interface}' instead"),
                    location.clone(),
                ));
            }
            for parameter in method.parameter_type_names() {
                if let Some(interface) = preferred_interface(&parameter) {
                    findings.push(Finding::new(
                        ID,
                        Severity::Warning,
                        format!(
                            "Parameter type '{parameter}' should use interface '{interface}' instead"
                        ),
                        location.clone(),
                    ));
                }
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{class, field, method};

    #[test]
    fn concrete_collections_are_flagged_in_every_position() {
        let repository = class(
            "com/example/Repository",
            vec![
                field("items", "Ljava/util/ArrayList;"),
                field("index", "Ljava/util/Map;"),
            ],
            vec![method(
                "group",
                "(Ljava/util/HashSet;I)Ljava/util/TreeMap;",
                Vec::new(),
            )],
        );

        let findings = ProgramToInterfaceCheck.check(&repository);
        let messages: Vec<&str> = findings.iter().map(|finding| finding.message.as_str()).collect();

        assert_eq!(
            vec![
                "Field type 'java.util.ArrayList' should use interface 'java.util.List' instead",
                "Return type 'java.util.TreeMap' should use interface 'java.util.Map' instead",
                "Parameter type 'java.util.HashSet' should use interface 'java.util.Set' instead",
            ],
            messages
        );
        assert_eq!("com.example.Repository#items", findings[0].location.to_string());
        assert_eq!("com.example.Repository#group()", findings[1].location.to_string());
    }

    #[test]
    fn interface_typed_declarations_are_clean() {
        let repository = class(
            "com/example/Repository",
            vec![field("items", "Ljava/util/List;")],
            vec![method("all", "(Ljava/util/Set;)Ljava/util/Collection;", Vec::new())],
        );

        assert!(ProgramToInterfaceCheck.check(&repository).is_empty());
    }
}
