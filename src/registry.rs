use std::collections::BTreeMap;

use tracing::warn;

use crate::descriptor;
use crate::finding::Confidence;
use crate::ir::Class;

/// Read-only, name-keyed view of every class known in one analysis pass.
///
/// Built once per pass and handed to checks by shared reference; nothing can
/// mutate it while checks run.
#[derive(Debug, Default)]
pub struct ClassRegistry<'a> {
    classes: BTreeMap<&'a str, &'a Class>,
}

/// Outcome of looking a type name up in the registry.
#[derive(Clone, Copy, Debug)]
pub enum Resolution<'a> {
    Resolved(&'a Class),
    Unresolved,
}

impl<'a> Resolution<'a> {
    pub fn class(self) -> Option<&'a Class> {
        match self {
            Resolution::Resolved(class) => Some(class),
            Resolution::Unresolved => None,
        }
    }

    /// Confidence a detector may claim about a type with this resolution.
    pub fn confidence(self) -> Confidence {
        match self {
            Resolution::Resolved(_) => Confidence::High,
            Resolution::Unresolved => Confidence::Medium,
        }
    }
}

impl<'a> ClassRegistry<'a> {
    /// Register `classes`; on duplicate names the first definition wins.
    pub fn new(classes: impl IntoIterator<Item = &'a Class>) -> Self {
        let mut registry = BTreeMap::new();
        for class in classes {
            if registry.contains_key(class.name.as_str()) {
                warn!(class = %class.name, "duplicate class definition ignored");
                continue;
            }
            registry.insert(class.name.as_str(), class);
        }
        Self {
            classes: registry,
        }
    }

    /// Look up a type given in internal, dotted or descriptor spelling.
    pub fn resolve(&self, name: &str) -> Resolution<'a> {
        match self.classes.get(descriptor::to_internal(name).as_str()) {
            Some(class) => Resolution::Resolved(class),
            None => Resolution::Unresolved,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Class> {
        self.resolve(name).class()
    }

    /// Concrete and abstract classes that directly implement `interface`,
    /// in name order.
    pub fn implementers_of(&self, interface: &str) -> Vec<&'a Class> {
        let interface = descriptor::to_internal(interface);
        self.classes
            .values()
            .filter(|class| !class.is_interface() && class.implements(&interface))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
