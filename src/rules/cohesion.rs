use std::collections::{BTreeMap, BTreeSet};

use crate::config::Thresholds;
use crate::finding::{Finding, Severity};
use crate::ir::{Class, Method};
use crate::rules::{Check, CheckCategory, CheckMetadata, class_location};

const ID: &str = "SINGLE_RESPONSIBILITY";

/// Flags God Classes and classes whose methods split into unrelated groups
/// (LCOM4).
pub struct SingleResponsibilityCheck {
    max_fields: usize,
    max_methods: usize,
    cohesion_threshold: usize,
    lcom4_enabled: bool,
}

impl SingleResponsibilityCheck {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            max_fields: thresholds.max_fields() as usize,
            max_methods: thresholds.max_methods() as usize,
            cohesion_threshold: thresholds.cohesion_threshold() as usize,
            lcom4_enabled: thresholds.lcom4_enabled(),
        }
    }
}

impl Check for SingleResponsibilityCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Single responsibility",
            description: "God Classes and classes with low method-field cohesion",
            category: CheckCategory::Principle,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        let mut findings = Vec::new();
        let field_count = class
            .fields
            .iter()
            .filter(|field| !field.access.is_synthetic)
            .count();
        let method_count = class.declared_methods().count();
        let too_many_fields = field_count > self.max_fields;
        let too_many_methods = method_count > self.max_methods;
        let god_class = too_many_fields && too_many_methods;

        if god_class {
            findings.push(Finding::new(
                ID,
                Severity::Error,
                format!(
                    "God Class: {field_count} fields (max {}) and {method_count} methods (max {}); split it by responsibility",
                    self.max_fields, self.max_methods
                ),
                class_location(class),
            ));
        } else if too_many_fields {
            findings.push(Finding::new(
                ID,
                Severity::Warning,
                format!(
                    "Class has {field_count} fields (max {}); it may hold more than one responsibility",
                    self.max_fields
                ),
                class_location(class),
            ));
        } else if too_many_methods {
            findings.push(Finding::new(
                ID,
                Severity::Warning,
                format!(
                    "Class has {method_count} methods (max {}); it may hold more than one responsibility",
                    self.max_methods
                ),
                class_location(class),
            ));
        }

        if self.lcom4_enabled && !class.is_interface() {
            if let Some(graph) = CohesionGraph::build(class) {
                findings.extend(self.cohesion_finding(class, &graph, god_class));
            }
        }
        findings
    }
}

impl SingleResponsibilityCheck {
    fn cohesion_finding(
        &self,
        class: &Class,
        graph: &CohesionGraph,
        god_class: bool,
    ) -> Option<Finding> {
        let components = graph.components;
        if components > self.cohesion_threshold {
            let severity = if god_class {
                Severity::Error
            } else {
                Severity::Warning
            };
            return Some(Finding::new(
                ID,
                severity,
                format!(
                    "LCOM4 = {components}: methods form {components} separate responsibilities; consider splitting into {components} classes. Method-field access: {}",
                    graph.access_summary()
                ),
                class_location(class),
            ));
        }
        if components == 1 && graph.methods.len() >= 3 {
            return Some(Finding::new(
                ID,
                Severity::Info,
                format!(
                    "LCOM4 = 1: all {} methods share instance state; class is cohesive",
                    graph.methods.len()
                ),
                class_location(class),
            ));
        }
        None
    }
}

/// Method-field graph of one class and its connected component count.
#[derive(Debug)]
pub(crate) struct CohesionGraph {
    /// Qualifying methods with the own instance fields each one touches.
    pub(crate) methods: Vec<(String, BTreeSet<String>)>,
    pub(crate) components: usize,
}

impl CohesionGraph {
    /// `None` when the class is trivially cohesive: fewer than two
    /// qualifying methods or no instance fields.
    pub(crate) fn build(class: &Class) -> Option<Self> {
        let fields: BTreeSet<&str> = class
            .instance_fields()
            .map(|field| field.name.as_str())
            .collect();
        let methods: Vec<&Method> = class
            .methods
            .iter()
            .filter(|method| {
                !method.access.is_abstract && !method.access.is_synthetic && !method.is_initializer()
            })
            .collect();
        if methods.len() < 2 || fields.is_empty() {
            return None;
        }

        let accessed: Vec<(String, BTreeSet<String>)> = methods
            .iter()
            .map(|method| {
                let touched = method
                    .field_accesses()
                    .filter(|(field, _)| {
                        !field.is_static
                            && field.owner == class.name
                            && fields.contains(field.name.as_str())
                    })
                    .map(|(field, _)| field.name.clone())
                    .collect();
                (method.name.clone(), touched)
            })
            .collect();

        let mut sets = DisjointSet::new(accessed.len());
        let mut first_user: BTreeMap<&str, usize> = BTreeMap::new();
        for (index, (_, touched)) in accessed.iter().enumerate() {
            for field in touched {
                match first_user.get(field.as_str()) {
                    Some(&other) => sets.union(index, other),
                    None => {
                        first_user.insert(field.as_str(), index);
                    }
                }
            }
        }
        let components = sets.count();

        Some(Self {
            methods: accessed,
            components,
        })
    }

    fn access_summary(&self) -> String {
        self.methods
            .iter()
            .map(|(method, fields)| {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                format!("{method}{{{}}}", fields.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Union-find with path compression and union by rank.
#[derive(Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub(crate) fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
    }

    /// Number of disjoint sets.
    pub(crate) fn count(&mut self) -> usize {
        let mut roots = BTreeSet::new();
        for node in 0..self.parent.len() {
            roots.insert(self.find(node));
        }
        roots.len()
    }
}
