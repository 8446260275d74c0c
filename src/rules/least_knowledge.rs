use crate::descriptor::{self, TypeDescriptor};
use crate::finding::{Finding, Location, Severity};
use crate::ir::{CallKind, CallSite, Class, InstructionKind, Method};
use crate::rules::{Check, CheckCategory, CheckMetadata};

const ID: &str = "LEAST_KNOWLEDGE";

/// Detects train-wreck call chains such as `a.getB().doC()`.
pub struct LeastKnowledgeCheck;

impl Check for LeastKnowledgeCheck {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata {
            id: ID,
            name: "Principle of least knowledge",
            description: "Method chains that reach through returned objects (Law of Demeter)",
            category: CheckCategory::Principle,
        }
    }

    fn check(&self, class: &Class) -> Vec<Finding> {
        if class.is_interface() {
            return Vec::new();
        }
        class
            .methods
            .iter()
            .filter(|method| !method.is_initializer())
            .filter_map(|method| {
                let chains = count_chains(method);
                (chains > 0).then(|| {
                    let severity = if chains >= 3 {
                        Severity::Warning
                    } else {
                        Severity::Info
                    };
                    Finding::new(
                        ID,
                        severity,
                        format!(
                            "Method contains {chains} method chain(s) that may violate the Law of Demeter; introduce local variables or move behavior closer to the data"
                        ),
                        Location::member(class.dotted_name(), format!("{}()", method.name)),
                    )
                })
            })
            .collect()
    }
}

/// Scan state: what the previous instruction left on the stack.
enum ChainState<'a> {
    Idle,
    /// The previous instruction was a call.
    AfterCall(&'a CallSite),
}

fn count_chains(method: &Method) -> usize {
    let mut state = ChainState::Idle;
    let mut chains = 0;
    for instruction in &method.instructions {
        state = match (&state, &instruction.kind) {
            (ChainState::AfterCall(first), InstructionKind::Invoke(second)) => {
                if is_train_wreck(first, second) {
                    chains += 1;
                }
                ChainState::AfterCall(second)
            }
            (ChainState::Idle, InstructionKind::Invoke(call)) => ChainState::AfterCall(call),
            _ => ChainState::Idle,
        };
    }
    chains
}

fn is_train_wreck(first: &CallSite, second: &CallSite) -> bool {
    let Some(returned) = first.return_type() else {
        return false;
    };
    if !descriptor::is_reference(&returned) || second.kind == CallKind::Static {
        return false;
    }
    match &returned {
        // Fluent builders return their own type.
        TypeDescriptor::Object(internal) => internal != &first.owner && !is_fluent_safe(internal),
        _ => true,
    }
}

fn is_fluent_safe(internal: &str) -> bool {
    matches!(
        internal,
        "java/lang/String" | "java/lang/StringBuilder" | "java/lang/StringBuffer" | "java/util/Optional"
    ) || internal.starts_with("java/util/stream/")
}
