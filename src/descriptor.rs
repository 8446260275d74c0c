use std::str::FromStr;

pub use jdescriptor::{MethodDescriptor, TypeDescriptor};

/// Parse a complete field descriptor such as `Ljava/util/List;` or `[I`.
pub fn field_type(descriptor: &str) -> Option<TypeDescriptor> {
    let parsed = TypeDescriptor::from_str(descriptor).ok()?;
    // The parser stops after the first type; anything left over is malformed.
    (parsed != TypeDescriptor::Void && parsed.to_string() == descriptor).then_some(parsed)
}

pub fn method_descriptor(descriptor: &str) -> Option<MethodDescriptor> {
    let parsed = MethodDescriptor::from_str(descriptor).ok()?;
    (parsed.to_string() == descriptor).then_some(parsed)
}

/// Source-level name: `java.util.List`, `int`, `java.lang.String[]`.
pub fn source_name(descriptor: &TypeDescriptor) -> String {
    let name = match descriptor {
        TypeDescriptor::Byte => "byte",
        TypeDescriptor::Char => "char",
        TypeDescriptor::Double => "double",
        TypeDescriptor::Float => "float",
        TypeDescriptor::Integer => "int",
        TypeDescriptor::Long => "long",
        TypeDescriptor::Short => "short",
        TypeDescriptor::Boolean => "boolean",
        TypeDescriptor::Void => "void",
        TypeDescriptor::Object(internal) => return to_dotted(internal),
        TypeDescriptor::Array(component, dimensions) => {
            return format!(
                "{}{}",
                source_name(component),
                "[]".repeat(usize::from(*dimensions))
            );
        }
    };
    name.to_string()
}

/// Internal name for non-array reference types.
pub fn internal_name(descriptor: &TypeDescriptor) -> Option<&str> {
    match descriptor {
        TypeDescriptor::Object(internal) => Some(internal),
        _ => None,
    }
}

pub fn is_reference(descriptor: &TypeDescriptor) -> bool {
    matches!(
        descriptor,
        TypeDescriptor::Object(_) | TypeDescriptor::Array(..)
    )
}

/// Number of local variable slots a value of this type occupies.
pub fn slot_size(descriptor: &TypeDescriptor) -> u16 {
    match descriptor {
        TypeDescriptor::Long | TypeDescriptor::Double => 2,
        TypeDescriptor::Void => 0,
        _ => 1,
    }
}

/// Slots used by the declared parameters, excluding the receiver.
pub fn parameter_slots(descriptor: &MethodDescriptor) -> u16 {
    descriptor.parameter_types().iter().map(slot_size).sum()
}

/// Source-level name for a field descriptor, falling back to the raw text.
pub fn type_name(descriptor: &str) -> String {
    field_type(descriptor)
        .map(|field_type| source_name(&field_type))
        .unwrap_or_else(|| descriptor.to_string())
}

/// `java/util/List` -> `java.util.List`
pub fn to_dotted(name: &str) -> String {
    name.replace('/', ".")
}

/// Normalize any spelling of a class name (`a.b.C`, `a/b/C`, `La/b/C;`) to
/// the internal form.
pub fn to_internal(name: &str) -> String {
    let stripped = name
        .strip_prefix('L')
        .and_then(|inner| inner.strip_suffix(';'))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(name);
    stripped.replace('.', "/")
}
