use crate::descriptor::{self, MethodDescriptor, TypeDescriptor};

/// Intermediate representation for a parsed JVM class or interface.
///
/// Built once per loaded unit and never mutated by analyses. `name` is the
/// internal (slash-delimited) name and is unique within a run.
#[derive(Clone, Debug)]
pub struct Class {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: ClassAccess,
    pub source_file: Option<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl Class {
    /// Source-level name, e.g. `com.example.Service`.
    pub fn dotted_name(&self) -> String {
        descriptor::to_dotted(&self.name)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface
    }

    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract && !self.access.is_interface
    }

    /// Neither an interface nor an abstract class.
    pub fn is_concrete(&self) -> bool {
        !self.access.is_interface && !self.access.is_abstract
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|name| name == interface)
    }

    /// Superclass (other than `java/lang/Object`) followed by the directly
    /// implemented interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .filter(|name| *name != "java/lang/Object")
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Non-static, non-synthetic fields declared by this class.
    pub fn instance_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|field| !field.access.is_static && !field.access.is_synthetic)
    }

    /// Methods other than constructors, static initializers and
    /// compiler-generated members.
    pub fn declared_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(|method| !method.is_initializer() && !method.access.is_synthetic)
    }
}

/// Class access flags used for rule filtering.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassAccess {
    pub is_public: bool,
    pub is_final: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_synthetic: bool,
    pub is_annotation: bool,
    pub is_enum: bool,
}

/// Member visibility derived from the access flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

/// Field declared by a class.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub descriptor: String,
    /// Source-level type name, e.g. `java.util.List` or `int[]`.
    pub type_name: String,
    pub access: FieldAccess,
    /// True when the field carries a `ConstantValue` attribute, meaning reads
    /// of it are usually folded into the using code by the compiler.
    pub has_constant_value: bool,
}

impl Field {
    pub fn field_type(&self) -> Option<TypeDescriptor> {
        descriptor::field_type(&self.descriptor)
    }

    /// Internal name of the declared type for non-array reference fields.
    pub fn type_internal_name(&self) -> Option<String> {
        self.field_type()
            .and_then(|field_type| descriptor::internal_name(&field_type).map(str::to_string))
    }

    pub fn is_private(&self) -> bool {
        self.access.visibility == Visibility::Private
    }
}

/// Field access flags used for rule filtering.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldAccess {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_synthetic: bool,
}

/// Intermediate representation for a method and its bytecode.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    pub descriptor: String,
    pub access: MethodAccess,
    /// Ordered exactly as in the `Code` attribute; empty for abstract and
    /// native methods.
    pub instructions: Vec<Instruction>,
    /// Entries of the `LocalVariableTable`, present only with debug info.
    pub local_variables: Vec<LocalVariable>,
}

impl Method {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    pub fn is_initializer(&self) -> bool {
        self.is_constructor() || self.is_static_initializer()
    }

    pub fn parsed_descriptor(&self) -> Option<MethodDescriptor> {
        descriptor::method_descriptor(&self.descriptor)
    }

    pub fn return_type_name(&self) -> String {
        match self.parsed_descriptor() {
            Some(parsed) => descriptor::source_name(parsed.return_type()),
            None => self.descriptor.clone(),
        }
    }

    pub fn parameter_type_names(&self) -> Vec<String> {
        self.parsed_descriptor()
            .map(|parsed| {
                parsed
                    .parameter_types()
                    .iter()
                    .map(descriptor::source_name)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invocation call sites in instruction order.
    pub fn calls(&self) -> impl Iterator<Item = &CallSite> {
        self.instructions
            .iter()
            .filter_map(|instruction| match &instruction.kind {
                InstructionKind::Invoke(call) => Some(call),
                _ => None,
            })
    }

    /// Field reads and writes in instruction order.
    pub fn field_accesses(&self) -> impl Iterator<Item = (&FieldRef, FieldAccessKind)> {
        self.instructions
            .iter()
            .filter_map(|instruction| match &instruction.kind {
                InstructionKind::FieldRead(field) => Some((field, FieldAccessKind::Read)),
                InstructionKind::FieldWrite(field) => Some((field, FieldAccessKind::Write)),
                _ => None,
            })
    }

    /// Conditional branches plus multi-way switches.
    pub fn branch_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|instruction| {
                matches!(
                    instruction.kind,
                    InstructionKind::ConditionalBranch | InstructionKind::Switch
                )
            })
            .count()
    }
}

/// Method access flags used for rule filtering.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodAccess {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_synthetic: bool,
    pub is_bridge: bool,
}

/// Entry of the `LocalVariableTable` attribute.
#[derive(Clone, Debug)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
    pub index: u16,
    pub start_pc: u16,
    pub length: u16,
}

/// Bytecode instruction captured for analysis.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub kind: InstructionKind,
    /// Source line of the nearest preceding line-number entry.
    pub line: Option<u32>,
}

/// Instruction categories the analyses distinguish.
#[derive(Clone, Debug)]
pub enum InstructionKind {
    LoadLocal(u16),
    StoreLocal(u16),
    IncrementLocal(u16),
    FieldRead(FieldRef),
    FieldWrite(FieldRef),
    Invoke(CallSite),
    InvokeDynamic(DynamicCallSite),
    ConditionalBranch,
    Switch,
    ConstString(String),
    Other,
}

/// Read or write of a field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldAccessKind {
    Read,
    Write,
}

/// Field reference operand of a `get*`/`put*` instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
}

/// Call site extracted from bytecode.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallSite {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub kind: CallKind,
    pub offset: u32,
}

impl CallSite {
    pub fn owner_dotted(&self) -> String {
        descriptor::to_dotted(&self.owner)
    }

    /// Declared return type; `None` for `void` or an unparseable descriptor.
    pub fn return_type(&self) -> Option<TypeDescriptor> {
        descriptor::method_descriptor(&self.descriptor)
            .map(|parsed| parsed.return_type().clone())
            .filter(|return_type| *return_type != TypeDescriptor::Void)
    }
}

/// Call opcode classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum CallKind {
    Virtual,
    Interface,
    Special,
    Static,
}

/// `invokedynamic` call site with its resolved bootstrap method, when the
/// `BootstrapMethods` attribute could be followed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DynamicCallSite {
    pub name: String,
    pub descriptor: String,
    pub bootstrap_owner: Option<String>,
    pub bootstrap_name: Option<String>,
}

impl DynamicCallSite {
    /// Compiler-generated string concatenation (`StringConcatFactory`).
    pub fn is_string_concat(&self) -> bool {
        self.bootstrap_owner.as_deref() == Some("java/lang/invoke/StringConcatFactory")
            && matches!(
                self.bootstrap_name.as_deref(),
                Some("makeConcatWithConstants") | Some("makeConcat")
            )
    }
}
