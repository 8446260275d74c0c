//! Builders for hand-made class models used across rule tests.

use crate::ir::{
    CallKind, CallSite, Class, ClassAccess, DynamicCallSite, Field, FieldAccess, FieldRef,
    Instruction, InstructionKind, LocalVariable, Method, MethodAccess, Visibility,
};
use crate::{descriptor, opcodes};

/// Public concrete class extending `java/lang/Object`.
pub(crate) fn class(name: &str, fields: Vec<Field>, methods: Vec<Method>) -> Class {
    Class {
        name: name.to_string(),
        super_name: Some("java/lang/Object".to_string()),
        interfaces: Vec::new(),
        access: ClassAccess {
            is_public: true,
            ..ClassAccess::default()
        },
        source_file: None,
        fields,
        methods,
    }
}

pub(crate) fn interface(name: &str, methods: Vec<Method>) -> Class {
    let mut interface = class(name, Vec::new(), methods);
    interface.access.is_interface = true;
    interface.access.is_abstract = true;
    interface
}

pub(crate) fn abstract_class(name: &str, fields: Vec<Field>, methods: Vec<Method>) -> Class {
    let mut class = class(name, fields, methods);
    class.access.is_abstract = true;
    class
}

pub(crate) fn implementing(mut class: Class, interfaces: &[&str]) -> Class {
    class.interfaces = interfaces.iter().map(|name| name.to_string()).collect();
    class
}

/// Public instance method whose instructions get consecutive offsets and no
/// line information.
pub(crate) fn method(name: &str, descriptor: &str, instructions: Vec<InstructionKind>) -> Method {
    Method {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        access: MethodAccess {
            visibility: Visibility::Public,
            ..MethodAccess::default()
        },
        instructions: instructions
            .into_iter()
            .enumerate()
            .map(|(offset, kind)| Instruction {
                offset: offset as u32,
                opcode: opcode_for(&kind),
                kind,
                line: None,
            })
            .collect(),
        local_variables: Vec::new(),
    }
}

pub(crate) fn abstract_method(name: &str, descriptor: &str) -> Method {
    let mut method = method(name, descriptor, Vec::new());
    method.access.is_abstract = true;
    method
}

pub(crate) fn constructor(instructions: Vec<InstructionKind>) -> Method {
    method("<init>", "()V", instructions)
}

/// Assigns `line` to every instruction of `method`.
pub(crate) fn on_line(mut method: Method, line: u32) -> Method {
    for instruction in &mut method.instructions {
        instruction.line = Some(line);
    }
    method
}

/// Private instance field.
pub(crate) fn field(name: &str, descriptor: &str) -> Field {
    Field {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        type_name: descriptor::type_name(descriptor),
        access: FieldAccess {
            visibility: Visibility::Private,
            ..FieldAccess::default()
        },
        has_constant_value: false,
    }
}

pub(crate) fn constant(name: &str, descriptor: &str) -> Field {
    let mut field = field(name, descriptor);
    field.access.visibility = Visibility::Public;
    field.access.is_static = true;
    field.access.is_final = true;
    field.has_constant_value = true;
    field
}

pub(crate) fn local(name: &str, descriptor: &str, index: u16) -> LocalVariable {
    LocalVariable {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        index,
        start_pc: 0,
        length: 0,
    }
}

pub(crate) fn get_field(owner: &str, name: &str, descriptor: &str) -> InstructionKind {
    InstructionKind::FieldRead(field_ref(owner, name, descriptor, false))
}

pub(crate) fn put_field(owner: &str, name: &str, descriptor: &str) -> InstructionKind {
    InstructionKind::FieldWrite(field_ref(owner, name, descriptor, false))
}

pub(crate) fn get_static(owner: &str, name: &str, descriptor: &str) -> InstructionKind {
    InstructionKind::FieldRead(field_ref(owner, name, descriptor, true))
}

pub(crate) fn invoke(kind: CallKind, owner: &str, name: &str, descriptor: &str) -> InstructionKind {
    InstructionKind::Invoke(CallSite {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        kind,
        offset: 0,
    })
}

pub(crate) fn string_concat() -> InstructionKind {
    InstructionKind::InvokeDynamic(DynamicCallSite {
        name: "makeConcatWithConstants".to_string(),
        descriptor: "(Ljava/lang/String;)Ljava/lang/String;".to_string(),
        bootstrap_owner: Some("java/lang/invoke/StringConcatFactory".to_string()),
        bootstrap_name: Some("makeConcatWithConstants".to_string()),
    })
}

pub(crate) fn ldc(value: &str) -> InstructionKind {
    InstructionKind::ConstString(value.to_string())
}

pub(crate) fn load(index: u16) -> InstructionKind {
    InstructionKind::LoadLocal(index)
}

pub(crate) fn store(index: u16) -> InstructionKind {
    InstructionKind::StoreLocal(index)
}

pub(crate) fn branch() -> InstructionKind {
    InstructionKind::ConditionalBranch
}

pub(crate) fn other() -> InstructionKind {
    InstructionKind::Other
}

fn field_ref(owner: &str, name: &str, descriptor: &str, is_static: bool) -> FieldRef {
    FieldRef {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        is_static,
    }
}

fn opcode_for(kind: &InstructionKind) -> u8 {
    match kind {
        InstructionKind::LoadLocal(_) => opcodes::ALOAD,
        InstructionKind::StoreLocal(_) => opcodes::ASTORE,
        InstructionKind::IncrementLocal(_) => opcodes::IINC,
        InstructionKind::FieldRead(field) if field.is_static => opcodes::GETSTATIC,
        InstructionKind::FieldRead(_) => opcodes::GETFIELD,
        InstructionKind::FieldWrite(field) if field.is_static => opcodes::PUTSTATIC,
        InstructionKind::FieldWrite(_) => opcodes::PUTFIELD,
        InstructionKind::Invoke(call) => match call.kind {
            CallKind::Virtual => opcodes::INVOKEVIRTUAL,
            CallKind::Interface => opcodes::INVOKEINTERFACE,
            CallKind::Special => opcodes::INVOKESPECIAL,
            CallKind::Static => opcodes::INVOKESTATIC,
        },
        InstructionKind::InvokeDynamic(_) => opcodes::INVOKEDYNAMIC,
        InstructionKind::ConditionalBranch => opcodes::IFEQ,
        InstructionKind::Switch => opcodes::TABLESWITCH,
        InstructionKind::ConstString(_) => opcodes::LDC,
        InstructionKind::Other => 0x00,
    }
}

/// Bytes of an empty public class `name` extending `java/lang/Object`.
pub(crate) fn empty_class_bytes(name: &str) -> Vec<u8> {
    fn utf8(value: &str) -> Vec<u8> {
        let mut entry = vec![1];
        entry.extend((value.len() as u16).to_be_bytes());
        entry.extend(value.as_bytes());
        entry
    }

    let mut out = Vec::new();
    out.extend(0xCAFE_BABEu32.to_be_bytes());
    out.extend(0u16.to_be_bytes());
    out.extend(52u16.to_be_bytes());
    out.extend(5u16.to_be_bytes());
    out.extend(utf8(name));
    out.extend([7, 0, 1]);
    out.extend(utf8("java/lang/Object"));
    out.extend([7, 0, 3]);
    // public super
    out.extend(0x0021u16.to_be_bytes());
    out.extend(2u16.to_be_bytes());
    out.extend(4u16.to_be_bytes());
    // interfaces, fields, methods, attributes
    out.extend([0; 8]);
    out
}
