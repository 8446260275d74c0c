use jclassfile::attributes::Attribute;
use jclassfile::class_file::{self, ClassFile, ClassFlags};
use jclassfile::fields::{FieldFlags, FieldInfo};
use jclassfile::methods::{MethodFlags, MethodInfo};
use tracing::debug;

use crate::bytecode::{self, BootstrapMethod, LineTable};
use crate::constant_pool::ConstantPool;
use crate::descriptor;
use crate::error::{FormatError, LoadError};
use crate::ir::{
    Class, ClassAccess, Field, FieldAccess, LocalVariable, Method, MethodAccess, Visibility,
};

/// Load one compiled unit into the structural model.
///
/// `jclassfile` parses the bytes; anything it rejects, or any reference the
/// model builder cannot follow, is a `LoadError` for this unit only.
pub fn load_class(unit: &str, data: &[u8]) -> Result<Class, LoadError> {
    let class_file = class_file::parse(data).map_err(|err| LoadError::Rejected {
        unit: unit.to_string(),
        reason: err.to_string(),
    })?;
    let class = build_class(&class_file).map_err(|source| LoadError::Malformed {
        unit: unit.to_string(),
        source,
    })?;
    debug!(
        unit,
        class = %class.name,
        methods = class.methods.len(),
        "loaded class"
    );
    Ok(class)
}

fn build_class(class_file: &ClassFile) -> Result<Class, FormatError> {
    let pool = ConstantPool::new(class_file.constant_pool());

    let name = pool.class_name(class_file.this_class())?.to_string();
    let super_name = match class_file.super_class() {
        0 => None,
        index => Some(pool.class_name(index)?.to_string()),
    };
    let interfaces = class_file
        .interfaces()
        .iter()
        .map(|index| pool.class_name(*index).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    let fields = class_file
        .fields()
        .iter()
        .map(|field| build_field(field, pool))
        .collect::<Result<Vec<_>, _>>()?;

    // `invokedynamic` operands point into the class-level attribute.
    let bootstrap_methods = bootstrap_methods(class_file.attributes(), pool);
    let methods = class_file
        .methods()
        .iter()
        .map(|method| build_method(method, pool, &bootstrap_methods))
        .collect::<Result<Vec<_>, _>>()?;

    let source_file = class_file
        .attributes()
        .iter()
        .find_map(|attribute| match attribute {
            Attribute::SourceFile { sourcefile_index } => Some(*sourcefile_index),
            _ => None,
        })
        .map(|index| pool.utf8(index).map(str::to_string))
        .transpose()?;

    Ok(Class {
        name,
        super_name,
        interfaces,
        access: class_access(class_file.access_flags()),
        source_file,
        fields,
        methods,
    })
}

fn build_field(field: &FieldInfo, pool: ConstantPool<'_>) -> Result<Field, FormatError> {
    let flags = field.access_flags();
    let field_descriptor = pool.utf8(field.descriptor_index())?.to_string();
    let has_constant_value = field
        .attributes()
        .iter()
        .any(|attribute| matches!(attribute, Attribute::ConstantValue { .. }));
    let synthetic_attribute = field
        .attributes()
        .iter()
        .any(|attribute| matches!(attribute, Attribute::Synthetic));
    Ok(Field {
        name: pool.utf8(field.name_index())?.to_string(),
        type_name: descriptor::type_name(&field_descriptor),
        descriptor: field_descriptor,
        access: FieldAccess {
            visibility: visibility(
                flags.contains(FieldFlags::ACC_PUBLIC),
                flags.contains(FieldFlags::ACC_PRIVATE),
                flags.contains(FieldFlags::ACC_PROTECTED),
            ),
            is_static: flags.contains(FieldFlags::ACC_STATIC),
            is_final: flags.contains(FieldFlags::ACC_FINAL),
            is_synthetic: flags.contains(FieldFlags::ACC_SYNTHETIC) || synthetic_attribute,
        },
        has_constant_value,
    })
}

fn build_method(
    method: &MethodInfo,
    pool: ConstantPool<'_>,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<Method, FormatError> {
    let flags = method.access_flags();
    let mut instructions = Vec::new();
    let mut local_variables = Vec::new();
    let mut synthetic_attribute = false;
    for attribute in method.attributes() {
        match attribute {
            Attribute::Code {
                code, attributes, ..
            } => {
                let (lines, locals) = debug_tables(attributes, pool)?;
                instructions = bytecode::decode(code, &pool, bootstrap_methods, &lines)?;
                local_variables = locals;
            }
            Attribute::Synthetic => synthetic_attribute = true,
            _ => {}
        }
    }
    Ok(Method {
        name: pool.utf8(method.name_index())?.to_string(),
        descriptor: pool.utf8(method.descriptor_index())?.to_string(),
        access: MethodAccess {
            visibility: visibility(
                flags.contains(MethodFlags::ACC_PUBLIC),
                flags.contains(MethodFlags::ACC_PRIVATE),
                flags.contains(MethodFlags::ACC_PROTECTED),
            ),
            is_static: flags.contains(MethodFlags::ACC_STATIC),
            is_final: flags.contains(MethodFlags::ACC_FINAL),
            is_abstract: flags.contains(MethodFlags::ACC_ABSTRACT),
            is_synthetic: flags.contains(MethodFlags::ACC_SYNTHETIC) || synthetic_attribute,
            is_bridge: flags.contains(MethodFlags::ACC_BRIDGE),
        },
        instructions,
        local_variables,
    })
}

/// Line numbers and local variables nested in a `Code` attribute.
fn debug_tables(
    attributes: &[Attribute],
    pool: ConstantPool<'_>,
) -> Result<(LineTable, Vec<LocalVariable>), FormatError> {
    let mut lines = Vec::new();
    let mut local_variables = Vec::new();
    for attribute in attributes {
        match attribute {
            Attribute::LineNumberTable { line_number_table } => lines.extend(
                line_number_table
                    .iter()
                    .map(|entry| (entry.start_pc(), entry.line_number())),
            ),
            Attribute::LocalVariableTable {
                local_variable_table,
            } => {
                for entry in local_variable_table {
                    local_variables.push(LocalVariable {
                        name: pool.utf8(entry.name_index())?.to_string(),
                        descriptor: pool.utf8(entry.descriptor_index())?.to_string(),
                        index: entry.index(),
                        start_pc: entry.start_pc(),
                        length: entry.length(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok((LineTable::new(lines), local_variables))
}

fn bootstrap_methods(attributes: &[Attribute], pool: ConstantPool<'_>) -> Vec<BootstrapMethod> {
    let Some(records) = attributes.iter().find_map(|attribute| match attribute {
        Attribute::BootstrapMethods { bootstrap_methods } => Some(bootstrap_methods),
        _ => None,
    }) else {
        return Vec::new();
    };
    records
        .iter()
        .map(|record| {
            // A handle that cannot be followed leaves the bootstrap anonymous
            // rather than failing the whole unit.
            match pool.method_handle(record.bootstrap_method_ref()) {
                Ok(target) => BootstrapMethod {
                    owner: Some(target.owner.to_string()),
                    name: Some(target.name.to_string()),
                },
                Err(_) => BootstrapMethod::default(),
            }
        })
        .collect()
}

fn visibility(is_public: bool, is_private: bool, is_protected: bool) -> Visibility {
    if is_public {
        Visibility::Public
    } else if is_private {
        Visibility::Private
    } else if is_protected {
        Visibility::Protected
    } else {
        Visibility::Package
    }
}

fn class_access(flags: &ClassFlags) -> ClassAccess {
    ClassAccess {
        is_public: flags.contains(ClassFlags::ACC_PUBLIC),
        is_final: flags.contains(ClassFlags::ACC_FINAL),
        is_interface: flags.contains(ClassFlags::ACC_INTERFACE),
        is_abstract: flags.contains(ClassFlags::ACC_ABSTRACT),
        is_synthetic: flags.contains(ClassFlags::ACC_SYNTHETIC),
        is_annotation: flags.contains(ClassFlags::ACC_ANNOTATION),
        is_enum: flags.contains(ClassFlags::ACC_ENUM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldAccessKind, InstructionKind};

    /// Minimal class-file writer for loader tests.
    #[derive(Default)]
    struct ClassBytes {
        pool: Vec<Vec<u8>>,
    }

    impl ClassBytes {
        fn push(&mut self, entry: Vec<u8>) -> u16 {
            self.pool.push(entry);
            self.pool.len() as u16
        }

        fn utf8(&mut self, value: &str) -> u16 {
            let encoded = modified_utf8(value);
            let mut entry = vec![1];
            entry.extend((encoded.len() as u16).to_be_bytes());
            entry.extend(encoded);
            self.push(entry)
        }

        fn class(&mut self, name: &str) -> u16 {
            let name = self.utf8(name);
            let mut entry = vec![7];
            entry.extend(name.to_be_bytes());
            self.push(entry)
        }

        fn string(&mut self, value: &str) -> u16 {
            let value = self.utf8(value);
            let mut entry = vec![8];
            entry.extend(value.to_be_bytes());
            self.push(entry)
        }

        fn field_ref(&mut self, owner: u16, name: &str, descriptor: &str) -> u16 {
            let name = self.utf8(name);
            let descriptor = self.utf8(descriptor);
            let mut name_and_type = vec![12];
            name_and_type.extend(name.to_be_bytes());
            name_and_type.extend(descriptor.to_be_bytes());
            let name_and_type = self.push(name_and_type);
            let mut entry = vec![9];
            entry.extend(owner.to_be_bytes());
            entry.extend(name_and_type.to_be_bytes());
            self.push(entry)
        }

        fn long(&mut self, value: i64) -> u16 {
            let mut entry = vec![5];
            entry.extend(value.to_be_bytes());
            let index = self.push(entry);
            // The slot after a long is unusable; the writer emits nothing for it.
            self.pool.push(Vec::new());
            index
        }

        fn finish(self, body: &[u8]) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend(0xCAFE_BABEu32.to_be_bytes());
            out.extend(0u16.to_be_bytes());
            out.extend(61u16.to_be_bytes());
            out.extend((self.pool.len() as u16 + 1).to_be_bytes());
            for entry in &self.pool {
                out.extend(entry);
            }
            out.extend(body);
            out
        }
    }

    /// Class-file strings: NUL takes two bytes and supplementary characters
    /// are written as two three-byte surrogates.
    fn modified_utf8(value: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for unit in value.encode_utf16() {
            match unit {
                0x0001..=0x007F => out.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    out.push(0xC0 | (unit >> 6) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    out.push(0xE0 | (unit >> 12) as u8);
                    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }
        out
    }

    fn attribute(name: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(name.to_be_bytes());
        out.extend((body.len() as u32).to_be_bytes());
        out.extend(body);
        out
    }

    fn code_attribute(name: u16, code: &[u8], nested: &[Vec<u8>]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend((code.len() as u32).to_be_bytes());
        body.extend(code);
        body.extend(0u16.to_be_bytes());
        body.extend((nested.len() as u16).to_be_bytes());
        for attribute in nested {
            body.extend(attribute);
        }
        attribute(name, &body)
    }

    fn sample_class() -> Vec<u8> {
        let mut bytes = ClassBytes::default();
        let this = bytes.class("com/example/Account");
        let object = bytes.class("java/lang/Object");
        let closeable = bytes.class("java/io/Closeable");
        let balance = bytes.field_ref(this, "balance", "J");
        let secret = bytes.string("token=abc123");
        bytes.long(42);
        let balance_name = bytes.utf8("balance");
        let long_descriptor = bytes.utf8("J");
        let method_name = bytes.utf8("balance");
        let method_descriptor = bytes.utf8("()J");
        let code_name = bytes.utf8("Code");
        let lines_name = bytes.utf8("LineNumberTable");
        let locals_name = bytes.utf8("LocalVariableTable");
        let this_name = bytes.utf8("this");
        let this_descriptor = bytes.utf8("Lcom/example/Account;");
        let source_name = bytes.utf8("SourceFile");
        let source_value = bytes.utf8("Account.java");

        let mut body = Vec::new();
        body.extend((ClassFlags::ACC_PUBLIC | ClassFlags::ACC_FINAL).bits().to_be_bytes());
        body.extend(this.to_be_bytes());
        body.extend(object.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend(closeable.to_be_bytes());

        // private long balance;
        body.extend(1u16.to_be_bytes());
        body.extend(FieldFlags::ACC_PRIVATE.bits().to_be_bytes());
        body.extend(balance_name.to_be_bytes());
        body.extend(long_descriptor.to_be_bytes());
        body.extend(0u16.to_be_bytes());

        // public long balance() { "token=abc123"; return this.balance; }
        let code = [
            0x12,
            secret as u8,
            0x57,
            0x2a,
            0xb4,
            (balance >> 8) as u8,
            balance as u8,
            0xad,
        ];
        let mut lines = Vec::new();
        lines.extend(1u16.to_be_bytes());
        lines.extend(0u16.to_be_bytes());
        lines.extend(7u16.to_be_bytes());
        let mut locals = Vec::new();
        locals.extend(1u16.to_be_bytes());
        locals.extend(0u16.to_be_bytes());
        locals.extend((code.len() as u16).to_be_bytes());
        locals.extend(this_name.to_be_bytes());
        locals.extend(this_descriptor.to_be_bytes());
        locals.extend(0u16.to_be_bytes());

        body.extend(1u16.to_be_bytes());
        body.extend(MethodFlags::ACC_PUBLIC.bits().to_be_bytes());
        body.extend(method_name.to_be_bytes());
        body.extend(method_descriptor.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend(code_attribute(
            code_name,
            &code,
            &[attribute(lines_name, &lines), attribute(locals_name, &locals)],
        ));

        body.extend(1u16.to_be_bytes());
        body.extend(attribute(source_name, &source_value.to_be_bytes()));

        bytes.finish(&body)
    }

    /// `static void literals()` that loads and drops each string, with
    /// `code` appended before the final `return`.
    fn literal_class(literals: &[&str], code: &[u8]) -> Vec<u8> {
        let mut bytes = ClassBytes::default();
        let this = bytes.class("com/example/Config");
        let object = bytes.class("java/lang/Object");
        let strings: Vec<u16> = literals.iter().map(|value| bytes.string(value)).collect();
        let method_name = bytes.utf8("literals");
        let method_descriptor = bytes.utf8("()V");
        let code_name = bytes.utf8("Code");

        let mut body = Vec::new();
        body.extend(ClassFlags::ACC_PUBLIC.bits().to_be_bytes());
        body.extend(this.to_be_bytes());
        body.extend(object.to_be_bytes());
        body.extend(0u16.to_be_bytes());
        body.extend(0u16.to_be_bytes());

        let mut method_code = Vec::new();
        for index in strings {
            method_code.extend([0x13, (index >> 8) as u8, index as u8, 0x57]);
        }
        method_code.extend(code);
        method_code.push(0xb1);

        body.extend(1u16.to_be_bytes());
        body.extend(MethodFlags::ACC_STATIC.bits().to_be_bytes());
        body.extend(method_name.to_be_bytes());
        body.extend(method_descriptor.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend(code_attribute(code_name, &method_code, &[]));
        body.extend(0u16.to_be_bytes());

        bytes.finish(&body)
    }

    fn string_constants(class: &Class) -> Vec<&str> {
        class.methods[0]
            .instructions
            .iter()
            .filter_map(|instruction| match &instruction.kind {
                InstructionKind::ConstString(value) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn decodes_class_structure() {
        let class = load_class("Account.class", &sample_class()).expect("load class");

        assert_eq!("com/example/Account", class.name);
        assert_eq!(Some("java/lang/Object"), class.super_name.as_deref());
        assert_eq!(vec!["java/io/Closeable".to_string()], class.interfaces);
        assert!(class.access.is_public && class.access.is_final);
        assert_eq!(Some("Account.java"), class.source_file.as_deref());

        let field = &class.fields[0];
        assert_eq!("balance", field.name);
        assert_eq!("long", field.type_name);
        assert!(field.is_private());
        assert!(!field.has_constant_value);
    }

    #[test]
    fn decodes_method_bodies_with_debug_info() {
        let class = load_class("Account.class", &sample_class()).expect("load class");
        let method = &class.methods[0];

        assert_eq!("balance", method.name);
        assert_eq!(5, method.instructions.len());
        assert!(matches!(
            &method.instructions[0].kind,
            InstructionKind::ConstString(value) if value == "token=abc123"
        ));
        assert!(
            method
                .instructions
                .iter()
                .all(|instruction| instruction.line == Some(7))
        );
        let accesses: Vec<_> = method.field_accesses().collect();
        assert_eq!(1, accesses.len());
        assert_eq!("balance", accesses[0].0.name);
        assert_eq!(FieldAccessKind::Read, accesses[0].1);
        assert_eq!("this", method.local_variables[0].name);
    }

    #[test]
    fn string_literals_keep_nul_and_supplementary_characters() {
        let bytes = literal_class(&["token=\u{1F600}abcdef", "pass\u{0}word=xyz12345"], &[]);

        let class = load_class("Config.class", &bytes).expect("load class");

        assert_eq!(
            vec!["token=\u{1F600}abcdef", "pass\u{0}word=xyz12345"],
            string_constants(&class)
        );
    }

    #[test]
    fn bytecode_with_a_dangling_pool_reference_is_malformed() {
        // getstatic #1, where #1 is a Utf8 entry.
        let bytes = literal_class(&[], &[0xb2, 0x00, 0x01, 0x57]);

        let error = load_class("Config.class", &bytes).unwrap_err();

        assert!(matches!(
            error,
            LoadError::Malformed {
                source: FormatError::BadConstant { index: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn truncated_class_is_rejected() {
        let bytes = sample_class();

        let error = load_class("Account.class", &bytes[..bytes.len() - 3]).unwrap_err();

        assert!(matches!(error, LoadError::Rejected { .. }));
        assert_eq!("Account.class", error.unit());
    }

    #[test]
    fn non_class_bytes_fail_to_load() {
        let error = load_class("broken.class", b"nope").unwrap_err();

        assert_eq!("broken.class", error.unit());
    }
}
