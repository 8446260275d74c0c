use crate::constant_pool::ConstantPool;
use crate::error::FormatError;
use crate::ir::{CallKind, CallSite, DynamicCallSite, FieldRef, Instruction, InstructionKind};
use crate::opcodes;

/// Bootstrap method named by an entry of the `BootstrapMethods` attribute.
#[derive(Clone, Debug, Default)]
pub(crate) struct BootstrapMethod {
    pub(crate) owner: Option<String>,
    pub(crate) name: Option<String>,
}

/// `LineNumberTable` entries of one `Code` attribute, sorted by start offset.
#[derive(Clone, Debug, Default)]
pub(crate) struct LineTable {
    entries: Vec<(u16, u16)>,
}

impl LineTable {
    pub(crate) fn new(mut entries: Vec<(u16, u16)>) -> Self {
        entries.sort_by_key(|(start_pc, _)| *start_pc);
        Self { entries }
    }

    /// Line of the nearest entry starting at or before `offset`.
    pub(crate) fn line_at(&self, offset: usize) -> Option<u32> {
        let position = self
            .entries
            .partition_point(|(start_pc, _)| (*start_pc as usize) <= offset);
        position
            .checked_sub(1)
            .map(|index| u32::from(self.entries[index].1))
    }
}

/// Decode a method's bytecode into the ordered instruction stream.
pub(crate) fn decode(
    code: &[u8],
    pool: &ConstantPool<'_>,
    bootstrap_methods: &[BootstrapMethod],
    lines: &LineTable,
) -> Result<Vec<Instruction>, FormatError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let opcode = code[offset];
        let (kind, length) = decode_one(code, offset, opcode, pool, bootstrap_methods)?;
        if offset + length > code.len() {
            return Err(FormatError::Truncated { offset });
        }
        instructions.push(Instruction {
            offset: offset as u32,
            opcode,
            kind,
            line: lines.line_at(offset),
        });
        offset += length;
    }
    Ok(instructions)
}

fn decode_one(
    code: &[u8],
    offset: usize,
    opcode: u8,
    pool: &ConstantPool<'_>,
    bootstrap_methods: &[BootstrapMethod],
) -> Result<(InstructionKind, usize), FormatError> {
    let decoded = match opcode {
        opcodes::ILOAD..=opcodes::ALOAD => (
            InstructionKind::LoadLocal(u16::from(read_u8(code, offset + 1)?)),
            2,
        ),
        opcodes::ILOAD_0..=opcodes::ALOAD_3 => (
            InstructionKind::LoadLocal(u16::from((opcode - opcodes::ILOAD_0) % 4)),
            1,
        ),
        opcodes::ISTORE..=opcodes::ASTORE => (
            InstructionKind::StoreLocal(u16::from(read_u8(code, offset + 1)?)),
            2,
        ),
        opcodes::ISTORE_0..=opcodes::ASTORE_3 => (
            InstructionKind::StoreLocal(u16::from((opcode - opcodes::ISTORE_0) % 4)),
            1,
        ),
        opcodes::IINC => (
            InstructionKind::IncrementLocal(u16::from(read_u8(code, offset + 1)?)),
            3,
        ),
        opcodes::WIDE => decode_wide(code, offset)?,
        opcodes::GETSTATIC | opcodes::GETFIELD | opcodes::PUTSTATIC | opcodes::PUTFIELD => {
            let member = pool.field_ref(read_u16(code, offset + 1)?)?;
            let field = FieldRef {
                owner: member.owner.to_string(),
                name: member.name.to_string(),
                descriptor: member.descriptor.to_string(),
                is_static: matches!(opcode, opcodes::GETSTATIC | opcodes::PUTSTATIC),
            };
            let kind = if matches!(opcode, opcodes::GETSTATIC | opcodes::GETFIELD) {
                InstructionKind::FieldRead(field)
            } else {
                InstructionKind::FieldWrite(field)
            };
            (kind, 3)
        }
        opcodes::INVOKEVIRTUAL
        | opcodes::INVOKESPECIAL
        | opcodes::INVOKESTATIC
        | opcodes::INVOKEINTERFACE => {
            let member = pool.method_ref(read_u16(code, offset + 1)?)?;
            let kind = match opcode {
                opcodes::INVOKEVIRTUAL => CallKind::Virtual,
                opcodes::INVOKESPECIAL => CallKind::Special,
                opcodes::INVOKESTATIC => CallKind::Static,
                _ => CallKind::Interface,
            };
            let call = CallSite {
                owner: member.owner.to_string(),
                name: member.name.to_string(),
                descriptor: member.descriptor.to_string(),
                kind,
                offset: offset as u32,
            };
            let length = if opcode == opcodes::INVOKEINTERFACE { 5 } else { 3 };
            (InstructionKind::Invoke(call), length)
        }
        opcodes::INVOKEDYNAMIC => {
            let (bootstrap, name, descriptor) =
                pool.invoke_dynamic(read_u16(code, offset + 1)?)?;
            let bootstrap = bootstrap_methods.get(bootstrap as usize);
            let call = DynamicCallSite {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                bootstrap_owner: bootstrap.and_then(|method| method.owner.clone()),
                bootstrap_name: bootstrap.and_then(|method| method.name.clone()),
            };
            (InstructionKind::InvokeDynamic(call), 5)
        }
        opcodes::LDC => (
            constant_kind(pool, u16::from(read_u8(code, offset + 1)?))?,
            2,
        ),
        opcodes::LDC_W => (constant_kind(pool, read_u16(code, offset + 1)?)?, 3),
        opcodes::IFEQ..=opcodes::IF_ACMPNE | opcodes::IFNULL | opcodes::IFNONNULL => {
            (InstructionKind::ConditionalBranch, 3)
        }
        opcodes::TABLESWITCH | opcodes::LOOKUPSWITCH => {
            (InstructionKind::Switch, switch_length(code, offset, opcode)?)
        }
        _ => {
            let length = opcodes::fixed_length(opcode)
                .ok_or(FormatError::UnknownOpcode { opcode, offset })?;
            (InstructionKind::Other, length)
        }
    };
    Ok(decoded)
}

fn constant_kind(pool: &ConstantPool<'_>, index: u16) -> Result<InstructionKind, FormatError> {
    Ok(match pool.string_literal(index)? {
        Some(value) => InstructionKind::ConstString(value.to_string()),
        None => InstructionKind::Other,
    })
}

fn decode_wide(code: &[u8], offset: usize) -> Result<(InstructionKind, usize), FormatError> {
    let opcode = read_u8(code, offset + 1)?;
    let index = read_u16(code, offset + 2)?;
    let decoded = match opcode {
        opcodes::IINC => (InstructionKind::IncrementLocal(index), 6),
        opcodes::ILOAD..=opcodes::ALOAD => (InstructionKind::LoadLocal(index), 4),
        opcodes::ISTORE..=opcodes::ASTORE => (InstructionKind::StoreLocal(index), 4),
        opcodes::RET => (InstructionKind::Other, 4),
        _ => {
            return Err(FormatError::UnknownOpcode {
                opcode,
                offset: offset + 1,
            });
        }
    };
    Ok(decoded)
}

fn switch_length(code: &[u8], offset: usize, opcode: u8) -> Result<usize, FormatError> {
    let base = offset + 1 + padding(offset);
    let table_bytes = if opcode == opcodes::TABLESWITCH {
        let low = read_i32(code, base + 4)?;
        let high = read_i32(code, base + 8)?;
        let count = i64::from(high) - i64::from(low) + 1;
        if count < 0 {
            return Err(FormatError::BadSwitch { offset });
        }
        12 + 4 * count as usize
    } else {
        let pairs = read_i32(code, base + 4)?;
        if pairs < 0 {
            return Err(FormatError::BadSwitch { offset });
        }
        8 + 8 * pairs as usize
    };
    Ok(base - offset + table_bytes)
}

/// Alignment bytes after a switch opcode so its operands start on a 4-byte
/// boundary.
fn padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

fn read_u8(code: &[u8], offset: usize) -> Result<u8, FormatError> {
    code.get(offset)
        .copied()
        .ok_or(FormatError::Truncated { offset })
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16, FormatError> {
    let bytes = code
        .get(offset..offset + 2)
        .ok_or(FormatError::Truncated { offset })?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_u32(code: &[u8], offset: usize) -> Result<u32, FormatError> {
    let bytes = code
        .get(offset..offset + 4)
        .ok_or(FormatError::Truncated { offset })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32, FormatError> {
    let value = read_u32(code, offset)?;
    Ok(i32::from_be_bytes(value.to_be_bytes()))
}
