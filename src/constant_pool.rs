use jclassfile::constant_pool::ConstantPool as Entry;

use crate::error::FormatError;

/// Member reference resolved to strings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MemberRef<'a> {
    pub(crate) owner: &'a str,
    pub(crate) name: &'a str,
    pub(crate) descriptor: &'a str,
}

/// Typed lookups over the constant pool `jclassfile` decoded. Index 0 and the
/// slot after a long/double hold `Empty`, so pool indices map directly onto
/// the slice.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ConstantPool<'a> {
    entries: &'a [Entry],
}

impl<'a> ConstantPool<'a> {
    pub(crate) fn new(entries: &'a [Entry]) -> Self {
        Self { entries }
    }

    fn get(&self, index: u16) -> Option<&'a Entry> {
        self.entries.get(index as usize)
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&'a str, FormatError> {
        match self.get(index) {
            Some(Entry::Utf8 { value }) => Ok(value),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub(crate) fn class_name(&self, index: u16) -> Result<&'a str, FormatError> {
        match self.get(index) {
            Some(Entry::Class { name_index }) => self.utf8(*name_index),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "Class",
            }),
        }
    }

    pub(crate) fn name_and_type(&self, index: u16) -> Result<(&'a str, &'a str), FormatError> {
        match self.get(index) {
            Some(Entry::NameAndType {
                name_index,
                descriptor_index,
            }) => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    pub(crate) fn field_ref(&self, index: u16) -> Result<MemberRef<'a>, FormatError> {
        match self.get(index) {
            Some(Entry::Fieldref {
                class_index,
                name_and_type_index,
            }) => self.member_ref(*class_index, *name_and_type_index),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "Fieldref",
            }),
        }
    }

    /// Method or interface method reference.
    pub(crate) fn method_ref(&self, index: u16) -> Result<MemberRef<'a>, FormatError> {
        match self.get(index) {
            Some(Entry::Methodref {
                class_index,
                name_and_type_index,
            })
            | Some(Entry::InterfaceMethodref {
                class_index,
                name_and_type_index,
            }) => self.member_ref(*class_index, *name_and_type_index),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "Methodref",
            }),
        }
    }

    fn member_ref(
        &self,
        class_index: u16,
        name_and_type_index: u16,
    ) -> Result<MemberRef<'a>, FormatError> {
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            owner,
            name,
            descriptor,
        })
    }

    /// String literal for an `ldc` operand, or `None` for other loadable
    /// constants.
    pub(crate) fn string_literal(&self, index: u16) -> Result<Option<&'a str>, FormatError> {
        match self.get(index) {
            Some(Entry::String { string_index }) => self.utf8(*string_index).map(Some),
            Some(Entry::Empty) | None => Err(FormatError::BadConstant {
                index,
                expected: "loadable constant",
            }),
            Some(_) => Ok(None),
        }
    }

    /// Bootstrap attribute index, name and descriptor of an `invokedynamic`
    /// operand.
    pub(crate) fn invoke_dynamic(&self, index: u16) -> Result<(u16, &'a str, &'a str), FormatError> {
        match self.get(index) {
            Some(Entry::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            }) => {
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok((*bootstrap_method_attr_index, name, descriptor))
            }
            _ => Err(FormatError::BadConstant {
                index,
                expected: "InvokeDynamic",
            }),
        }
    }

    /// Target of a method handle, used to name bootstrap methods.
    pub(crate) fn method_handle(&self, index: u16) -> Result<MemberRef<'a>, FormatError> {
        match self.get(index) {
            Some(Entry::MethodHandle {
                reference_index, ..
            }) => self.method_ref(*reference_index),
            _ => Err(FormatError::BadConstant {
                index,
                expected: "MethodHandle",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<Entry> {
        vec![
            Entry::Empty,
            Entry::Utf8 {
                value: "com/example/Repo".to_string(),
            },
            Entry::Class { name_index: 1 },
            Entry::Utf8 {
                value: "find".to_string(),
            },
            Entry::Utf8 {
                value: "(I)Ljava/lang/String;".to_string(),
            },
            Entry::NameAndType {
                name_index: 3,
                descriptor_index: 4,
            },
            Entry::Methodref {
                class_index: 2,
                name_and_type_index: 5,
            },
            Entry::String { string_index: 3 },
            Entry::Long { value: 7 },
            Entry::Empty,
        ]
    }

    #[test]
    fn method_refs_resolve_through_class_and_name_and_type() {
        let entries = entries();
        let pool = ConstantPool::new(&entries);

        let member = pool.method_ref(6).expect("method ref");

        assert_eq!("com/example/Repo", member.owner);
        assert_eq!("find", member.name);
        assert_eq!("(I)Ljava/lang/String;", member.descriptor);
    }

    #[test]
    fn string_literals_distinguish_other_constants() {
        let entries = entries();
        let pool = ConstantPool::new(&entries);

        assert_eq!(Ok(Some("find")), pool.string_literal(7));
        assert_eq!(Ok(None), pool.string_literal(8));
        assert!(pool.string_literal(9).is_err());
        assert!(pool.string_literal(42).is_err());
    }

    #[test]
    fn wrong_entry_kind_is_a_format_error() {
        let entries = entries();
        let pool = ConstantPool::new(&entries);

        assert_eq!(
            Err(FormatError::BadConstant {
                index: 6,
                expected: "Fieldref"
            }),
            pool.field_ref(6)
        );
        assert!(pool.class_name(0).is_err());
    }
}
