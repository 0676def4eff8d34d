use std::fs;
use std::io::Cursor;
use std::rc::Rc;

use crate::class_parser::be_reader::BEReader;
use crate::class_parser::parse_class;
use crate::class_parser::types::{RawAttribute, RawClass, RawMember};
use crate::class_parser::constants::ACC_STATIC;
use crate::error::VmError;
use crate::helper::has_flag;
use crate::vm::class::class::{Class, ClassId, MethodId};
use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::{descriptor_size, Field, FieldSlot};
use crate::vm::class::method::{Code, Method};
use crate::vm::value::ValueKind;
use crate::vm::vm::Vm;

pub mod bootstrap;
pub mod native;
pub mod resolve;

/// Attributes recognized by this VM. Anything else in a class file fails
/// the load.
enum Attribute {
    Code(Code),
    SourceFile(String),
}

fn link_attribute(pool: &ConstantPool, raw: &RawAttribute) -> Result<Attribute, VmError> {
    let name = pool.utf8(raw.name_index)?;
    match name {
        "Code" => {
            let mut cursor = Cursor::new(raw.payload.as_slice());
            let max_stack = cursor.read_u2()? as usize;
            let max_locals = cursor.read_u2()? as usize;
            let code_length = cursor.read_u4()? as usize;
            let code = cursor.read_bytes(code_length)?;
            // Exception tables and nested attributes may follow; they are
            // outside the supported format and left unread.
            Ok(Attribute::Code(Code {
                max_stack,
                max_locals,
                code: code.into(),
            }))
        }
        "SourceFile" => {
            let mut cursor = Cursor::new(raw.payload.as_slice());
            let index = cursor.read_u2()?;
            Ok(Attribute::SourceFile(pool.resolve_text(index)?.to_string()))
        }
        other => Err(VmError::UnknownAttributeType(other.to_string())),
    }
}

fn link_member_attributes(
    pool: &ConstantPool,
    member: &RawMember,
) -> Result<(Option<Code>, Option<String>), VmError> {
    let mut code = None;
    let mut source_file = None;
    for raw in &member.attributes {
        match link_attribute(pool, raw)? {
            Attribute::Code(c) => code = Some(c),
            Attribute::SourceFile(s) => source_file = Some(s),
        }
    }
    Ok((code, source_file))
}

impl Vm {
    /// Loads and links a class by name, exactly once per name: a registry
    /// hit returns the already-linked descriptor. A miss reads
    /// `<class_path>/<name>.class` and runs the full link, recursing for the
    /// superclass. Failed loads register nothing.
    pub fn load_class(&mut self, name: &str) -> Result<ClassId, VmError> {
        if let Some(id) = self.arena.lookup(name) {
            return Ok(id);
        }

        if !self.loading.insert(name.to_string()) {
            return Err(VmError::CircularInheritance(name.to_string()));
        }
        let result = self.load_class_file(name);
        self.loading.remove(name);
        result
    }

    fn load_class_file(&mut self, name: &str) -> Result<ClassId, VmError> {
        let path = self.class_path.join(format!("{}.class", name));
        let data = fs::read(&path).map_err(|_| VmError::ClassNotFound(name.to_string()))?;
        self.define_class(&data)
    }

    /// Parses and links a class from raw bytes, registering it under its
    /// resolved name. Exposed separately so callers (and tests) can define
    /// classes without touching the filesystem.
    pub fn define_class(&mut self, data: &[u8]) -> Result<ClassId, VmError> {
        let raw = parse_class(data)?;
        self.link_class(raw)
    }

    fn link_class(&mut self, raw: RawClass) -> Result<ClassId, VmError> {
        let pool = Rc::new(ConstantPool::from_entries(raw.constant_pool));

        let name = pool.class_name(raw.this_class)?.to_string();
        let super_name = pool.class_name(raw.super_class)?.to_string();
        let super_id = self.load_class(&super_name)?;

        let mut interfaces = Vec::with_capacity(raw.interfaces.len());
        for index in &raw.interfaces {
            interfaces.push(pool.class_name(*index)?.to_string());
        }

        // Instance layout continues where the superclass's ends, so an
        // instance of this class is layout-compatible with its supertype.
        let mut offset = self.arena.get(super_id).instance_size;
        let mut fields = Vec::with_capacity(raw.fields.len());
        for rf in &raw.fields {
            let fname = pool.utf8(rf.name_index)?.to_string();
            let descriptor = pool.utf8(rf.descriptor_index)?.to_string();
            let (_, source_file) = link_member_attributes(&pool, rf)?;

            // Statics live in a boxed value slot and take no instance bytes.
            let slot = if has_flag(rf.access_flags, ACC_STATIC) {
                FieldSlot::Static(ValueKind::from_descriptor(&descriptor)?.default_value())
            } else {
                let at = offset;
                offset += descriptor_size(&descriptor)?;
                FieldSlot::Instance { offset: at }
            };
            fields.push(Field {
                flags: rf.access_flags,
                name: fname,
                descriptor,
                slot,
                source_file,
            });
        }
        let instance_size = offset;

        // The class's id is known before registration; dispatch-table
        // entries for its own methods point at it.
        let self_id = self.arena.next_id();
        let mut vtable: Vec<MethodId> = self.arena.get(super_id).vtable.clone();
        let mut methods = Vec::with_capacity(raw.methods.len());
        for (index, rm) in raw.methods.iter().enumerate() {
            let mname = pool.utf8(rm.name_index)?.to_string();
            let descriptor = pool.utf8(rm.descriptor_index)?.to_string();
            let (code, source_file) = link_member_attributes(&pool, rm)?;

            let mut method = Method {
                flags: rm.access_flags,
                name: mname,
                descriptor,
                vtable_slot: None,
                code,
                source_file,
            };

            // Constructors never enter the dispatch table. Everything else
            // either overrides the inherited slot with the same
            // name+descriptor or claims a fresh one; slots are stable once
            // assigned and shared with every subtype.
            if !method.name.starts_with('<') {
                let matched = vtable.iter().position(|&entry| {
                    let (entry_name, entry_desc) = if entry.class == self_id {
                        let m: &Method = &methods[entry.index];
                        (&m.name, &m.descriptor)
                    } else {
                        let m = self.arena.method(entry);
                        (&m.name, &m.descriptor)
                    };
                    *entry_name == method.name && *entry_desc == method.descriptor
                });

                let entry = MethodId {
                    class: self_id,
                    index,
                };
                match matched {
                    Some(slot) => {
                        vtable[slot] = entry;
                        method.vtable_slot = Some(slot);
                    }
                    None => {
                        method.vtable_slot = Some(vtable.len());
                        vtable.push(entry);
                    }
                }
            }
            methods.push(method);
        }

        let mut source_file = None;
        for raw_attr in &raw.attributes {
            if let Attribute::SourceFile(s) = link_attribute(&pool, raw_attr)? {
                source_file = Some(s);
            }
        }

        let id = self.arena.register(Class {
            name,
            super_class: Some(super_id),
            flags: raw.access_flags,
            instance_size,
            interfaces,
            fields,
            methods,
            vtable,
            constant_pool: pool,
            source_file,
        });
        debug_assert_eq!(id, self_id);
        Ok(id)
    }
}
