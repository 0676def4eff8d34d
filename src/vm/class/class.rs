use std::collections::HashMap;
use std::rc::Rc;

use crate::vm::class::constant_pool::ConstantPool;
use crate::vm::class::field::Field;
use crate::vm::class::method::Method;

/// Handle to a linked class in the arena. Handles are never invalidated:
/// classes are loaded once and live until the process exits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClassId(pub usize);

/// Handle to one method record. Dispatch tables are sequences of these, so
/// slot sharing between a type and its subtypes is plain handle aliasing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MethodId {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldId {
    pub class: ClassId,
    pub index: usize,
}

/// A fully linked type descriptor. `instance_size` and instance-field
/// offsets account for inherited fields: the first `super.instance_size`
/// bytes of any instance mirror the superclass's own layout.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub flags: u16,
    pub instance_size: usize,
    pub interfaces: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub vtable: Vec<MethodId>,
    pub constant_pool: Rc<ConstantPool>,
    pub source_file: Option<String>,
}

impl Class {
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.methods
            .iter()
            .position(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn find_method_named(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name == name)
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name && f.descriptor == descriptor)
    }
}

/// Process-wide store of every linked class, addressed by stable handles.
/// Registration is always the last step of a load, so a partially linked
/// class is never observable here.
#[derive(Debug, Default)]
pub struct ClassArena {
    classes: Vec<Class>,
    by_name: HashMap<String, ClassId>,
}

impl ClassArena {
    pub fn new() -> ClassArena {
        ClassArena::default()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// The id the next registered class will receive; the linker uses it to
    /// seed dispatch-table entries that point back into the class being built.
    pub fn next_id(&self) -> ClassId {
        ClassId(self.classes.len())
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn register(&mut self, class: Class) -> ClassId {
        let id = ClassId(self.classes.len());
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        id
    }

    pub fn get(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.0]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.classes[id.class.0].methods[id.index]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.classes[id.class.0].fields[id.index]
    }

    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.classes[id.class.0].fields[id.index]
    }
}
