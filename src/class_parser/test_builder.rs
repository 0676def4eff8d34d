//! Emits well-formed class-file bytes for tests, so loader and interpreter
//! tests can run end to end without fixture files on disk.

use crate::class_parser::CLASS_MAGIC;

pub struct ClassFileBuilder {
    // Encoded pool entries; long/double blobs cover two index slots.
    constants: Vec<Vec<u8>>,
    next_index: u16,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    pub fn new(this: &str, super_: &str) -> Self {
        let mut b = ClassFileBuilder {
            constants: vec![],
            next_index: 1,
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        };
        b.this_class = b.class(this);
        b.super_class = b.class(super_);
        b
    }

    fn push_entry(&mut self, encoded: Vec<u8>, slots: u16) -> u16 {
        let index = self.next_index;
        self.constants.push(encoded);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        let mut e = vec![1];
        e.extend_from_slice(&(s.len() as u16).to_be_bytes());
        e.extend_from_slice(s.as_bytes());
        self.push_entry(e, 1)
    }

    pub fn long(&mut self, v: i64) -> u16 {
        let mut e = vec![5];
        e.extend_from_slice(&(v as u64).to_be_bytes());
        self.push_entry(e, 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        let mut e = vec![7];
        e.extend_from_slice(&name_index.to_be_bytes());
        self.push_entry(e, 1)
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string_index = self.utf8(s);
        let mut e = vec![8];
        e.extend_from_slice(&string_index.to_be_bytes());
        self.push_entry(e, 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut e = vec![12];
        e.extend_from_slice(&name_index.to_be_bytes());
        e.extend_from_slice(&descriptor_index.to_be_bytes());
        self.push_entry(e, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let nat_index = self.name_and_type(name, descriptor);
        let mut e = vec![tag];
        e.extend_from_slice(&class_index.to_be_bytes());
        e.extend_from_slice(&nat_index.to_be_bytes());
        self.push_entry(e, 1)
    }

    pub fn fieldref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, class, name, descriptor)
    }

    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, class, name, descriptor)
    }

    pub fn field(&mut self, flags: u16, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut r = vec![];
        r.extend_from_slice(&flags.to_be_bytes());
        r.extend_from_slice(&name_index.to_be_bytes());
        r.extend_from_slice(&descriptor_index.to_be_bytes());
        r.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
        self.fields.push(r);
    }

    /// A method with a Code attribute carrying the given bytecode.
    pub fn method(
        &mut self,
        flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let code_attr_name = self.utf8("Code");

        let mut payload = vec![];
        payload.extend_from_slice(&max_stack.to_be_bytes());
        payload.extend_from_slice(&max_locals.to_be_bytes());
        payload.extend_from_slice(&(code.len() as u32).to_be_bytes());
        payload.extend_from_slice(code);

        let mut r = vec![];
        r.extend_from_slice(&flags.to_be_bytes());
        r.extend_from_slice(&name_index.to_be_bytes());
        r.extend_from_slice(&descriptor_index.to_be_bytes());
        r.extend_from_slice(&1u16.to_be_bytes());
        r.extend_from_slice(&code_attr_name.to_be_bytes());
        r.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        r.extend_from_slice(&payload);
        self.methods.push(r);
    }

    /// A method record with no attributes at all (no Code).
    pub fn method_without_code(&mut self, flags: u16, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut r = vec![];
        r.extend_from_slice(&flags.to_be_bytes());
        r.extend_from_slice(&name_index.to_be_bytes());
        r.extend_from_slice(&descriptor_index.to_be_bytes());
        r.extend_from_slice(&0u16.to_be_bytes());
        self.methods.push(r);
    }

    pub fn build(self) -> Vec<u8> {
        let mut buf = CLASS_MAGIC.to_be_bytes().to_vec();
        buf.extend_from_slice(&0u16.to_be_bytes()); // minor
        buf.extend_from_slice(&52u16.to_be_bytes()); // major

        buf.extend_from_slice(&self.next_index.to_be_bytes()); // slots + 1
        for entry in &self.constants {
            buf.extend_from_slice(entry);
        }

        buf.extend_from_slice(&self.access_flags.to_be_bytes());
        buf.extend_from_slice(&self.this_class.to_be_bytes());
        buf.extend_from_slice(&self.super_class.to_be_bytes());

        buf.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for i in &self.interfaces {
            buf.extend_from_slice(&i.to_be_bytes());
        }

        buf.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for f in &self.fields {
            buf.extend_from_slice(f);
        }

        buf.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for m in &self.methods {
            buf.extend_from_slice(m);
        }

        buf.extend_from_slice(&0u16.to_be_bytes()); // class attributes
        buf
    }
}
