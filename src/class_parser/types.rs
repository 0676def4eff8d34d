use crate::class_parser::constants::Constant;

pub type U1 = u8;
pub type U2 = u16;
pub type U4 = u32;

/// A class file decoded structurally but not yet linked: all cross references
/// are still raw 1-based constant-pool indices.
#[derive(Debug)]
pub struct RawClass {
    pub minor_version: U2,
    pub major_version: U2,
    pub constant_pool: Vec<Constant>, // constant_pool_count - 1 slots, holes included
    pub access_flags: U2,
    pub this_class: U2,
    pub super_class: U2,
    pub interfaces: Vec<U2>,
    pub fields: Vec<RawMember>,
    pub methods: Vec<RawMember>,
    pub attributes: Vec<RawAttribute>,
}

/// Field and method records share one shape in the format.
#[derive(Debug)]
pub struct RawMember {
    pub access_flags: U2,
    pub name_index: U2,
    pub descriptor_index: U2,
    pub attributes: Vec<RawAttribute>,
}

#[derive(Debug)]
pub struct RawAttribute {
    pub name_index: U2,
    pub payload: Vec<u8>,
}
