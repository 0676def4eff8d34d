use std::io::Cursor;

use crate::class_parser::be_reader::BEReader;
use crate::class_parser::constants::{CPTag, Constant};
use crate::class_parser::types::{RawAttribute, RawClass, RawMember};
use crate::error::VmError;

pub mod be_reader;
pub mod constants;
#[cfg(test)]
pub mod test_builder;
pub mod types;

pub const CLASS_MAGIC: u32 = 0xcafebabe;

fn parse_constant(reader: &mut impl BEReader, pool: &mut Vec<Constant>) -> Result<(), VmError> {
    let tag = reader.read_u1()?;
    let tag = CPTag::try_from(tag).map_err(|_| VmError::UnsupportedConstantTag(tag))?;

    match tag {
        CPTag::Utf8 => {
            let length = reader.read_u2()? as usize;
            pool.push(Constant::Utf8(reader.read_str(length)?));
        }
        CPTag::Integer => pool.push(Constant::Integer(reader.read_u4()? as i32)),
        CPTag::Float => pool.push(Constant::Float(f32::from_bits(reader.read_u4()?))),
        CPTag::Long => {
            let hi = reader.read_u4()? as u64;
            let lo = reader.read_u4()? as u64;
            pool.push(Constant::Long((hi << 32 | lo) as i64));
            pool.push(Constant::Hole);
        }
        CPTag::Double => {
            let hi = reader.read_u4()? as u64;
            let lo = reader.read_u4()? as u64;
            pool.push(Constant::Double(f64::from_bits(hi << 32 | lo)));
            pool.push(Constant::Hole);
        }
        CPTag::Class => pool.push(Constant::Class {
            name_index: reader.read_u2()?,
        }),
        CPTag::String => pool.push(Constant::String {
            string_index: reader.read_u2()?,
        }),
        CPTag::Fieldref => pool.push(Constant::Fieldref {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        }),
        CPTag::Methodref => pool.push(Constant::Methodref {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        }),
        CPTag::NameAndType => pool.push(Constant::NameAndType {
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
        }),
    }

    Ok(())
}

fn parse_attribute(reader: &mut impl BEReader) -> Result<RawAttribute, VmError> {
    let name_index = reader.read_u2()?;
    let length = reader.read_u4()? as usize;

    Ok(RawAttribute {
        name_index,
        payload: reader.read_bytes(length)?,
    })
}

fn parse_member(reader: &mut impl BEReader) -> Result<RawMember, VmError> {
    let access_flags = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;

    let attributes_count = reader.read_u2()?;
    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attribute(reader)?);
    }

    Ok(RawMember {
        access_flags,
        name_index,
        descriptor_index,
        attributes,
    })
}

/// Decodes the fixed class-file layout: magic, versions, constant pool,
/// flags, this/super, interfaces, fields, methods, class attributes. All
/// symbolic linking happens later in the class loader.
pub fn parse_class(buf: &[u8]) -> Result<RawClass, VmError> {
    let mut cursor = Cursor::new(buf);

    let magic = cursor.read_u4()?;
    if magic != CLASS_MAGIC {
        return Err(VmError::BadMagic(magic));
    }

    let minor_version = cursor.read_u2()?;
    let major_version = cursor.read_u2()?;

    // The stored count is one past the number of pool slots; long and double
    // entries occupy two slots each.
    let constant_pool_count = cursor.read_u2()?.saturating_sub(1) as usize;
    let mut constant_pool = Vec::with_capacity(constant_pool_count);
    while constant_pool.len() < constant_pool_count {
        parse_constant(&mut cursor, &mut constant_pool)?;
    }

    let access_flags = cursor.read_u2()?;
    let this_class = cursor.read_u2()?;
    let super_class = cursor.read_u2()?;

    let interfaces_count = cursor.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(cursor.read_u2()?);
    }

    let fields_count = cursor.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        fields.push(parse_member(&mut cursor)?);
    }

    let methods_count = cursor.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(parse_member(&mut cursor)?);
    }

    let attributes_count = cursor.read_u2()?;
    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attribute(&mut cursor)?);
    }

    Ok(RawClass {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_parser::test_builder::ClassFileBuilder;

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; 16];

        assert!(matches!(parse_class(&buf), Err(VmError::BadMagic(0))));
    }

    #[test]
    fn rejects_unknown_constant_tag() {
        let mut buf = CLASS_MAGIC.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0, 0, 0, 52]); // versions
        buf.extend_from_slice(&[0, 2]); // one pool slot
        buf.push(19); // Module tag, outside the supported grammar

        assert!(matches!(
            parse_class(&buf),
            Err(VmError::UnsupportedConstantTag(19))
        ));
    }

    #[test]
    fn truncated_file() {
        let buf = CLASS_MAGIC.to_be_bytes();

        assert!(matches!(parse_class(&buf), Err(VmError::UnexpectedEof)));
    }

    #[test]
    fn parses_members_and_pool_holes() {
        let mut b = ClassFileBuilder::new("Sample", "java/lang/Object");
        b.long(42);
        b.field(0, "x", "I");
        b.method(0x0008, "main", "()V", 1, 1, &[0xb1]);
        let raw = parse_class(&b.build()).unwrap();

        assert_eq!(raw.fields.len(), 1);
        assert_eq!(raw.methods.len(), 1);
        assert_eq!(raw.methods[0].attributes.len(), 1);
        assert!(raw
            .constant_pool
            .iter()
            .any(|c| matches!(c, Constant::Hole)));
        assert!(raw
            .constant_pool
            .iter()
            .any(|c| matches!(c, Constant::Long(42))));
    }
}
