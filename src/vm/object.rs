use crate::error::VmError;
use crate::vm::class::class::ClassId;
use crate::vm::value::{Value, ValueKind};

/// Handle to an allocated object. The heap never frees anything: object
/// lifetime is the lifetime of the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ObjRef(usize);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An instance is a flat zeroed byte blob of its class's instance size. The
/// class handle in the header is the object's dispatch-table reference:
/// virtual calls index `arena[header].vtable`. Field slots are addressed by
/// the byte offsets assigned at link time.
struct Object {
    class: ClassId,
    data: Box<[u8]>,
}

#[derive(Default)]
pub struct ObjHeap {
    objects: Vec<Object>,
}

impl ObjHeap {
    pub fn new() -> ObjHeap {
        ObjHeap::default()
    }

    pub fn alloc(&mut self, class: ClassId, size: usize) -> ObjRef {
        self.objects.push(Object {
            class,
            data: vec![0; size].into_boxed_slice(),
        });
        ObjRef(self.objects.len() - 1)
    }

    pub fn class_of(&self, r: ObjRef) -> ClassId {
        self.objects[r.0].class
    }

    /// Reads a value of the given kind at a field offset. Width comes from
    /// the kind; the offset must have been assigned by the linker.
    pub fn load(&self, r: ObjRef, offset: usize, kind: ValueKind) -> Result<Value, VmError> {
        let data = &self.objects[r.0].data;

        match kind {
            ValueKind::Int => Ok(Value::Int(i32::from_le_bytes(read4(data, offset)))),
            ValueKind::Float => Ok(Value::Float(f32::from_bits(u32::from_le_bytes(read4(
                data, offset,
            ))))),
            ValueKind::Long => Ok(Value::Long(i64::from_le_bytes(read8(data, offset)))),
            ValueKind::Double => Ok(Value::Double(f64::from_bits(u64::from_le_bytes(read8(
                data, offset,
            ))))),
            ValueKind::Ref => Ok(Value::Ref(decode_ref(u64::from_le_bytes(read8(
                data, offset,
            ))))),
            ValueKind::Arr => Err(VmError::Unsupported("array field access")),
        }
    }

    /// Writes a value at a field offset; the stored width is the value's own.
    pub fn store(&mut self, r: ObjRef, offset: usize, value: Value) -> Result<(), VmError> {
        let data = &mut self.objects[r.0].data;

        match value {
            Value::Int(v) => write4(data, offset, v.to_le_bytes()),
            Value::Float(v) => write4(data, offset, v.to_bits().to_le_bytes()),
            Value::Long(v) => write8(data, offset, v.to_le_bytes()),
            Value::Double(v) => write8(data, offset, v.to_bits().to_le_bytes()),
            Value::Ref(r) => write8(data, offset, encode_ref(r).to_le_bytes()),
            Value::Arr => return Err(VmError::Unsupported("array field access")),
        }
        Ok(())
    }
}

// References are stored in object memory as handle + 1, zero meaning null.
fn encode_ref(r: Option<ObjRef>) -> u64 {
    match r {
        None => 0,
        Some(r) => r.0 as u64 + 1,
    }
}

fn decode_ref(raw: u64) -> Option<ObjRef> {
    if raw == 0 {
        None
    } else {
        Some(ObjRef(raw as usize - 1))
    }
}

fn read4(data: &[u8], offset: usize) -> [u8; 4] {
    debug_assert!(offset + 4 <= data.len());
    data[offset..offset + 4].try_into().expect("field bounds")
}

fn read8(data: &[u8], offset: usize) -> [u8; 8] {
    debug_assert!(offset + 8 <= data.len());
    data[offset..offset + 8].try_into().expect("field bounds")
}

fn write4(data: &mut [u8], offset: usize, bytes: [u8; 4]) {
    debug_assert!(offset + 4 <= data.len());
    data[offset..offset + 4].copy_from_slice(&bytes);
}

fn write8(data: &mut [u8], offset: usize, bytes: [u8; 8]) {
    debug_assert!(offset + 8 <= data.len());
    data[offset..offset + 8].copy_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_objects_are_zeroed() {
        let mut heap = ObjHeap::new();
        let r = heap.alloc(ClassId(0), 24);

        assert_eq!(heap.load(r, 8, ValueKind::Int).unwrap(), Value::Int(0));
        assert_eq!(heap.load(r, 16, ValueKind::Ref).unwrap(), Value::Ref(None));
    }

    #[test]
    fn round_trips_each_kind() {
        let mut heap = ObjHeap::new();
        let r = heap.alloc(ClassId(0), 40);
        let other = heap.alloc(ClassId(0), 8);

        heap.store(r, 8, Value::Int(-7)).unwrap();
        heap.store(r, 12, Value::Float(1.5)).unwrap();
        heap.store(r, 16, Value::Long(1 << 40)).unwrap();
        heap.store(r, 24, Value::Double(-2.25)).unwrap();
        heap.store(r, 32, Value::Ref(Some(other))).unwrap();

        assert_eq!(heap.load(r, 8, ValueKind::Int).unwrap(), Value::Int(-7));
        assert_eq!(heap.load(r, 12, ValueKind::Float).unwrap(), Value::Float(1.5));
        assert_eq!(heap.load(r, 16, ValueKind::Long).unwrap(), Value::Long(1 << 40));
        assert_eq!(
            heap.load(r, 24, ValueKind::Double).unwrap(),
            Value::Double(-2.25)
        );
        assert_eq!(
            heap.load(r, 32, ValueKind::Ref).unwrap(),
            Value::Ref(Some(other))
        );
    }
}
