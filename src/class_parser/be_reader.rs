use std::io::Read;

use crate::error::VmError;

// We can't abstract over from_be_bytes, because no common trait provides it,
// so the fixed-width readers are macro-generated.
macro_rules! be_read {
    ($name:ident, $t:ty, $n:expr) => {
        fn $name(&mut self) -> Result<$t, VmError> {
            let mut buf = [0u8; $n];
            self.read_exact(&mut buf)
                .map_err(|_| VmError::UnexpectedEof)?;
            Ok(<$t>::from_be_bytes(buf))
        }
    };
}

/// Sequential big-endian reads over any byte source. Short reads surface as
/// `UnexpectedEof`; there is no buffering or seeking.
pub trait BEReader: Read {
    be_read!(read_u1, u8, 1);
    be_read!(read_u2, u16, 2);
    be_read!(read_u4, u32, 4);

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, VmError> {
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)
            .map_err(|_| VmError::UnexpectedEof)?;
        Ok(buf)
    }

    fn read_str(&mut self, len: usize) -> Result<String, VmError> {
        let buf = self.read_bytes(len)?;
        String::from_utf8(buf).map_err(|_| VmError::InvalidUtf8)
    }
}

impl<R: Read> BEReader for R {}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::BEReader;
    use crate::error::VmError;

    #[test]
    fn big_endian_integers() {
        let mut cursor = Cursor::new([0xca, 0xfe, 0xba, 0xbe, 0x00, 0x34, 0x07].as_slice());

        assert_eq!(cursor.read_u4().unwrap(), 0xcafebabe);
        assert_eq!(cursor.read_u2().unwrap(), 0x34);
        assert_eq!(cursor.read_u1().unwrap(), 7);
    }

    #[test]
    fn truncated_input() {
        let mut cursor = Cursor::new([0x00, 0x01].as_slice());

        assert!(matches!(cursor.read_u4(), Err(VmError::UnexpectedEof)));
    }

    #[test]
    fn length_prefixed_string() {
        let mut cursor = Cursor::new(b"main!".as_slice());

        assert_eq!(cursor.read_str(4).unwrap(), "main");
        assert!(matches!(cursor.read_str(2), Err(VmError::UnexpectedEof)));
    }
}
