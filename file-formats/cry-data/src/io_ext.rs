use std::io::{Read, Result, Write};

/// Extension trait for reading little-endian values from a reader
pub trait ReadExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i16_le(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_f32_le(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }
}

/// Extension trait for writing little-endian values to a writer
pub trait WriteExt: Write {
    fn write_u8(&mut self, n: u8) -> Result<()> {
        self.write_all(&[n])
    }

    fn write_u16_le(&mut self, n: u16) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_u32_le(&mut self, n: u32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i16_le(&mut self, n: i16) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i32_le(&mut self, n: i32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_f32_le(&mut self, n: f32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }
}

// Implement the traits for all types that implement Read/Write
impl<R: Read + ?Sized> ReadExt for R {}
impl<W: Write + ?Sized> WriteExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_primitives() {
        let mut buf = Vec::new();
        buf.write_u8(0xAB).unwrap();
        buf.write_u16_le(0xBEEF).unwrap();
        buf.write_u32_le(0xDEAD_BEEF).unwrap();
        buf.write_i16_le(-1234).unwrap();
        buf.write_i32_le(-7_654_321).unwrap();
        buf.write_f32_le(1.5).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_u8().unwrap(), 0xAB);
        assert_eq!(cursor.read_u16_le().unwrap(), 0xBEEF);
        assert_eq!(cursor.read_u32_le().unwrap(), 0xDEAD_BEEF);
        assert_eq!(cursor.read_i16_le().unwrap(), -1234);
        assert_eq!(cursor.read_i32_le().unwrap(), -7_654_321);
        assert_eq!(cursor.read_f32_le().unwrap(), 1.5);
    }

    #[test]
    fn test_short_read_fails() {
        let mut cursor = Cursor::new([0u8; 2]);
        assert!(cursor.read_u32_le().is_err());
    }
}
