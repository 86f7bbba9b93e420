use bytes::{Buf, BufMut, Bytes};

use crate::{common::ByteStr, mysql::ProtocolError};

/// Lengths are `usize` in rust, while the protocol mostly want `u32`.
pub trait UsizeExt {
    /// Convert to `u32`, this will panic when overflow instead of wrapping.
    fn to_u32(self) -> u32;
}

/// Size calculation of protocol strings.
pub trait StrExt {
    /// String length plus nul (1).
    fn nul_string_len(&self) -> u32;

    /// String length plus its length-encoded integer prefix.
    fn lenenc_string_len(&self) -> u32;
}

/// Protocol primitives in [`BufMut`].
pub trait BufMutExt {
    /// Write string and nul termination.
    fn put_nul_string(&mut self, string: &str);

    /// Write 3 bytes little endian integer, the upper byte of `value` is ignored.
    fn put_u24_le(&mut self, value: u32);

    /// Write length-encoded integer.
    fn put_lenenc_int(&mut self, value: u64);

    /// Write length-encoded integer prefix followed by the bytes.
    fn put_lenenc_bytes(&mut self, bytes: &[u8]);
}

/// Checked protocol primitives in [`Bytes`].
///
/// Fixed size integers use [`Buf::try_get_u8`] and friends, these are the
/// protocol specific ones. None of them panic on short input.
pub trait BytesExt {
    /// Split `len` bytes from the front.
    fn try_split_to(&mut self, len: usize) -> Result<Bytes, ProtocolError>;

    /// Read nul terminated bytes, the nul is consumed but not returned.
    fn get_nul_bytes(&mut self) -> Result<Bytes, ProtocolError>;

    /// Read nul terminated string.
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError>;

    /// Read length-encoded integer.
    fn get_lenenc_int(&mut self) -> Result<u64, ProtocolError>;

    /// Read length-encoded bytes.
    fn get_lenenc_bytes(&mut self) -> Result<Bytes, ProtocolError>;

    /// Read length-encoded string.
    fn get_lenenc_bytestr(&mut self) -> Result<ByteStr, ProtocolError>;
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

/// Size of a length-encoded integer.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_integers.html>
pub const fn lenenc_int_len(value: u64) -> u32 {
    match value {
        0..0xFB => 1,
        0xFB..0x1_0000 => 3,
        0x1_0000..0x100_0000 => 4,
        _ => 9,
    }
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        self.try_into().expect("message size too large for protocol")
    }
}

impl StrExt for str {
    fn nul_string_len(&self) -> u32 {
        self.len().to_u32() + 1/* nul */
    }

    fn lenenc_string_len(&self) -> u32 {
        lenenc_int_len(self.len() as u64) + self.len().to_u32()
    }
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }

    fn put_u24_le(&mut self, value: u32) {
        self.put_slice(&value.to_le_bytes()[..3]);
    }

    fn put_lenenc_int(&mut self, value: u64) {
        match lenenc_int_len(value) {
            1 => self.put_u8(value as u8),
            3 => {
                self.put_u8(0xFC);
                self.put_u16_le(value as u16);
            }
            4 => {
                self.put_u8(0xFD);
                self.put_u24_le(value as u32);
            }
            _ => {
                self.put_u8(0xFE);
                self.put_u64_le(value);
            }
        }
    }

    fn put_lenenc_bytes(&mut self, bytes: &[u8]) {
        self.put_lenenc_int(bytes.len() as u64);
        self.put_slice(bytes);
    }
}

macro_rules! need {
    ($self:ident, $n:expr) => {
        if $self.remaining() < $n {
            return Err(ProtocolError::malformed("unexpected end of packet"));
        }
    };
}

impl BytesExt for Bytes {
    fn try_split_to(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        need!(self, len);
        Ok(self.split_to(len))
    }

    fn get_nul_bytes(&mut self) -> Result<Bytes, ProtocolError> {
        let Some(end) = self.iter().position(|e| matches!(e, b'\0')) else {
            return Err(ProtocolError::malformed("string is not nul terminated"));
        };
        let me = self.split_to(end);
        Buf::advance(self, 1); // nul
        Ok(me)
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError> {
        Ok(ByteStr::from_utf8(self.get_nul_bytes()?)?)
    }

    fn get_lenenc_int(&mut self) -> Result<u64, ProtocolError> {
        match self.try_get_u8()? {
            0xFC => Ok(self.try_get_u16_le()?.into()),
            0xFD => Ok(self.try_get_uint_le(3)?),
            0xFE => Ok(self.try_get_u64_le()?),
            // 0xFB is NULL in row data, 0xFF is the ERR packet header
            0xFB | 0xFF => Err(ProtocolError::malformed("invalid length-encoded integer")),
            n => Ok(n.into()),
        }
    }

    fn get_lenenc_bytes(&mut self) -> Result<Bytes, ProtocolError> {
        let len = self.get_lenenc_int()?;
        let len = usize::try_from(len)
            .map_err(|_| ProtocolError::malformed("length-encoded bytes too large"))?;
        self.try_split_to(len)
    }

    fn get_lenenc_bytestr(&mut self) -> Result<ByteStr, ProtocolError> {
        Ok(ByteStr::from_utf8(self.get_lenenc_bytes()?)?)
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn lenenc_int_boundaries() {
        for (value, len) in [(0, 1), (250, 1), (251, 3), (0xFFFF, 3), (0x1_0000, 4), (0xFF_FFFF, 4), (0x100_0000, 9)] {
            let mut buf = BytesMut::new();
            buf.put_lenenc_int(value);
            assert_eq!(buf.len() as u32, lenenc_int_len(value), "{value:#x}");
            assert_eq!(buf.len() as u32, len, "{value:#x}");
            assert_eq!(buf.freeze().get_lenenc_int().unwrap(), value);
        }
    }

    #[test]
    fn short_packet_is_error() {
        let mut bytes = Bytes::from_static(&[1, 2]);
        assert!(bytes.clone().get_nul_bytes().is_err());
        assert!(bytes.clone().try_split_to(3).is_err());
        assert!(Bytes::from_static(&[0xFD, 1, 2]).get_lenenc_int().is_err());
        assert!(Bytes::from_static(&[0xFE, 1, 2, 3]).get_lenenc_int().is_err());
        assert!(Bytes::from_static(&[0x05, b'a']).get_lenenc_bytes().is_err());
        assert_eq!(bytes.try_split_to(2).unwrap(), &[1, 2][..]);
    }

    #[test]
    fn nul_string() {
        let mut bytes = Bytes::from_static(b"8.0.36\0rest");
        assert_eq!(bytes.get_nul_bytestr().unwrap(), "8.0.36");
        assert_eq!(&bytes[..], b"rest");
    }
}
