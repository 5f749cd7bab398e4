//! Implementations for foreign buffer types
#[cfg(feature = "std")]
use std::{vec::Vec, string::String, collections::VecDeque, io::Cursor};
#[cfg(all(feature = "alloc",not(feature = "std")))]
use alloc::{vec::Vec, string::String, collections::VecDeque};

#[allow(unused_imports)]
use super::*;

#[cfg(any(feature = "std", feature = "alloc"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "std", feature = "alloc"))))]
impl JsonWrite for Vec<u8> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        self.push(byte);
        Ok(())
    }
}

/// Bytes that do not form valid UTF-8 are replaced with `U+FFFD`.
///
/// The serializer only ever emits whole UTF-8 sequences, so in practice no
/// replacement takes place.
#[cfg(any(feature = "std", feature = "alloc"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "std", feature = "alloc"))))]
impl JsonWrite for String {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        match core::str::from_utf8(buf) {
            Ok(s) => self.push_str(s),
            Err(_) => self.push_str(&String::from_utf8_lossy(buf)),
        }
        Ok(())
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        if byte.is_ascii() {
            self.push(char::from(byte));
        }
        else {
            self.push(char::REPLACEMENT_CHARACTER);
        }
        Ok(())
    }
    #[inline]
    fn write_str(&mut self, s: &str) -> WriteResult<()> {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(any(feature = "std", feature = "alloc"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "std", feature = "alloc"))))]
impl JsonWrite for VecDeque<u8> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        self.extend(buf.iter().copied());
        Ok(())
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        self.push_back(byte);
        Ok(())
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl<T> JsonWrite for Cursor<T>
    where Cursor<T>: std::io::Write
{
    #[inline]
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        std::io::Write::write_all(self, buf).map_err(|_| WriteError::BufferFull)
    }
}

#[cfg(feature = "arrayvec")]
#[cfg_attr(docsrs, doc(cfg(feature = "arrayvec")))]
impl<const CAP: usize> JsonWrite for arrayvec::ArrayVec<u8, CAP> {
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        self.try_extend_from_slice(buf).map_err(|_| WriteError::BufferFull)
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        self.try_push(byte).map_err(|_| WriteError::BufferFull)
    }
}

#[cfg(feature = "arrayvec")]
#[cfg_attr(docsrs, doc(cfg(feature = "arrayvec")))]
impl<const CAP: usize> JsonWrite for arrayvec::ArrayString<CAP> {
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        let s = core::str::from_utf8(buf).map_err(|_| WriteError::BufferFull)?;
        self.try_push_str(s).map_err(|_| WriteError::BufferFull)
    }
    #[inline]
    fn write_str(&mut self, s: &str) -> WriteResult<()> {
        self.try_push_str(s).map_err(|_| WriteError::BufferFull)
    }
}

#[cfg(feature = "heapless")]
#[cfg_attr(docsrs, doc(cfg(feature = "heapless")))]
impl<const CAP: usize> JsonWrite for heapless::Vec<u8, CAP> {
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        self.extend_from_slice(buf).map_err(|_| WriteError::BufferFull)
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        self.push(byte).map_err(|_| WriteError::BufferFull)
    }
}
