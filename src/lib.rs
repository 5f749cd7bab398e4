//! Byte sinks for the `unijson` serializer.
//!
//! The serializer never builds an intermediate document: it streams compact
//! JSON text into any implementation of [`JsonWrite`]. Growable buffers
//! (`Vec<u8>`, `String`) never fail, fixed-capacity ones report
//! [`WriteError::BufferFull`].
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

#[cfg(all(feature = "alloc",not(feature = "std")))]
extern crate alloc;

use core::fmt;

mod foreign;

pub type WriteResult<T> = Result<T, WriteError>;

/// An error returned by [`JsonWrite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WriteError {
    /// Buffer is full
    BufferFull,
}

#[cfg(feature = "std")]
impl std::error::Error for WriteError {}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BufferFull => f.write_str("output buffer is full"),
        }
    }
}

/// The serializer emits JSON text into implementations of this trait.
///
/// Only UTF-8 text is ever written, so sinks that require valid strings
/// (like `String`) may rely on every complete call sequence being UTF-8.
pub trait JsonWrite {
    /// Write all bytes from `buf`.
    ///
    /// When over capacity return `Err(WriteError::BufferFull)`.
    fn write(&mut self, buf: &[u8]) -> WriteResult<()>;
    /// Write a single ASCII `byte`.
    ///
    /// When over capacity return `Err(WriteError::BufferFull)`.
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        self.write(core::slice::from_ref(&byte))
    }
    /// Write a string.
    ///
    /// When over capacity return `Err(WriteError::BufferFull)`.
    #[inline]
    fn write_str(&mut self, s: &str) -> WriteResult<()> {
        self.write(s.as_bytes())
    }
}

impl<T: JsonWrite + ?Sized> JsonWrite for &'_ mut T {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        (**self).write(buf)
    }
    #[inline]
    fn write_byte(&mut self, byte: u8) -> WriteResult<()> {
        (**self).write_byte(byte)
    }
    #[inline]
    fn write_str(&mut self, s: &str) -> WriteResult<()> {
        (**self).write_str(s)
    }
}

/// A fixed-capacity writer over a borrowed byte slice.
#[derive(Debug, PartialEq)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize
}

impl AsRef<[u8]> for SliceWriter<'_> {
    /// Returns the written portion of the slice
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl<'a> SliceWriter<'a> {
    /// Create new instance
    pub fn new(buf: &'a mut [u8]) -> Self {
        SliceWriter { buf, len: 0 }
    }
    /// Return written length
    pub fn len(&self) -> usize {
        self.len
    }
    /// Return `true` if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Return total capacity
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
    /// Return remaining capacity
    pub fn rem_capacity(&self) -> usize {
        self.buf.len() - self.len
    }
    /// Return the written portion as a string slice.
    ///
    /// Returns `None` when a write was cut in the middle of a multi-byte character.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_ref()).ok()
    }
    /// Forget the written content, keeping the buffer.
    pub fn clear(&mut self) {
        self.len = 0;
    }
    /// Destruct into the written portion of the underlying buffer
    /// with the buffer's borrowed lifetime.
    pub fn into_written(self) -> &'a mut [u8] {
        let SliceWriter { buf, len } = self;
        &mut buf[..len]
    }
}

impl JsonWrite for SliceWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        let end = self.len + buf.len();
        match self.buf.get_mut(self.len..end) {
            Some(chunk) => {
                chunk.copy_from_slice(buf);
                self.len = end;
                Ok(())
            }
            None => Err(WriteError::BufferFull)
        }
    }
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        JsonWrite::write_str(self, s).map_err(|_| fmt::Error)
    }
}
