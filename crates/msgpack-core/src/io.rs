//! Byte source/sink abstraction.
//!
//! The encoder and decoder are generic over [`Sink`]/[`Source`] rather than
//! concrete `std::io::Write`/`Read` so that a caller's own fallible
//! transport — a length-checked in-memory buffer, a rate-limited socket
//! wrapper, anything that can fail for reasons this crate doesn't know
//! about — can report its own [`Error`] variant and have it propagate
//! through `?` unchanged, rather than this crate hard-wiring a concrete
//! transport such as `TcpStream`.

use crate::error::{Error, Result};

/// A byte source the decoder reads from.
pub trait Source {
    /// Fill `buf` completely, or fail.
    ///
    /// # Errors
    ///
    /// Implementations should return [`Error::DataReading`] (or any other
    /// `Error` variant that fits, which the decoder will propagate
    /// unchanged) if fewer than `buf.len()` bytes are available.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// A byte sink the encoder writes to.
pub trait Sink {
    /// Write all of `buf`, or fail.
    ///
    /// # Errors
    ///
    /// Implementations should return [`Error::DataWriting`] (or any other
    /// `Error` variant that fits, which the encoder will propagate
    /// unchanged) on a short or failed write.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

impl Source for &[u8] {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.len() < buf.len() {
            return Err(Error::DataReading(format!(
                "needed {} bytes, only {} remained",
                buf.len(),
                self.len()
            )));
        }
        let (head, tail) = self.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }
}

impl Sink for Vec<u8> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

/// Adapts any `std::io::Read` into a [`Source`].
pub struct IoSource<R> {
    inner: R,
}

impl<R: std::io::Read> IoSource<R> {
    /// Wrap a reader.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: std::io::Read> Source for IoSource<R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|err| Error::DataReading(err.to_string()))
    }
}

/// Adapts any `std::io::Write` into a [`Sink`].
pub struct IoSink<W> {
    inner: W,
}

impl<W: std::io::Write> IoSink<W> {
    /// Wrap a writer.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> Sink for IoSink<W> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).map_err(|err| Error::DataWriting(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reads_exact_and_advances() {
        let data = [1u8, 2, 3, 4];
        let mut source: &[u8] = &data;
        let mut buf = [0u8; 2];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
        assert!(source.read_exact(&mut buf).is_err());
    }

    #[test]
    fn vec_sink_appends() {
        let mut sink: Vec<u8> = Vec::new();
        sink.write_all(&[1, 2, 3]).unwrap();
        sink.write_all(&[4]).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn io_adapters_round_trip() {
        let mut buf: Vec<u8> = Vec::new();
        let mut sink = IoSink::new(&mut buf);
        sink.write_all(&[9, 8, 7]).unwrap();
        drop(sink);

        let mut source = IoSource::new(buf.as_slice());
        let mut out = [0u8; 3];
        source.read_exact(&mut out).unwrap();
        assert_eq!(out, [9, 8, 7]);
    }
}
