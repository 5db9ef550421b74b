//! Provided implementations for `Sink`.
//!
//! The engine delivers payload in order of arrival and exactly once per processed segment. There
//! is no reassembly, a sink sees the bytes as the peer sent them.
use core::borrow::{Borrow, BorrowMut};

/// Receives the payload of inbound segments.
pub trait Sink {
    /// Called with the payload of every processed segment that carries data.
    fn on_data_received(&mut self, data: &[u8]);
}

/// A receiver that doesn't store anything.
impl Sink for () {
    fn on_data_received(&mut self, _: &[u8]) { }
}

impl<S: Sink + ?Sized> Sink for &'_ mut S {
    fn on_data_received(&mut self, data: &[u8]) {
        (**self).on_data_received(data)
    }
}

/// A receiver with a single fixed buffer.
///
/// Bytes that do not fit anymore are counted and dropped.
pub struct RecvInto<B> {
    /// Buffer of bytes.
    buffer: B,
    /// Number of valid bytes at the start of the buffer.
    len: usize,
    /// Number of bytes that did not fit.
    dropped: usize,
}

impl<B: BorrowMut<[u8]>> RecvInto<B> {
    /// Receive into an empty buffer.
    pub fn new(buffer: B) -> Self {
        RecvInto {
            buffer,
            len: 0,
            dropped: 0,
        }
    }

    /// The bytes received so far.
    pub fn received(&self) -> &[u8] {
        let buffer: &[u8] = self.buffer.borrow();
        &buffer[..self.len]
    }

    /// The number of bytes that were dropped for lack of space.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Forget all received bytes.
    pub fn clear(&mut self) {
        self.len = 0;
        self.dropped = 0;
    }

    /// Unwrap the buffer and the number of valid bytes in it.
    pub fn into_inner(self) -> (B, usize) {
        (self.buffer, self.len)
    }
}

impl<B: BorrowMut<[u8]>> Sink for RecvInto<B> {
    fn on_data_received(&mut self, data: &[u8]) {
        let buffer: &mut [u8] = self.buffer.borrow_mut();
        let free = &mut buffer[self.len..];
        let fits = free.len().min(data.len());
        free[..fits].copy_from_slice(&data[..fits]);
        self.len += fits;
        self.dropped += data.len() - fits;
    }
}

#[cfg(feature = "std")]
impl Sink for std::vec::Vec<u8> {
    fn on_data_received(&mut self, data: &[u8]) {
        self.extend_from_slice(data)
    }
}

/// Writes all received data into an `std::io::Write`, such as stdout.
///
/// The first write error is kept and all later data is discarded. Delivery itself can not fail.
#[cfg(feature = "std")]
pub struct WriteSink<W> {
    writer: W,
    error: Option<std::io::Error>,
}

#[cfg(feature = "std")]
impl<W: std::io::Write> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        WriteSink {
            writer,
            error: None,
        }
    }

    /// Take the first error that occurred, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Get a reference to the writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> Sink for WriteSink<W> {
    fn on_data_received(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }

        let result = self.writer
            .write_all(data)
            .and_then(|()| self.writer.flush());
        if let Err(err) = result {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_into_drops_overflow() {
        let mut sink = RecvInto::new([0u8; 4]);
        sink.on_data_received(b"abc");
        sink.on_data_received(b"def");
        assert_eq!(sink.received(), b"abcd");
        assert_eq!(sink.dropped(), 2);

        sink.clear();
        sink.on_data_received(b"xy");
        assert_eq!(sink.received(), b"xy");
        let (buffer, len) = sink.into_inner();
        assert_eq!(&buffer[..len], b"xy");
    }

    #[test]
    fn write_sink_keeps_first_error() {
        struct Failing(usize);

        impl std::io::Write for Failing {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                self.0 += 1;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut sink = WriteSink::new(Failing(0));
        sink.on_data_received(b"a");
        sink.on_data_received(b"b");
        assert_eq!(sink.get_ref().0, 1);
        assert!(sink.take_error().is_some());
        assert!(sink.take_error().is_none());

        let mut sink = WriteSink::new(Vec::new());
        sink.on_data_received(b"hello ");
        sink.on_data_received(b"world");
        assert_eq!(sink.into_inner(), b"hello world");
    }
}
