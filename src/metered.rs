//! Buffered, byte-metered stream wrapper.
//!
//! RTMP's window-acknowledgement flow control needs a running count of bytes
//! exchanged with the peer, including chunk-header overhead. The
//! [`MeteredStream`] owns the underlying stream, buffers both directions
//! (8 KiB each way), and counts every byte consumed by reads and accepted by
//! writes. Counters are monotonic `u64`s; not thread safe, one owner per
//! connection.

use std::io::{self, BufReader, Read, Write};

/// Capacity of the read and write buffers in front of the raw stream.
pub const IO_BUFFER_SIZE: usize = 8192;

/// A buffered stream that meters bytes in both directions.
///
/// Writes accumulate in an internal buffer and reach the underlying stream
/// when the buffer fills or [`flush`](Write::flush) is called, so a chunked
/// message becomes one large write rather than many small ones.
pub struct MeteredStream<S> {
    reader: BufReader<S>,
    write_buffer: Vec<u8>,
    bytes_read: u64,
    bytes_written: u64,
}

impl<S> MeteredStream<S>
where
    S: Read,
{
    /// Wraps an owned stream.
    pub fn new(stream: S) -> MeteredStream<S> {
        MeteredStream {
            reader: BufReader::with_capacity(IO_BUFFER_SIZE, stream),
            write_buffer: Vec::with_capacity(IO_BUFFER_SIZE),
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    /// Total bytes consumed by reads so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Total bytes accepted by writes so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Releases the underlying stream, discarding any buffered data. Flush
    /// first if buffered writes must survive.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl<S> MeteredStream<S>
where
    S: Read + Write,
{
    fn drain_write_buffer(&mut self) -> io::Result<()> {
        if !self.write_buffer.is_empty() {
            self.reader.get_mut().write_all(&self.write_buffer)?;
            self.write_buffer.clear();
        }

        Ok(())
    }
}

impl<S> Read for MeteredStream<S>
where
    S: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.reader.read(buf)?;
        self.bytes_read += count as u64;
        Ok(count)
    }
}

impl<S> Write for MeteredStream<S>
where
    S: Read + Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_buffer.extend_from_slice(buf);
        self.bytes_written += buf.len() as u64;

        if self.write_buffer.len() >= IO_BUFFER_SIZE {
            self.drain_write_buffer()?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_write_buffer()?;
        self.reader.get_mut().flush()
    }
}
