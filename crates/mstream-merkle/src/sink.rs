//! Per-height node sinks.
//!
//! A sink receives every node value computed at its height, leaf layer
//! included, in production order. Sinks are advisory: a failing write is
//! reported to the caller of the insertion that triggered it but never stops
//! the cascade.

use std::io::{self, Write};

/// Order-preserving recipient of raw node values.
pub trait NodeSink {
    /// Append one node value.
    fn write_node(&mut self, value: &[u8]) -> io::Result<()>;

    /// Flush buffered writes, if any.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory sink: one entry per node.
impl NodeSink for Vec<Vec<u8>> {
    fn write_node(&mut self, value: &[u8]) -> io::Result<()> {
        self.push(value.to_vec());
        Ok(())
    }
}

impl<S: NodeSink + ?Sized> NodeSink for &mut S {
    fn write_node(&mut self, value: &[u8]) -> io::Result<()> {
        (**self).write_node(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<S: NodeSink + ?Sized> NodeSink for Box<S> {
    fn write_node(&mut self, value: &[u8]) -> io::Result<()> {
        (**self).write_node(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Adapts any [`Write`] into a sink that appends raw node bytes back to back.
///
/// No framing is added; with fixed-size digests the `i`-th node of the height
/// lives at byte offset `i * digest_len`.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
}

impl<W: Write> WriterSink<W> {
    /// Wrap a writer.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> NodeSink for WriterSink<W> {
    fn write_node(&mut self, value: &[u8]) -> io::Result<()> {
        self.inner.write_all(value)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sink_concatenates_raw_values() {
        let mut buf = Vec::<u8>::new();
        let mut sink = WriterSink::new(&mut buf);
        sink.write_node(&[1, 2]).unwrap();
        sink.write_node(&[3]).unwrap();
        sink.flush().unwrap();
        assert_eq!(buf, vec![1, 2, 3]);
    }

    #[test]
    fn borrowed_sink_forwards_to_owner() {
        fn feed(mut sink: impl NodeSink) {
            sink.write_node(b"ab").unwrap();
            sink.write_node(b"c").unwrap();
            sink.flush().unwrap();
        }

        let mut nodes: Vec<Vec<u8>> = Vec::new();
        feed(&mut nodes);
        feed(Box::new(&mut nodes) as Box<dyn NodeSink + '_>);
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[..2], [b"ab".to_vec(), b"c".to_vec()]);
    }
}
