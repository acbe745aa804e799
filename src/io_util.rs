//! A position-tracking buffered writer, used by the journal writer to know
//! the current file offset without an extra `seek` call.
//!
//! Adapted from the generation-log writer half of the teacher's bitcask
//! engine (`BufWriterWithPos`); the only change is that this journal has a
//! fixed pair of files instead of a generation sequence. The reader side
//! does unbuffered random-access seeks instead, so it has no equivalent
//! counterpart here.

use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// A buffered writer that tracks its current position.
pub struct CountingWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    pos: u64,
}

impl<W: Write + Seek> CountingWriter<W> {
    /// Wrap `inner`, recording its current position as the starting offset.
    pub fn new(mut inner: W) -> io::Result<Self> {
        let pos = inner.seek(SeekFrom::Current(0))?;
        Ok(CountingWriter {
            writer: BufWriter::new(inner),
            pos,
        })
    }

    /// The current byte offset, including bytes still sitting in the
    /// userspace buffer.
    pub fn pos(&self) -> u64 {
        self.pos
    }
}

impl<W: Write + Seek> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = self.writer.write(buf)?;
        self.pos += len as u64;
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write + Seek> Seek for CountingWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = self.writer.seek(pos)?;
        Ok(self.pos)
    }
}
