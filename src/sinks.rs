//! Append-only buffered CSV writers for the four output sinks (spec §6):
//! trade tape, LOB frames, average balances, and per-trader blotters.
//!
//! Grounded in the teacher's convention of writing against `std::io::Write`
//! rather than `std::fs::File` directly, so tests can sink into an
//! in-memory `Vec<u8>`. Flushes every 100 lines or at `Drop` (spec §5).

use std::io::{self, BufWriter, Write};

/// One append-only, line-buffered CSV sink.
pub struct CsvSink<W: Write> {
    writer: BufWriter<W>,
    lines_since_flush: usize,
}

impl<W: Write> CsvSink<W> {
    /// Number of buffered lines between forced flushes (spec §5, "buffers
    /// flush every 100 lines or at session end").
    pub const FLUSH_EVERY: usize = 100;

    pub fn new(inner: W) -> Self {
        CsvSink { writer: BufWriter::new(inner), lines_since_flush: 0 }
    }

    /// Writes one line (a trailing newline is appended) and flushes if
    /// the line budget is exhausted. I/O errors propagate; there is no
    /// retry (spec §7).
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{line}")?;
        self.lines_since_flush += 1;
        if self.lines_since_flush >= Self::FLUSH_EVERY {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

impl<W: Write> Drop for CsvSink<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Header row for the average-balances CSV (spec §6).
pub const BALANCES_HEADER: &str = "SessionID,Time,BidPrice,AskPrice,MidPrice,Spread,TraderID,Balance,NetWorth";

/// Header row for the per-trader blotter CSV (spec §6).
pub const BLOTTER_HEADER: &str = "TraderID,Time,Price,Qty,Party1,Party2";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_automatically_every_100_lines() {
        let buf: Vec<u8> = Vec::new();
        let mut sink = CsvSink::new(buf);
        for i in 0..100 {
            sink.write_line(&format!("line{i}")).unwrap();
        }
        assert_eq!(sink.lines_since_flush, 0);
    }

    #[test]
    fn flush_on_drop_makes_data_visible() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedBuf(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                self.0.borrow_mut().flush()
            }
        }

        let shared = Rc::new(RefCell::new(Vec::new()));
        {
            let mut sink = CsvSink::new(SharedBuf(shared.clone()));
            sink.write_line("Trd, 000000001.000, 100").unwrap();
        }
        let contents = String::from_utf8(shared.borrow().clone()).unwrap();
        assert!(contents.contains("Trd, 000000001.000, 100"));
    }
}
