use std::io::{self, BufRead};

/// Upper bound for a single JSONL line. Longer lines are dropped, not fatal.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One item produced by [`BoundedLines`].
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    /// Line content without the trailing `\n` / `\r\n`.
    Complete(Vec<u8>),
    /// The line exceeded the bound and its content was discarded.
    TooLong,
}

/// Line iterator that never buffers more than `max_len` bytes of one line.
///
/// Unlike `BufRead::lines`, an over-long line is reported as [`Line::TooLong`]
/// and reading resumes at the next newline. Bytes are returned raw, so invalid
/// UTF-8 surfaces later as a decode failure rather than a read error.
pub struct BoundedLines<R> {
    reader: R,
    max_len: usize,
    buf: Vec<u8>,
    overflowed: bool,
    done: bool,
}

impl<R: BufRead> BoundedLines<R> {
    pub fn new(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            max_len,
            buf: Vec::new(),
            overflowed: false,
            done: false,
        }
    }

    fn append(&mut self, chunk: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.buf.len() + chunk.len() > self.max_len {
            self.overflowed = true;
            self.buf = Vec::new();
        } else {
            self.buf.extend_from_slice(chunk);
        }
    }

    fn take_line(&mut self) -> Line {
        if std::mem::take(&mut self.overflowed) {
            self.buf.clear();
            return Line::TooLong;
        }
        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Line::Complete(line)
    }
}

impl<R: BufRead> Iterator for BoundedLines<R> {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if available.is_empty() {
                self.done = true;
                if self.buf.is_empty() && !self.overflowed {
                    return None;
                }
                return Some(Ok(self.take_line()));
            }

            match available.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    let chunk = available[..idx].to_vec();
                    self.reader.consume(idx + 1);
                    self.append(&chunk);
                    return Some(Ok(self.take_line()));
                }
                None => {
                    let chunk = available.to_vec();
                    self.reader.consume(chunk.len());
                    self.append(&chunk);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    fn collect(input: &[u8], max_len: usize) -> Vec<Line> {
        BoundedLines::new(Cursor::new(input.to_vec()), max_len)
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn splits_on_newlines_and_strips_cr() {
        let lines = collect(b"a\r\nbb\nccc", 16);
        assert_eq!(
            lines,
            vec![
                Line::Complete(b"a".to_vec()),
                Line::Complete(b"bb".to_vec()),
                Line::Complete(b"ccc".to_vec()),
            ]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect(b"", 16).is_empty());
    }

    #[test]
    fn blank_lines_are_preserved() {
        let lines = collect(b"\n\nx\n", 16);
        assert_eq!(
            lines,
            vec![
                Line::Complete(vec![]),
                Line::Complete(vec![]),
                Line::Complete(b"x".to_vec()),
            ]
        );
    }

    #[test]
    fn over_long_line_is_skipped_and_reading_continues() {
        let lines = collect(b"short\n0123456789abcdef\nafter\n", 8);
        assert_eq!(
            lines,
            vec![
                Line::Complete(b"short".to_vec()),
                Line::TooLong,
                Line::Complete(b"after".to_vec()),
            ]
        );
    }

    #[test]
    fn over_long_line_across_small_buffer_refills() {
        // A 4-byte BufReader forces the long line to arrive in many chunks.
        let input = b"ok\nxxxxxxxxxxxxxxxxxxxx\nfine".to_vec();
        let reader = BufReader::with_capacity(4, Cursor::new(input));
        let lines: Vec<Line> = BoundedLines::new(reader, 10).map(|l| l.unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                Line::Complete(b"ok".to_vec()),
                Line::TooLong,
                Line::Complete(b"fine".to_vec()),
            ]
        );
    }

    #[test]
    fn trailing_over_long_line_without_newline() {
        let lines = collect(b"ok\nxxxxxxxxxxxx", 4);
        assert_eq!(lines, vec![Line::Complete(b"ok".to_vec()), Line::TooLong]);
    }

    #[test]
    fn line_exactly_at_bound_is_kept() {
        let lines = collect(b"abcd\n", 4);
        assert_eq!(lines, vec![Line::Complete(b"abcd".to_vec())]);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            self.served = true;
            let data = b"first\nsecond-partial";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn read_error_ends_iteration() {
        let reader = BufReader::new(FailingReader { served: false });
        let mut lines = BoundedLines::new(reader, 64);
        assert_eq!(lines.next().unwrap().unwrap(), Line::Complete(b"first".to_vec()));
        assert!(lines.next().unwrap().is_err());
        assert!(lines.next().is_none());
    }
}
