//! Line-by-line file reading
//!
//! Files are read one line at a time so memory stays bounded by the longest
//! line. Content that is not valid UTF-8 is converted lossily (invalid bytes
//! become U+FFFD) instead of failing the whole page.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

/// Iterator over the lines of a reader, without line terminators
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }
}

/// Read an already-opened file line by line. The handle is closed when the
/// iterator is dropped, on every exit path.
pub fn read_lines(file: File) -> LineReader<File> {
    LineReader::new(file)
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<io::Result<String>> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let mut end = self.buf.len();
                while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
                    end -= 1;
                }
                Some(Ok(String::from_utf8_lossy(&self.buf[..end]).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn lines_of(data: &[u8]) -> Vec<String> {
        LineReader::new(data).map(|l| l.unwrap()).collect()
    }

    #[test]
    fn test_strips_terminators() {
        assert_eq!(lines_of(b"one\ntwo\r\nthree"), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_keeps_empty_lines() {
        assert_eq!(lines_of(b"a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(lines_of(b"").is_empty());
    }

    #[test]
    fn test_lossy_conversion() {
        let lines = lines_of(&[0xFF, 0xFE, b'o', b'k', b'\n']);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("ok"));
        assert!(lines[0].contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_lines_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "Hello\nWorld\n").unwrap();

        let lines: Vec<String> = read_lines(File::open(&path).unwrap())
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(lines, vec!["Hello", "World"]);
    }
}
