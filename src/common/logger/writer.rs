use std::{
    collections::VecDeque,
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;

/// Appends log lines to a file that never holds more than `max_lines` lines.
/// Once it would, the oldest lines are dropped, leaving a tenth of the cap
/// as headroom so the file is not rewritten on every line.
#[derive(Clone)]
pub struct CappedFileWriter {
    path: PathBuf,
    max_lines: usize,
    /// Lines currently in the file, counted on first write.
    lines: Arc<Mutex<Option<usize>>>,
}

impl CappedFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines: max_lines.max(1),
            lines: Arc::new(Mutex::new(None)),
        }
    }

    fn keep_after_trim(&self) -> usize {
        self.max_lines - (self.max_lines / 10).max(1).min(self.max_lines - 1)
    }

    fn count_lines(&self) -> io::Result<usize> {
        match File::open(&self.path) {
            Ok(file) => Ok(BufReader::new(file).lines().count()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Rewrites the file with its newest `keep` lines, returning how many remain.
    fn trim(&self, keep: usize) -> io::Result<usize> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut tail: VecDeque<String> = VecDeque::with_capacity(keep + 1);
        for line in BufReader::new(file).lines() {
            tail.push_back(line?);
            if tail.len() > keep {
                tail.pop_front();
            }
        }

        let tmp = self.path.with_extension("trim");
        {
            let mut out = File::create(&tmp)?;
            for line in &tail {
                writeln!(out, "{line}")?;
            }
        }
        fs::rename(tmp, &self.path)?;
        Ok(tail.len())
    }
}

impl io::Write for CappedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = self.lines.lock();
        let current = match *lines {
            Some(n) => n,
            None => self.count_lines()?,
        };

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        let mut total = current + buf.iter().filter(|&&b| b == b'\n').count();
        if total > self.max_lines {
            match self.trim(self.keep_after_trim()) {
                Ok(kept) => total = kept,
                Err(e) => eprintln!("failed to trim log file {}: {e}", self.path.display()),
            }
        }
        *lines = Some(total);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
