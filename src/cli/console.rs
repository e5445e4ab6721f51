use crate::application::break_proposer::Confirm;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Line-oriented terminal I/O shared by the one-shot commands and the session.
pub struct Console<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl Console<io::BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn print(&self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut output = self.lock_output();
        writeln!(output, "{text}")?;
        output.flush()
    }

    /// Shows `prompt` and reads one line; `None` at end of input.
    pub fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        {
            let mut output = self.lock_output();
            write!(output, "{prompt}")?;
            output.flush()?;
        }
        let mut line = String::new();
        let read = blocking(|| {
            self.input
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .read_line(&mut line)
        })?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn lock_output(&self) -> MutexGuard<'_, W> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R, W> Confirm for Console<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm(&self, prompt: &str) -> bool {
        match self.read_line(&format!("{prompt} [y/N] ")) {
            Ok(Some(answer)) => is_affirmative(&answer),
            Ok(None) => false,
            Err(error) => {
                tracing::warn!(%error, "failed reading confirmation");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Runs a blocking read without stalling other tasks on a multi-thread runtime.
fn blocking<T>(read: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(read)
        }
        _ => read(),
    }
}
