//! Runs the encoder process.
//!
//! The encoder runs on a background thread that owns the child process.
//! That thread feeds the input buffer to stdin and drains stderr on two
//! helper threads, and forwards stdout in chunks over a bounded channel.
//! The caller collects the chunks, then joins the background thread and
//! checks the exit status before trusting the bytes it received. A
//! failed encode is always an error, never an empty or truncated result.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{ChildStderr, ChildStdin, ChildStdout, ExitStatus, Stdio};
use std::sync::mpsc::{self, SyncSender};
use std::thread;

use super::command::EncoderCommand;
use super::types::{EncodeError, EncodeResult};
use crate::logging::JobLogger;

/// Size of each stdout read.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the encoder thread and the caller.
const CHANNEL_DEPTH: usize = 16;

/// Run `command`, feeding `input` on stdin, and return everything it wrote
/// to stdout.
///
/// Encoder stderr lines go to `logger`'s tail buffer, which is cleared
/// first. Fails with [`EncodeError::ProcessFailed`] on a non-zero exit,
/// [`EncodeError::InputTruncated`] if the encoder closed stdin before taking
/// all of `input`, and [`EncodeError::EmptyOutput`] if a successful run
/// wrote nothing.
pub fn run_encoder(
    command: &EncoderCommand,
    input: &[u8],
    logger: &JobLogger,
) -> EncodeResult<Vec<u8>> {
    logger.clear_tail();

    let mut child = command
        .to_command()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EncodeError::Spawn {
            program: command.program().to_string(),
            source,
        })?;

    let missing = |stage: &'static str| {
        EncodeError::pipe(stage, io::Error::other("stream not captured"))
    };
    let stdin = child.stdin.take().ok_or_else(|| missing("opening stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| missing("opening stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing("opening stderr"))?;

    let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(CHANNEL_DEPTH);

    let (output, outcome) = thread::scope(|scope| {
        let encoder = scope.spawn(move || -> EncoderRun {
            let run = thread::scope(|inner| {
                let feeder = inner.spawn(move || feed_stdin(stdin, input));
                let drainer = inner.spawn(move || drain_stderr(stderr, logger));

                let streamed = stream_stdout(stdout, &tx);
                let status = child.wait();

                EncoderRun {
                    status,
                    fed: feeder.join().unwrap_or_else(|_| Err(panicked())),
                    streamed,
                    drained: drainer.join().unwrap_or_else(|_| Err(panicked())),
                }
            });
            // Closing the channel lets the caller's read loop finish.
            drop(tx);
            run
        });

        let mut output = Vec::new();
        for chunk in rx {
            output.extend_from_slice(&chunk);
        }

        (output, encoder.join())
    });

    let run = outcome.map_err(|_| EncodeError::WorkerPanicked)?;
    run.into_result(command, input.len(), logger)?;

    if output.is_empty() {
        return Err(EncodeError::EmptyOutput {
            program: command.program().to_string(),
        });
    }

    tracing::debug!(
        "{} consumed {} bytes and produced {} bytes",
        command.program(),
        input.len(),
        output.len()
    );

    Ok(output)
}

/// What the background thread observed.
struct EncoderRun {
    status: io::Result<ExitStatus>,
    fed: io::Result<()>,
    streamed: io::Result<()>,
    drained: io::Result<()>,
}

impl EncoderRun {
    fn into_result(
        self,
        command: &EncoderCommand,
        input_len: usize,
        logger: &JobLogger,
    ) -> EncodeResult<()> {
        let status = self
            .status
            .map_err(|e| EncodeError::pipe("waiting for the encoder", e))?;

        // Exit status first: a dead encoder also breaks the pipes, and its
        // own diagnostics explain more than EPIPE does.
        if !status.success() {
            tracing::error!("{} exited with {}", command.program(), status);
            return Err(EncodeError::ProcessFailed {
                program: command.program().to_string(),
                exit_code: status.code(),
                stderr_tail: logger.get_tail(),
            });
        }

        match self.fed {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::error!("{} closed stdin before reading all input", command.program());
                logger.error("Encoder closed stdin before all frames were written");
                return Err(EncodeError::InputTruncated {
                    program: command.program().to_string(),
                    input_len,
                });
            }
            Err(e) => return Err(EncodeError::pipe("writing frames to the encoder", e)),
        }

        self.streamed
            .map_err(|e| EncodeError::pipe("reading encoder output", e))?;
        self.drained
            .map_err(|e| EncodeError::pipe("reading encoder diagnostics", e))?;

        Ok(())
    }
}

fn panicked() -> io::Error {
    io::Error::other("pipe thread panicked")
}

/// Write the whole input, then close stdin so the encoder sees EOF.
fn feed_stdin(mut stdin: ChildStdin, input: &[u8]) -> io::Result<()> {
    stdin.write_all(input)?;
    stdin.flush()
}

fn drain_stderr(stderr: ChildStderr, logger: &JobLogger) -> io::Result<()> {
    for line in BufReader::new(stderr).split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');
        tracing::debug!(target: "encoder", "{}", line);
        logger.output_line(line);
    }
    Ok(())
}

/// Forward stdout until EOF. A closed channel means the caller is gone,
/// so the rest is drained and dropped to let the encoder finish.
fn stream_stdout(mut stdout: ChildStdout, tx: &SyncSender<Vec<u8>>) -> io::Result<()> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match stdout.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if tx.send(chunk[..n].to_vec()).is_err() {
            io::copy(&mut stdout, &mut io::sink())?;
            return Ok(());
        }
    }
}
