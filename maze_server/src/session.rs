// session.rs - Per-connection state machine
//
// CONFIGURING -> GENERATING -> PLAYING -> FINISHED. A degenerate generation
// result drops back to CONFIGURING. Every read races the shutdown signal.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use maze_engine::{generate_maze, DensitySweep, Dimensions, Maze, MazeError, SweepProgress};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::io::{LineReader, LineWriter};
use crate::protocol::{self, ConfigCommand, GameCommand, Reply};
use crate::shutdown::Shutdown;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub read_timeout: Duration,
    pub sweep: DensitySweep,
    /// Fixed generator seed; fresh entropy per START when `None`.
    pub seed: Option<u64>,
    /// Bumped once per density step the generator finishes, for every
    /// session sharing these settings.
    pub sweep_steps: Option<Arc<AtomicUsize>>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            sweep: DensitySweep::default(),
            seed: None,
            sweep_steps: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Configuring,
    Generating,
    Playing,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Configuring => "CONFIGURING",
            SessionState::Generating => "GENERATING",
            SessionState::Playing => "PLAYING",
            SessionState::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

// ============= Progress Line =============

/// Turns sweep progress into the ` 0% 10% ... 90%` fragments of the `1` line.
#[derive(Debug, Default)]
struct ProgressLine {
    next: usize,
}

impl ProgressLine {
    const STRIDE: usize = 10;

    /// Fragments due once `progress.step` density steps are done. The first
    /// step maps to 0%, the last to 100%, which is left to [`Self::finish`].
    fn advance(&mut self, progress: SweepProgress) -> Vec<String> {
        let span = progress.total.saturating_sub(1).max(1);
        let reached = progress.step.saturating_sub(1) * 100 / span;

        let mut fragments = Vec::new();
        while self.next <= reached && self.next < 100 {
            fragments.push(format!(" {}%", self.next));
            self.next += Self::STRIDE;
        }
        fragments
    }

    fn finish() -> &'static str {
        " 100% DONE."
    }
}

/// Stops the generator at its next density step when the session goes away.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

// ============= Session =============

pub struct Session<R, W> {
    id: Uuid,
    reader: LineReader<R>,
    writer: LineWriter<W>,
    shutdown: Shutdown,
    settings: SessionSettings,
    dims: Dimensions,
    state: SessionState,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(id: Uuid, reader: R, writer: W, shutdown: Shutdown, settings: SessionSettings) -> Self {
        Self {
            id,
            reader: LineReader::new(reader, settings.read_timeout),
            writer: LineWriter::new(writer),
            shutdown,
            settings,
            dims: Dimensions::default(),
            state: SessionState::Configuring,
        }
    }

    /// Where the session is, or where it stopped once [`Self::run`] returned.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn enter(&mut self, next: SessionState) {
        log::debug!("[{}] {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    /// Drives the session to completion and returns the solve time. Stream
    /// faults and shutdown end the session without further output.
    pub async fn run(&mut self) -> Result<Duration> {
        self.writer
            .lines(&protocol::welcome(self.settings.read_timeout))
            .await?;
        self.writer.line(&Reply::prompt(self.dims)).await?;
        self.writer.flush().await?;

        let maze = loop {
            self.enter(SessionState::Configuring);
            let dims = self.configure().await?;

            self.enter(SessionState::Generating);
            match self.generate(dims).await? {
                Some(maze) => break maze,
                None => {
                    self.writer.line(&Reply::prompt(self.dims)).await?;
                    self.writer.flush().await?;
                }
            }
        };

        self.enter(SessionState::Playing);
        let elapsed = self.play(maze).await?;

        self.enter(SessionState::Finished);
        log::info!("[{}] Solved {} in {:?}", self.id, self.dims, elapsed);
        self.writer.line(&Reply::solved(elapsed)).await?;
        self.writer.close().await?;
        Ok(elapsed)
    }

    async fn next_line(&mut self) -> Result<String> {
        if self.shutdown.is_triggered() {
            return Err(SessionError::Shutdown);
        }
        tokio::select! {
            line = self.reader.read_line() => line,
            _ = self.shutdown.wait() => Err(SessionError::Shutdown),
        }
    }

    /// Handles configuration commands until a START that fits the budget.
    async fn configure(&mut self) -> Result<Dimensions> {
        loop {
            let line = self.next_line().await?;
            let reply = match ConfigCommand::parse(&line) {
                ConfigCommand::Width(v) => confirm(self.dims.set_width(v)),
                ConfigCommand::Height(v) => confirm(self.dims.set_height(v)),
                ConfigCommand::Depth(v) => confirm(self.dims.set_depth(v)),
                ConfigCommand::Start => match self.dims.check_budget() {
                    Ok(()) => return Ok(self.dims),
                    Err(e) => Reply::denied(e.to_string()),
                },
                ConfigCommand::Unknown => Reply::denied(protocol::UNKNOWN_CONFIG_COMMAND),
            };
            self.writer.line(&reply).await?;
            self.writer.flush().await?;
        }
    }

    /// Runs the density sweep on the blocking pool while relaying progress.
    /// `None` means no playable maze came out and the client was told so.
    async fn generate(&mut self, dims: Dimensions) -> Result<Option<Maze>> {
        log::info!("[{}] Generating {} ({})", self.id, dims, dims.memory());
        self.writer.lines(&protocol::briefing(dims)).await?;
        self.writer.partial("1").await?;
        self.writer.flush().await?;

        let seed = self.settings.seed.unwrap_or_else(|| rand::rng().random());
        let sweep = self.settings.sweep;
        let steps = self.settings.sweep_steps.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel = CancelOnDrop(Arc::clone(&cancelled));
        let (tx, mut rx) = mpsc::unbounded_channel::<SweepProgress>();

        let mut task = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            generate_maze(dims, &sweep, &mut rng, |progress| {
                if let Some(steps) = &steps {
                    steps.fetch_add(1, Ordering::Relaxed);
                }
                if cancelled.load(Ordering::Acquire) {
                    return ControlFlow::Break(());
                }
                // receiver gone means the session is ending anyway
                let _ = tx.send(progress);
                ControlFlow::Continue(())
            })
        });

        let mut line = ProgressLine::default();
        let mut watch_input = true;
        let joined = loop {
            tokio::select! {
                Some(progress) = rx.recv() => {
                    self.report(&mut line, progress).await?;
                }
                joined = &mut task => break joined,
                _ = self.shutdown.wait() => return Err(SessionError::Shutdown),
                closed = self.reader.peer_closed(), if watch_input => {
                    if closed? {
                        log::debug!("[{}] Client left while generating", self.id);
                        return Err(SessionError::Disconnected);
                    }
                    // early input waits in the reader for the game loop
                    watch_input = false;
                }
            }
        };
        while let Ok(progress) = rx.try_recv() {
            self.report(&mut line, progress).await?;
        }

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => return Err(SessionError::GeneratorPanicked),
            Err(e) => return Err(SessionError::Task(e)),
        };

        match outcome {
            Ok(maze) => {
                self.writer.partial(ProgressLine::finish()).await?;
                self.writer.end_line().await?;
                self.writer.line(&Reply::ready()).await?;
                self.writer.flush().await?;
                log::info!(
                    "[{}] Ready: start {} target {} distance {}",
                    self.id,
                    maze.start(),
                    maze.target(),
                    maze.distance()
                );
                Ok(Some(maze))
            }
            Err(MazeError::GenerationDegenerate { best_distance }) => {
                log::warn!(
                    "[{}] No playable {} maze (best distance {})",
                    self.id,
                    dims,
                    best_distance
                );
                self.writer.end_line().await?;
                self.writer
                    .line(&Reply::denied(protocol::GENERATION_FAILED))
                    .await?;
                self.writer.flush().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn report(&mut self, line: &mut ProgressLine, progress: SweepProgress) -> Result<()> {
        // relaxed retries are not shown
        if progress.pass != 0 {
            return Ok(());
        }
        for fragment in line.advance(progress) {
            self.writer.partial(&fragment).await?;
        }
        self.writer.flush().await
    }

    /// Gameplay loop; returns the elapsed time once ENTER is sent on target.
    async fn play(&mut self, mut maze: Maze) -> Result<Duration> {
        let started = Instant::now();
        loop {
            let line = self.next_line().await?;
            let replies = match GameCommand::parse(&line) {
                GameCommand::Move(dir) => vec![moved(maze.step(dir))],
                GameCommand::Enter if maze.on_target() => return Ok(started.elapsed()),
                GameCommand::Enter => vec![moved(maze.enter())],
                GameCommand::Print => Reply::window(&maze.window()),
                GameCommand::Unknown => vec![Reply::denied(protocol::UNKNOWN_GAME_COMMAND)],
            };
            self.writer.lines(&replies).await?;
            self.writer.flush().await?;
        }
    }
}

fn confirm(result: maze_engine::Result<()>) -> Reply {
    match result {
        Ok(()) => Reply::ok(),
        Err(e) => Reply::denied(e.to_string()),
    }
}

fn moved(success: bool) -> Reply {
    if success {
        Reply::done()
    } else {
        Reply::blocked()
    }
}
