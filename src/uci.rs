//! Minimal UCI client: enough of the protocol to configure an engine, hand it
//! a FEN and read back a score and a best move.

use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::EngineError;
use crate::worker::{Pending, Poll};

const QUIT_GRACE: Duration = Duration::from_millis(500);

/// Engine score. Mate distances are in moves, positive when the side the score
/// belongs to delivers mate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    pub fn negate(self) -> Self {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(-cp),
            Score::Mate(n) => Score::Mate(-n),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Centipawns(cp) => write!(f, "{:+.2}", cp as f32 / 100.0),
            Score::Mate(0) => write!(f, "Mate"),
            Score::Mate(n) if n > 0 => write!(f, "Mate in {n}"),
            Score::Mate(n) => write!(f, "Mated in {}", -n),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(Duration),
}

impl fmt::Display for SearchLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchLimit::Depth(d) => write!(f, "depth {d}"),
            SearchLimit::MoveTime(t) => write!(f, "movetime {}", t.as_millis()),
        }
    }
}

/// One parsed `info` line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Info {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<String>,
    /// Score from the point of view of the side to move.
    pub score: Option<Score>,
    pub depth: u32,
    pub pv: Vec<String>,
}

pub fn parse_info(line: &str) -> Option<Info> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") {
        return None;
    }
    let mut info = Info::default();
    while let Some(tok) = tokens.next() {
        match tok {
            "depth" => info.depth = tokens.next().and_then(|t| t.parse().ok()),
            "multipv" => info.multipv = tokens.next().and_then(|t| t.parse().ok()),
            "score" => {
                let kind = tokens.next();
                let value = tokens.next().and_then(|t| t.parse::<i32>().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
            }
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_owned).collect();
            }
            // Free text until the end of the line.
            "string" => break,
            _ => {}
        }
    }
    Some(info)
}

/// `Some(None)` for a `bestmove` line without a move (mate or stalemate on the
/// board), `None` for any other line.
pub fn parse_bestmove(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    Some(
        tokens
            .next()
            .filter(|m| *m != "(none)" && *m != "0000")
            .map(str::to_owned),
    )
}

// ────────────────────────────────────────────────────────────────────────────────
// Session over arbitrary pipes
// ────────────────────────────────────────────────────────────────────────────────

pub struct UciSession<R, W> {
    reader: R,
    writer: W,
    name: Option<String>,
}

impl<R: BufRead, W: Write> UciSession<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            name: None,
        }
    }

    /// Engine name announced during the handshake.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn send(&mut self, command: &str) -> Result<(), EngineError> {
        log::trace!(">> {command}");
        writeln!(self.writer, "{command}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self, waiting_for: &'static str) -> Result<String, EngineError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(EngineError::Closed(waiting_for));
        }
        let line = line.trim().to_owned();
        log::trace!("<< {line}");
        Ok(line)
    }

    pub fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci")?;
        loop {
            let line = self.read_line("uciok")?;
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = Some(name.to_owned());
            } else if line == "uciok" {
                break;
            }
        }
        self.sync()
    }

    /// `isready` round trip.
    pub fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        while self.read_line("readyok")? != "readyok" {}
        Ok(())
    }

    pub fn set_option(&mut self, name: &str, value: impl fmt::Display) -> Result<(), EngineError> {
        self.send(&format!("setoption name {name} value {value}"))
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame")?;
        self.sync()
    }

    pub fn search(&mut self, fen: &str, limit: SearchLimit) -> Result<SearchResult, EngineError> {
        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go {limit}"))?;

        let mut result = SearchResult::default();
        loop {
            let line = self.read_line("bestmove")?;
            if let Some(best) = parse_bestmove(&line) {
                result.best_move = best;
                return Ok(result);
            }
            let Some(info) = parse_info(&line) else {
                continue;
            };
            if info.multipv.is_some_and(|n| n != 1) {
                continue;
            }
            if let Some(score) = info.score {
                result.score = Some(score);
                result.depth = info.depth.unwrap_or(result.depth);
                if !info.pv.is_empty() {
                    result.pv = info.pv;
                }
            }
        }
    }
}

/// Anything that can search a position: a spawned engine, or a scripted
/// session in tests.
pub trait Engine: Send {
    fn search(&mut self, fen: &str, limit: SearchLimit) -> Result<SearchResult, EngineError>;
}

pub type SharedEngine = Arc<Mutex<dyn Engine>>;

impl<R: BufRead + Send, W: Write + Send> Engine for UciSession<R, W> {
    fn search(&mut self, fen: &str, limit: SearchLimit) -> Result<SearchResult, EngineError> {
        UciSession::search(self, fen, limit)
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Engine child process
// ────────────────────────────────────────────────────────────────────────────────

pub type PipeSession = UciSession<BufReader<ChildStdout>, BufWriter<ChildStdin>>;

pub struct UciEngine {
    child: Child,
    session: PipeSession,
}

impl UciEngine {
    /// Start the engine and complete the `uci`/`isready` handshake.
    pub fn spawn(path: &Path) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(EngineError::MissingPipe("stdout"))?;

        let mut engine = Self {
            child,
            session: UciSession::new(BufReader::new(stdout), BufWriter::new(stdin)),
        };
        engine.session.handshake()?;
        log::info!(
            "engine ready: {}",
            engine.session.name().unwrap_or("unnamed engine")
        );
        Ok(engine)
    }
}

/// Engine coming up on a worker thread. The UI polls it like a search and
/// gives up once `timeout` has passed.
pub struct Startup {
    pending: Pending<Result<SharedEngine, EngineError>>,
    deadline: Instant,
    timeout: Duration,
}

impl Startup {
    pub fn spawn(
        timeout: Duration,
        job: impl FnOnce() -> Result<SharedEngine, EngineError> + Send + 'static,
    ) -> Self {
        Self {
            pending: Pending::spawn(job),
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Spawn the engine at `path` and run `configure` on it once the
    /// handshake is done.
    pub fn process(
        path: &Path,
        timeout: Duration,
        configure: impl FnOnce(&mut UciEngine) -> Result<(), EngineError> + Send + 'static,
    ) -> Self {
        let path = path.to_path_buf();
        Self::spawn(timeout, move || {
            let mut engine = UciEngine::spawn(&path)?;
            configure(&mut engine)?;
            Ok(Arc::new(Mutex::new(engine)) as SharedEngine)
        })
    }

    pub fn poll(&self) -> Poll<Result<SharedEngine, EngineError>> {
        match self.pending.poll() {
            Poll::Waiting if Instant::now() >= self.deadline => {
                Poll::Ready(Err(EngineError::StartupTimeout(self.timeout)))
            }
            other => other,
        }
    }
}

impl Engine for UciEngine {
    fn search(&mut self, fen: &str, limit: SearchLimit) -> Result<SearchResult, EngineError> {
        self.session.search(fen, limit)
    }
}

impl Deref for UciEngine {
    type Target = PipeSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for UciEngine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.session.send("quit");
        let deadline = Instant::now() + QUIT_GRACE;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        log::warn!("engine did not quit in time, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn session(script: &str) -> UciSession<Cursor<Vec<u8>>, Vec<u8>> {
        UciSession::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    fn sent(s: &UciSession<Cursor<Vec<u8>>, Vec<u8>>) -> Vec<String> {
        String::from_utf8(s.writer.clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn parses_centipawn_info() {
        let info = parse_info(
            "info depth 12 seldepth 18 multipv 1 score cp -35 nodes 1000 nps 50000 pv e7e5 g1f3",
        )
        .unwrap();
        assert_eq!(info.depth, Some(12));
        assert_eq!(info.multipv, Some(1));
        assert_eq!(info.score, Some(Score::Centipawns(-35)));
        assert_eq!(info.pv, vec!["e7e5", "g1f3"]);
    }

    #[test]
    fn parses_mate_and_bounds() {
        let info = parse_info("info depth 20 score mate -3 lowerbound pv h7h8").unwrap();
        assert_eq!(info.score, Some(Score::Mate(-3)));
        assert_eq!(info.pv, vec!["h7h8"]);
    }

    #[test]
    fn info_string_is_not_parsed_as_fields() {
        let info = parse_info("info string NNUE evaluation using nn.nnue depth 5").unwrap();
        assert_eq!(info, Info::default());
        assert_eq!(parse_info("bestmove e2e4"), None);
    }

    #[test]
    fn parses_bestmove_variants() {
        assert_eq!(parse_bestmove("bestmove e2e4 ponder e7e5"), Some(Some("e2e4".into())));
        assert_eq!(parse_bestmove("bestmove (none)"), Some(None));
        assert_eq!(parse_bestmove("bestmove 0000"), Some(None));
        assert_eq!(parse_bestmove("info depth 1"), None);
    }

    #[test]
    fn score_text() {
        assert_eq!(Score::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Score::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Score::Mate(3).to_string(), "Mate in 3");
        assert_eq!(Score::Mate(-2).to_string(), "Mated in 2");
        assert_eq!(Score::Mate(2).negate(), Score::Mate(-2));
    }

    #[test]
    fn handshake_records_name() {
        let mut s = session("Stockfish 16 by the Stockfish developers\nid name Stockfish 16\nid author x\noption name Hash type spin\nuciok\nreadyok\n");
        s.handshake().unwrap();
        assert_eq!(s.name(), Some("Stockfish 16"));
        assert_eq!(sent(&s), vec!["uci", "isready"]);
    }

    #[test]
    fn search_keeps_last_scored_info() {
        let mut s = session(
            "info string hello\n\
             info depth 1 score cp 10 pv d2d4\n\
             info depth 2 multipv 2 score cp -50 pv a2a3\n\
             info depth 2 score cp 25 pv e2e4 e7e5\n\
             info depth 2 currmove e2e4 currmovenumber 1\n\
             bestmove e2e4 ponder e7e5\n",
        );
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let r = s.search(fen, SearchLimit::Depth(2)).unwrap();
        assert_eq!(
            r,
            SearchResult {
                best_move: Some("e2e4".into()),
                score: Some(Score::Centipawns(25)),
                depth: 2,
                pv: vec!["e2e4".into(), "e7e5".into()],
            }
        );
        assert_eq!(sent(&s), vec![format!("position fen {fen}"), "go depth 2".to_owned()]);
    }

    #[test]
    fn movetime_limit_is_sent_in_millis() {
        let mut s = session("bestmove (none)\n");
        let r = s
            .search("8/8/8/8/8/8/8/8 w - - 0 1", SearchLimit::MoveTime(Duration::from_millis(750)))
            .unwrap();
        assert_eq!(r.best_move, None);
        assert_eq!(sent(&s)[1], "go movetime 750");
    }

    #[test]
    fn options_and_new_game() {
        let mut s = session("readyok\n");
        s.set_option("Skill Level", 5).unwrap();
        s.new_game().unwrap();
        assert_eq!(
            sent(&s),
            vec!["setoption name Skill Level value 5", "ucinewgame", "isready"]
        );
    }

    #[test]
    fn eof_is_reported_as_closed() {
        let mut s = session("info depth 1 score cp 3\n");
        let err = s.search("x", SearchLimit::Depth(1)).unwrap_err();
        assert!(matches!(err, EngineError::Closed("bestmove")));
    }

    fn ready_within(startup: &Startup, limit: Duration) -> Poll<Result<SharedEngine, EngineError>> {
        let deadline = Instant::now() + limit;
        loop {
            match startup.poll() {
                Poll::Waiting if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
                other => return other,
            }
        }
    }

    #[test]
    fn startup_hands_over_the_engine() {
        let startup = Startup::spawn(Duration::from_secs(5), || {
            Ok(Arc::new(Mutex::new(session("bestmove e2e4\n"))) as SharedEngine)
        });
        let Poll::Ready(Ok(engine)) = ready_within(&startup, Duration::from_secs(5)) else {
            panic!("engine not handed over");
        };
        let r = engine.lock().unwrap().search("x", SearchLimit::Depth(1)).unwrap();
        assert_eq!(r.best_move.as_deref(), Some("e2e4"));
    }

    #[test]
    fn slow_startup_does_not_block_and_times_out() {
        let startup = Startup::spawn(Duration::from_millis(50), || {
            thread::sleep(Duration::from_secs(2));
            Err(EngineError::WorkerGone)
        });
        assert!(matches!(startup.poll(), Poll::Waiting));
        let outcome = ready_within(&startup, Duration::from_secs(1));
        assert!(matches!(outcome, Poll::Ready(Err(EngineError::StartupTimeout(_)))));
    }

    #[cfg(unix)]
    #[test]
    fn silent_process_times_out() {
        // cat echoes `uci` back but never answers `uciok`.
        let startup = Startup::process(Path::new("/bin/cat"), Duration::from_millis(200), |_| Ok(()));
        let outcome = ready_within(&startup, Duration::from_secs(2));
        assert!(matches!(outcome, Poll::Ready(Err(EngineError::StartupTimeout(_)))));
    }

    #[test]
    fn missing_binary_fails_startup() {
        let startup = Startup::process(Path::new("/nonexistent/engine/binary"), Duration::from_secs(5), |_| Ok(()));
        let outcome = ready_within(&startup, Duration::from_secs(5));
        assert!(matches!(outcome, Poll::Ready(Err(EngineError::Spawn { .. }))));
    }

    #[test]
    fn spawning_a_missing_binary_fails_cleanly() {
        let err = UciEngine::spawn(Path::new("/nonexistent/engine/binary")).err().unwrap();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
