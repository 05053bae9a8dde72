//! Duel Simulation Binary
//!
//! Runs two devices against an in-process match hub and record store,
//! plays scripted games between them, and rematches from both sides.
//!
//! Options: --games, --party, --poll, --inbox, --log-file
//! Env: DUEL_LEDGER persists the first device's rating ledger.
use clap::Parser;
use duel_codec::*;
use duel_core::*;
use duel_gameroom::*;
use duel_lobby::*;
use duel_rating::Ledger;
use duel_records::MemoryStore;
use duel_records::RecordStore;
use std::sync::Arc;
use std::time::Duration;

const PATIENCE: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of games to play, rematching between them.
    #[arg(long, default_value_t = 2)]
    games: usize,
    /// Match through a freshly generated party code instead of the open pool.
    #[arg(long)]
    party: bool,
    /// Match-status poll interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    poll: u64,
    /// Inbox poll interval in milliseconds.
    #[arg(long, default_value_t = 400)]
    inbox: u64,
    /// Also write a debug log under logs/.
    #[arg(long)]
    log_file: bool,
}

/// Any full row, column, or diagonal wins.
struct Lines;

impl Referee for Lines {
    fn judge(&self, board: &Board) -> Verdict {
        let n = board.size() as Cell;
        let rows = (0..n).map(|r| (0..n).map(|c| r * n + c).collect::<Vec<Cell>>());
        let cols = (0..n).map(|c| (0..n).map(|r| r * n + c).collect::<Vec<Cell>>());
        let diagonals = [
            (0..n).map(|i| i * n + i).collect::<Vec<Cell>>(),
            (0..n).map(|i| i * n + n - 1 - i).collect::<Vec<Cell>>(),
        ];
        for line in rows.chain(cols).chain(diagonals) {
            let Some(mark) = board.get(line[0]) else {
                continue;
            };
            if line.iter().all(|c| board.get(*c) == Some(mark)) {
                return Verdict::Won { mark, line };
            }
        }
        match board.is_full() {
            true => Verdict::Drawn,
            false => Verdict::Open,
        }
    }
}

struct Device {
    name: &'static str,
    handle: SessionHandle,
}

impl Device {
    async fn until<F>(&self, f: F) -> anyhow::Result<SessionView>
    where
        F: FnMut(&SessionView) -> bool,
    {
        tokio::time::timeout(PATIENCE, self.handle.until(f))
            .await
            .map_err(|_| anyhow::anyhow!("{} timed out", self.name))?
            .ok_or_else(|| anyhow::anyhow!("{} stopped", self.name))
    }
    fn report(&self) {
        let v = self.handle.view();
        println!(
            "{:<6} {:<8} seat {:?} outcome {:?} rating {} h2h {} rematch {:?}",
            self.name,
            v.phase.to_string(),
            v.seat,
            v.outcome,
            v.rating,
            v.tally,
            v.rematch,
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    duel_core::log(args.log_file)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = MatchHub::new(clock.clone());
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::default());
    let config = RoomConfig {
        lobby: LobbyConfig {
            poll: Duration::from_millis(args.poll),
            ..LobbyConfig::default()
        },
        inbox: Duration::from_millis(args.inbox),
        ..RoomConfig::default()
    };
    let ledger = match std::env::var("DUEL_LEDGER") {
        Ok(path) => Ledger::open(path)?,
        Err(_) => Ledger::memory(),
    };
    let mut ledgers = [ledger, Ledger::memory()].into_iter();
    let mut devices = Vec::new();
    for name in ["alice", "bob"] {
        let service = Arc::new(hub.client(ID::default()).await);
        let handle = SessionCoordinator::spawn(Wiring {
            service,
            store: store.clone(),
            referee: Arc::new(Lines),
            clock: clock.clone(),
            ledger: ledgers.next().unwrap_or_else(Ledger::memory),
            config,
        });
        devices.push(Device { name, handle });
    }
    let [alice, bob] =
        <[Device; 2]>::try_from(devices).map_err(|_| anyhow::anyhow!("two devices"))?;
    let (host, guest) = match args.party {
        true => {
            let code = PartyCode::random();
            log::info!("[duel] party code {}", code);
            (Mode::Host(code), Mode::Join(code))
        }
        false => (Mode::Solo, Mode::Solo),
    };
    alice.handle.start(host);
    alice.until(|v| v.phase == Phase::Pending).await?;
    bob.handle.start(guest);
    for game in 1..=args.games {
        let a = alice.until(|v| v.phase == Phase::Active).await?;
        bob.until(|v| v.phase == Phase::Active && v.session == a.session).await?;
        log::info!("[duel] game {} on {:?}", game, a.session);
        play_out(&alice, &bob).await?;
        alice.until(|v| v.phase == Phase::Ended && v.tally.played() as usize >= game).await?;
        bob.until(|v| v.phase == Phase::Ended && v.tally.played() as usize >= game).await?;
        println!("game {}", game);
        println!("{}", alice.handle.view().snapshot.position().board());
        alice.report();
        bob.report();
        if game < args.games {
            alice.handle.rematch();
            bob.handle.rematch();
            alice.until(|v| v.phase != Phase::Ended).await?;
            bob.until(|v| v.phase != Phase::Ended).await?;
        }
    }
    alice.handle.shutdown();
    bob.handle.shutdown();
    Ok(())
}

/// Alternates moves until the game ends, each side taking the lowest free cell.
async fn play_out(alice: &Device, bob: &Device) -> anyhow::Result<()> {
    loop {
        let (a, b) = (alice.handle.view(), bob.handle.view());
        if a.is_over() && b.is_over() {
            return Ok(());
        }
        let mover = match (a.my_turn, b.my_turn) {
            (true, _) => alice,
            (_, true) => bob,
            _ => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                continue;
            }
        };
        let view = mover.handle.view();
        let Some(cell) = view
            .snapshot
            .position()
            .board()
            .cells()
            .iter()
            .position(Option::is_none)
        else {
            return Ok(());
        };
        let cell = cell as Cell;
        mover.handle.place(cell);
        mover
            .until(|v| v.snapshot.position().board().get(cell).is_some() || v.error.is_some())
            .await?;
    }
}
