//! Two-device scenarios against the in-process hub and record store.
use super::*;
use duel_codec::*;
use duel_core::*;
use duel_lobby::*;
use duel_rating::Ledger;
use duel_records::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

/// Three in a row, column, or diagonal.
struct Lines;

impl Referee for Lines {
    fn judge(&self, board: &Board) -> Verdict {
        let n = board.size() as Cell;
        let mut lines = Vec::new();
        for i in 0..n {
            lines.push((0..n).map(|j| i * n + j).collect::<Vec<Cell>>());
            lines.push((0..n).map(|j| j * n + i).collect::<Vec<Cell>>());
        }
        lines.push((0..n).map(|i| i * n + i).collect());
        lines.push((0..n).map(|i| i * n + (n - 1 - i)).collect());
        for line in lines {
            if let Some(mark) = board.get(line[0]) {
                if line.iter().all(|c| board.get(*c) == Some(mark)) {
                    return Verdict::Won { mark, line };
                }
            }
        }
        match board.is_full() {
            true => Verdict::Drawn,
            false => Verdict::Open,
        }
    }
}

struct Table {
    clock: ManualClock,
    hub: MatchHub,
    store: MemoryStore,
}

struct Device {
    player: ID<Player>,
    handle: SessionHandle,
}

impl Table {
    fn new() -> Self {
        let clock = ManualClock::at(1_000_000);
        Self {
            hub: MatchHub::new(Arc::new(clock.clone())),
            store: MemoryStore::default(),
            clock,
        }
    }
    fn config() -> RoomConfig {
        RoomConfig {
            lobby: LobbyConfig {
                poll: Duration::from_millis(20),
                ..LobbyConfig::default()
            },
            inbox: Duration::from_millis(20),
            tick: Duration::from_millis(10),
            ..RoomConfig::default()
        }
    }
    async fn device(&self) -> Device {
        let player = ID::default();
        let handle = SessionCoordinator::spawn(Wiring {
            service: Arc::new(self.hub.client(player).await),
            store: Arc::new(self.store.clone()),
            referee: Arc::new(Lines),
            clock: Arc::new(self.clock.clone()),
            ledger: Ledger::memory(),
            config: Self::config(),
        });
        Device { player, handle }
    }
    /// Two devices seated in one bootstrapped open match; the first plays X.
    async fn matched(&self) -> (Device, Device) {
        let (x, o) = (self.device().await, self.device().await);
        x.handle.start(Mode::Solo);
        until(&x, |v| v.phase == Phase::Pending).await;
        o.handle.start(Mode::Solo);
        until(&x, |v| v.phase == Phase::Active && v.my_turn).await;
        until(&o, |v| v.phase == Phase::Active && v.snapshot.turn_started_at() > 0).await;
        (x, o)
    }
}

async fn until<F>(device: &Device, f: F) -> SessionView
where
    F: FnMut(&SessionView) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), device.handle.until(f))
        .await
        .expect("view never matched")
        .expect("coordinator stopped")
}

/// Plays `cell` once it is this device's turn.
async fn play(device: &Device, cell: Cell) {
    until(device, |v| v.my_turn).await;
    device.handle.place(cell);
    until(device, |v| v.snapshot.position().board().get(cell).is_some()).await;
}

/// X takes the top row while O plays the middle row.
async fn x_wins(x: &Device, o: &Device) {
    for (device, cell) in [(x, 0), (o, 3), (x, 1), (o, 4), (x, 2)] {
        play(device, cell).await;
    }
    until(x, |v| v.phase == Phase::Ended).await;
    until(o, |v| v.phase == Phase::Ended).await;
}

#[tokio::test]
async fn a_win_settles_ratings_and_head_to_head() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    assert_eq!(x.handle.view().seat, Some(0));
    assert_eq!(o.handle.view().opponent, Some(x.player));
    until(&x, |v| v.opponent_online == Some(true)).await;
    x_wins(&x, &o).await;
    let xv = until(&x, |v| v.tally.wins == 1).await;
    let ov = until(&o, |v| v.tally.losses == 1).await;
    assert_eq!(xv.outcome, Outcome::Won);
    assert_eq!(ov.outcome, Outcome::Lost);
    assert_eq!(xv.rating, 1516);
    assert_eq!(ov.rating, 1484);
    assert_eq!(xv.snapshot.position().winner(), Some(Mark::X));
    assert_eq!(xv.snapshot.position().winning_line(), Some(&[0, 1, 2][..]));
}

#[tokio::test]
async fn rematch_from_both_sides_creates_one_successor() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    let origin = x.handle.view().session;
    x_wins(&x, &o).await;
    x.handle.rematch();
    o.handle.rematch();
    let xv = until(&x, |v| v.phase == Phase::Active && v.session != origin).await;
    let ov = until(&o, |v| v.phase == Phase::Active && v.session != origin).await;
    assert_eq!(xv.session, ov.session);
    assert_eq!(table.hub.sessions().await.len(), 2);
    let successor = table.hub.session(xv.session.unwrap()).await.unwrap();
    assert!(!successor.blob.is_empty());
    assert_eq!(xv.rematch, RematchState::None);
}

#[tokio::test]
async fn declined_rematch_is_final() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    x_wins(&x, &o).await;
    x.handle.rematch();
    until(&x, |v| v.rematch == RematchState::Offered).await;
    until(&o, |v| v.rematch == RematchState::Incoming).await;
    o.handle.decline_rematch();
    until(&x, |v| v.rematch == RematchState::Declined).await;
    x.handle.rematch();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(x.handle.view().rematch, RematchState::Declined);
    assert_eq!(table.hub.sessions().await.len(), 1);
}

#[tokio::test]
async fn only_the_holder_forfeits_an_expired_turn() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    table.clock.advance(TURN_ALLOWANCE + 1);
    let ov = until(&o, |v| v.my_turn).await;
    assert_eq!(ov.snapshot.position().current(), Some(Mark::O));
    assert!(ov.snapshot.position().moves().is_empty());
    assert_eq!(ov.snapshot.stamped(Mark::X), 0);
    let id = ov.session.unwrap();
    let session = table.hub.session(id).await.unwrap();
    assert!(!session.is_ended());
    assert!(session.holds_turn(o.player));
    assert!(!x.handle.view().my_turn);
}

#[tokio::test]
async fn resigning_hands_the_opponent_the_win() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    o.handle.resign();
    let ov = until(&o, |v| v.phase == Phase::Ended).await;
    let xv = until(&x, |v| v.phase == Phase::Ended).await;
    assert_eq!(ov.outcome, Outcome::Lost);
    assert_eq!(xv.outcome, Outcome::Won);
    until(&x, |v| v.rating == 1516).await;
    until(&o, |v| v.rating == 1484).await;
}

#[tokio::test]
async fn sign_out_stops_the_coordinator_polling() {
    let table = Table::new();
    let device = table.device().await;
    table.hub.revoke(device.player).await;
    device.handle.start(Mode::Solo);
    let view = until(&device, |v| v.signed_out).await;
    assert!(view.error.is_some());
    device.handle.start(Mode::Solo);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(table.hub.sessions().await.is_empty());
}

#[tokio::test]
async fn cancelling_a_search_removes_the_unjoined_session() {
    let table = Table::new();
    let device = table.device().await;
    device.handle.start(Mode::Host(PartyCode::random()));
    until(&device, |v| v.phase == Phase::Pending).await;
    assert_eq!(table.hub.sessions().await.len(), 1);
    device.handle.cancel();
    until(&device, |v| v.phase == Phase::Idle).await;
    for _ in 0..50 {
        if table.hub.sessions().await.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("unjoined session survived cancel");
}

#[tokio::test]
async fn failed_status_polls_retry_without_surfacing_an_error() {
    let table = Table::new();
    let device = table.device().await;
    device.handle.start(Mode::Host(PartyCode::random()));
    until(&device, |v| v.phase == Phase::Pending).await;
    table.hub.offline(true).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = device.handle.view();
    assert_eq!(view.phase, Phase::Pending);
    assert_eq!(view.error, None);
    table.hub.offline(false).await;
    let guest = table.device().await;
    let code = view.party.expect("host has a party code");
    guest.handle.start(Mode::Join(code));
    until(&device, |v| v.phase == Phase::Active).await;
}

#[tokio::test]
async fn friend_requests_reach_the_receiver() {
    let table = Table::new();
    let (a, b) = (table.device().await, table.device().await);
    a.handle.befriend(b.player);
    until(&b, |v| v.friend_requests.contains(&a.player)).await;
    b.handle.answer_friend(a.player, true);
    until(&b, |v| v.friend_requests.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(b.handle.view().friend_requests.is_empty());
}

#[tokio::test]
async fn moves_out_of_turn_are_refused_locally() {
    let table = Table::new();
    let (x, o) = table.matched().await;
    o.handle.place(4);
    let ov = until(&o, |v| v.error.is_some()).await;
    assert!(ov.snapshot.position().moves().is_empty());
    play(&x, 4).await;
    until(&o, |v| v.my_turn).await;
    o.handle.place(4);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let ov = o.handle.view();
    assert!(ov.my_turn);
    assert_eq!(ov.snapshot.position().moves().len(), 1);
    assert_eq!(ov.snapshot.position().board().get(4), Some(Mark::X));
}

#[tokio::test]
async fn shutdown_stops_the_actor() {
    let table = Table::new();
    let device = table.device().await;
    device.handle.shutdown();
    assert!(device.handle.is_shutdown());
    let stopped =
        tokio::time::timeout(Duration::from_secs(1), device.handle.until(|_| false)).await;
    assert_eq!(stopped.ok().flatten(), None);
}
