use super::*;
use duel_codec::*;
use duel_core::*;
use duel_lobby::*;
use std::sync::Arc;

/// Turns local moves into snapshots and snapshots into service calls.
#[derive(Clone)]
pub struct Pipeline {
    service: Arc<dyn MatchService>,
    clock: Arc<dyn Clock>,
    allowance: Millis,
}

impl Pipeline {
    pub fn new(service: Arc<dyn MatchService>, clock: Arc<dyn Clock>, allowance: Millis) -> Self {
        Self {
            service,
            clock,
            allowance,
        }
    }
    fn local(&self) -> ID<Player> {
        self.service.local()
    }
    fn holding(&self, session: &Session) -> Result<(), SubmitError> {
        if session.is_ended() {
            return Err(SubmitError::NotActive);
        }
        match session.holds_turn(self.local()) {
            true => Ok(()),
            false => Err(SubmitError::NotYourTurn),
        }
    }
}

impl Pipeline {
    /// Builds the snapshot for placing a mark at `cell` from `seat`,
    /// merging the player's symbol preference.
    pub fn play(
        &self,
        snapshot: &GameSnapshot,
        seat: Seat,
        cell: Cell,
        symbol: Option<&str>,
        referee: &dyn Referee,
    ) -> Result<GameSnapshot, SubmitError> {
        let actor = Mark::from_seat(seat);
        if snapshot.position().current() != Some(actor) {
            return Err(SubmitError::NotYourTurn);
        }
        let position = snapshot.position().place(cell, referee)?;
        Ok(snapshot.advance(position, actor, symbol, self.allowance, self.clock.now()))
    }
    /// Commits `next` as the local turn: ends the match on a terminal
    /// position, otherwise hands the turn to the next eligible seat.
    pub async fn submit_turn(
        &self,
        session: &Session,
        next: &GameSnapshot,
    ) -> Result<Session, SubmitError> {
        self.holding(session)?;
        let blob = next.encode();
        let position = next.position();
        if let Some(winner) = position.winner() {
            let outcomes = std::array::from_fn(|seat| match Mark::from_seat(seat) == winner {
                true => Outcome::Won,
                false => Outcome::Lost,
            });
            log::info!("[room {}] {} wins", session.id, winner);
            return Ok(self.service.end_match(session.id, blob, outcomes).await?);
        }
        if position.is_draw() {
            log::info!("[room {}] drawn", session.id);
            return Ok(self
                .service
                .end_match(session.id, blob, [Outcome::Tied; SEATS])
                .await?);
        }
        let seat = session.next_seat().ok_or(SubmitError::NotActive)?;
        log::debug!("[room {}] turn to seat {}", session.id, seat);
        Ok(self.service.submit_turn(session.id, seat, blob).await?)
    }
    /// Leaves the match with a loss, in or out of turn.
    pub async fn resign(
        &self,
        session: &Session,
        snapshot: &GameSnapshot,
    ) -> Result<Session, SubmitError> {
        if session.is_ended() {
            return Err(SubmitError::NotActive);
        }
        log::info!("[room {}] resigning", session.id);
        match session.holds_turn(self.local()) {
            true => {
                let seat = session.next_seat().ok_or(SubmitError::NotActive)?;
                Ok(self
                    .service
                    .quit_in_turn(session.id, seat, snapshot.encode(), Outcome::Lost)
                    .await?)
            }
            false => Ok(self
                .service
                .quit_out_of_turn(session.id, Outcome::Lost)
                .await?),
        }
    }
    /// Forfeits the expired turn. Only the seat holding the turn may do this.
    pub async fn timeout(
        &self,
        session: &Session,
        snapshot: &GameSnapshot,
    ) -> Result<Session, SubmitError> {
        self.holding(session)?;
        let now = self.clock.now();
        if !snapshot.expired(now) {
            return Err(SubmitError::NotExpired);
        }
        let next = snapshot
            .timed_out(self.allowance, now)
            .ok_or(SubmitError::NotActive)?;
        log::info!("[room {}] turn timed out", session.id);
        self.submit_turn(session, &next).await
    }
}
