use super::*;
use duel_core::*;
use duel_lobby::Mode;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Cloneable front end to a running [`SessionCoordinator`].
///
/// Commands are fire-and-forget; results show up on the view.
#[derive(Clone)]
pub struct SessionHandle {
    commands: UnboundedSender<Command>,
    view: watch::Receiver<SessionView>,
    token: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: UnboundedSender<Command>,
        view: watch::Receiver<SessionView>,
        token: CancellationToken,
    ) -> Self {
        Self {
            commands,
            view,
            token,
        }
    }
    /// Queues a command. Returns false once the coordinator has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }
    pub fn start(&self, mode: Mode) -> bool {
        self.send(Command::Start(mode))
    }
    pub fn cancel(&self) -> bool {
        self.send(Command::Cancel)
    }
    pub fn refresh(&self) -> bool {
        self.send(Command::Refresh)
    }
    pub fn place(&self, cell: Cell) -> bool {
        self.send(Command::Place(cell))
    }
    pub fn resign(&self) -> bool {
        self.send(Command::Resign)
    }
    pub fn symbol(&self, symbol: impl Into<String>) -> bool {
        self.send(Command::Symbol(symbol.into()))
    }
    pub fn rematch(&self) -> bool {
        self.send(Command::Rematch)
    }
    pub fn accept_rematch(&self) -> bool {
        self.send(Command::AcceptRematch)
    }
    pub fn decline_rematch(&self) -> bool {
        self.send(Command::DeclineRematch)
    }
    pub fn befriend(&self, player: ID<Player>) -> bool {
        self.send(Command::Befriend(player))
    }
    pub fn answer_friend(&self, sender: ID<Player>, accept: bool) -> bool {
        self.send(Command::AnswerFriend(sender, accept))
    }
    /// The latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }
    /// A fresh subscription to view updates.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }
    /// Waits for a view satisfying `f`. None if the coordinator stopped first.
    pub async fn until<F>(&self, f: F) -> Option<SessionView>
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut view = self.view.clone();
        view.wait_for(f).await.ok().map(|v| v.clone())
    }
    /// Stops the coordinator and every task it spawned.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
        self.token.cancel();
    }
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}
