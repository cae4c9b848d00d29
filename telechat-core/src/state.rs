use crate::actions::ActionListMachine;
use crate::banner::BannerMachine;
use crate::event::RoomSnapshot;

/// Per-connection parsing state owned by the stream processor.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(crate) banner: BannerMachine,
    pub(crate) actions: ActionListMachine,
    pub(crate) action_list_requested: bool,
    pub(crate) room: Option<RoomSnapshot>,
    pub(crate) vocabulary: Vec<String>,
}

impl SessionState {
    /// Snapshot of the last completed banner.
    pub fn room(&self) -> Option<&RoomSnapshot> {
        self.room.as_ref()
    }

    /// Verbs from the last completed action listing.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn action_list_requested(&self) -> bool {
        self.action_list_requested
    }

    pub fn in_banner(&self) -> bool {
        self.banner.is_collecting()
    }

    pub fn in_action_list(&self) -> bool {
        self.actions.is_collecting()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
