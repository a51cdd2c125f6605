use holoboard_core::{Actor, ActorProvider, Location, SyntheticPlayer};

/// Longest name a player may have
const MAX_NAME_LEN: usize = 16;

/// Console named `CONSOLE`; synthetic players named `hgs_<id>`, available
/// wherever the board has a world.
#[derive(Debug, Default)]
pub struct HeadlessActors;

impl ActorProvider for HeadlessActors {
    fn console(&self) -> Actor {
        Actor::console("CONSOLE")
    }

    fn synthetic_player(&self, board_id: &str, location: &Location) -> Option<SyntheticPlayer> {
        if !location.has_world() {
            return None;
        }
        let name: String = format!("hgs_{board_id}").chars().take(MAX_NAME_LEN).collect();
        Some(SyntheticPlayer {
            name,
            location: location.clone(),
        })
    }
}
