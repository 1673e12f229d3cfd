// Team partitioning: groups one match's slots by team number.

use crate::model::{SlotRecord, Team};

/// Group participants into teams.
///
/// Empty slots are skipped. Teams appear in the order their number is first
/// seen, and players keep their slot order within a team. A missing or
/// negative team number is a regular grouping key (solo-queue lobbies often
/// leave it unset).
pub fn partition(slots: &[SlotRecord]) -> Vec<Team> {
    let mut teams: Vec<Team> = Vec::new();

    for slot in slots.iter().filter(|s| s.is_participant()) {
        match teams.iter_mut().find(|t| t.number == slot.team) {
            Some(team) => team.players.push(slot.clone()),
            None => teams.push(Team {
                number: slot.team,
                players: vec![slot.clone()],
            }),
        }
    }

    teams
}
