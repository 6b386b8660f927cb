// Power bomb resolver
//
// The bomb clears every wall whose footprint touches the blast zone around the
// bomber's pawn and hands each wall back to whoever placed it. The bomber may
// also cross the zone freely for the rest of the turn; that exception lives on
// the board as a `TraversalOverride` and is dropped when the turn passes.

use crate::board::{BoardState, TraversalOverride};
use crate::error::IllegalMoveError;
use crate::types::{Player, Wall};

/// Everything needed to take a detonation back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BombOutcome {
    pub player: Player,
    pub removed: Vec<Wall>,
    previous_override: Option<TraversalOverride>,
}

/// Blast zone centred on `player`'s pawn
pub fn blast_zone(state: &BoardState, player: Player) -> TraversalOverride {
    TraversalOverride {
        player,
        center: state.pawn(player),
        radius: state.rules().power_bomb_radius,
    }
}

/// Walls that a detonation by `player` would remove right now
pub fn affected_walls(state: &BoardState, player: Player) -> Vec<Wall> {
    let zone = blast_zone(state, player);
    state
        .walls()
        .filter(|w| w.footprint().iter().any(|&c| zone.contains(c)))
        .collect()
}

/// Whether offering the bomb to the search makes sense: unused and something to hit
pub fn is_worthwhile(state: &BoardState, player: Player) -> bool {
    !state.power_bomb_used(player) && !affected_walls(state, player).is_empty()
}

/// Detonates `player`'s bomb in place. Turn handling is left to the caller.
pub fn detonate(state: &mut BoardState, player: Player) -> Result<BombOutcome, IllegalMoveError> {
    if state.power_bomb_used(player) {
        return Err(IllegalMoveError::PowerBombUsed(player));
    }
    Ok(detonate_unchecked(state, player))
}

pub(crate) fn detonate_unchecked(state: &mut BoardState, player: Player) -> BombOutcome {
    let removed = affected_walls(state, player);
    for wall in &removed {
        state.remove_wall(*wall);
        state.adjust_walls_remaining(wall.owner, 1);
    }
    let previous_override = state.traversal_override();
    state.set_power_bomb_used(player, true);
    state.set_traversal_override(Some(blast_zone(state, player)));
    BombOutcome {
        player,
        removed,
        previous_override,
    }
}

/// Puts every destroyed wall back and takes the returned walls off their owners
pub fn revert(state: &mut BoardState, outcome: &BombOutcome) {
    for wall in &outcome.removed {
        state.insert_wall(*wall);
        state.adjust_walls_remaining(wall.owner, -1);
    }
    state.set_power_bomb_used(outcome.player, false);
    state.set_traversal_override(outcome.previous_override);
}

/// Value-style detonation for `player`; the input state is left untouched
pub fn apply(state: &BoardState, player: Player) -> Result<BoardState, IllegalMoveError> {
    let mut next = state.clone();
    detonate(&mut next, player)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardSnapshot;
    use crate::types::{Coord, Orientation};
    use std::convert::TryFrom;

    fn board_with_walls(walls: Vec<Wall>, remaining: (u32, u32)) -> BoardState {
        let mut snap: BoardSnapshot = BoardState::new(9, 9, 10).unwrap().snapshot();
        snap.pawn_positions.a = Coord::new(4, 4);
        snap.walls = walls;
        snap.walls_remaining.a = remaining.0;
        snap.walls_remaining.b = remaining.1;
        BoardState::try_from(snap).unwrap()
    }

    fn wall(o: Orientation, r: i32, c: i32, owner: Player) -> Wall {
        Wall {
            orientation: o,
            anchor: Coord::new(r, c),
            owner,
        }
    }

    #[test]
    fn test_affected_walls_touch_blast_zone() {
        let near = wall(Orientation::Horizontal, 2, 2, Player::B); // footprint reaches (3,3)
        let far = wall(Orientation::Vertical, 0, 0, Player::A);
        let b = board_with_walls(vec![near, far], (9, 9));
        assert_eq!(affected_walls(&b, Player::A), vec![near]);
    }

    #[test]
    fn test_detonation_returns_walls_to_owners() {
        let mine = wall(Orientation::Horizontal, 4, 4, Player::A);
        let theirs = wall(Orientation::Vertical, 3, 2, Player::B);
        let mut b = board_with_walls(vec![mine, theirs], (9, 9));

        let outcome = detonate(&mut b, Player::A).unwrap();
        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(b.wall_count(), 0);
        assert_eq!(b.walls_remaining(Player::A), 10);
        assert_eq!(b.walls_remaining(Player::B), 10);
        assert!(b.power_bomb_used(Player::A));
        assert!(b.traversal_override().is_some());
    }
}
