//! Shared game logic for the Warbit battle contracts.
//!
//! Everything in this crate is deterministic and persistence-free: winner
//! determination is a set of pure functions over plain values, so it can be
//! tested exhaustively without deploying a contract. The battle contract
//! stores these types inside its records and calls the functions at round
//! boundaries.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contracttype, Vec};

/// Round-wins required to take a rock-paper-scissors match (best-of-3).
pub const RPS_ROUNDS_TO_WIN: u32 = 2;

/// The mini-game a battle is played as. Required on every proposal; there is
/// no default variant.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GameVariant {
    Runner = 0,
    Flyer = 1,
    Racer = 2,
    Rps = 3,
}

impl GameVariant {
    /// Score-reporting variants share one resolution path; RPS has its own.
    pub fn is_score_based(&self) -> bool {
        !matches!(self, GameVariant::Rps)
    }
}

/// Which of the two participants a turn or view refers to.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Challenger = 0,
    Opponent = 1,
}

/// Outcome of a round or a whole match.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Winner {
    Challenger = 0,
    Opponent = 1,
    Draw = 2,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RpsMove {
    Rock = 0,
    Paper = 1,
    Scissors = 2,
}

/// A move slot inside a stored round. `Option<RpsMove>` has no `ScVal`
/// representation, so persisted slots carry their own empty state.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RpsSlot {
    Empty,
    Filled(RpsMove),
}

impl RpsSlot {
    pub fn get(&self) -> Option<RpsMove> {
        match self {
            RpsSlot::Empty => None,
            RpsSlot::Filled(mv) => Some(*mv),
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, RpsSlot::Filled(_))
    }
}

/// A winner slot for stored battle records; same `ScVal` constraint as
/// [`RpsSlot`].
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WinnerSlot {
    Undecided,
    Decided(Winner),
}

impl WinnerSlot {
    pub fn get(&self) -> Option<Winner> {
        match self {
            WinnerSlot::Undecided => None,
            WinnerSlot::Decided(w) => Some(*w),
        }
    }
}

/// One best-of-3 round. A slot is empty until its owner submits; the round
/// is closed once both slots are filled.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RpsRound {
    pub challenger_move: RpsSlot,
    pub opponent_move: RpsSlot,
}

impl RpsRound {
    pub fn is_closed(&self) -> bool {
        self.challenger_move.is_filled() && self.opponent_move.is_filled()
    }
}

/// Closed-round wins per side. Drawn rounds count for neither.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RpsTally {
    pub challenger: u32,
    pub opponent: u32,
}

/// Winner of a score battle: higher total wins, equal totals draw.
pub fn score_outcome(challenger: u32, opponent: u32) -> Winner {
    if challenger > opponent {
        Winner::Challenger
    } else if opponent > challenger {
        Winner::Opponent
    } else {
        Winner::Draw
    }
}

/// Winner of a single closed RPS round: standard cyclic dominance, equal
/// moves draw the round.
pub fn rps_round_outcome(challenger: RpsMove, opponent: RpsMove) -> Winner {
    match (challenger, opponent) {
        (RpsMove::Rock, RpsMove::Scissors) => Winner::Challenger,
        (RpsMove::Scissors, RpsMove::Paper) => Winner::Challenger,
        (RpsMove::Paper, RpsMove::Rock) => Winner::Challenger,
        (RpsMove::Scissors, RpsMove::Rock) => Winner::Opponent,
        (RpsMove::Paper, RpsMove::Scissors) => Winner::Opponent,
        (RpsMove::Rock, RpsMove::Paper) => Winner::Opponent,
        _ => Winner::Draw,
    }
}

/// Count round-wins over the closed rounds of a log. Open rounds (one slot
/// still empty) are ignored.
pub fn rps_tally(rounds: &Vec<RpsRound>) -> RpsTally {
    let mut tally = RpsTally {
        challenger: 0,
        opponent: 0,
    };
    for round in rounds.iter() {
        if let (Some(c), Some(o)) = (round.challenger_move.get(), round.opponent_move.get()) {
            match rps_round_outcome(c, o) {
                Winner::Challenger => tally.challenger += 1,
                Winner::Opponent => tally.opponent += 1,
                Winner::Draw => {}
            }
        }
    }
    tally
}

/// Match winner once a side reaches [`RPS_ROUNDS_TO_WIN`]; `None` while the
/// match is still open.
pub fn rps_match_winner(tally: &RpsTally) -> Option<Winner> {
    if tally.challenger >= RPS_ROUNDS_TO_WIN {
        Some(Winner::Challenger)
    } else if tally.opponent >= RPS_ROUNDS_TO_WIN {
        Some(Winner::Opponent)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::{vec, Env};

    #[test]
    fn score_outcome_truth_table() {
        assert_eq!(score_outcome(12, 9), Winner::Challenger);
        assert_eq!(score_outcome(9, 12), Winner::Opponent);
        assert_eq!(score_outcome(7, 7), Winner::Draw);
        assert_eq!(score_outcome(0, 0), Winner::Draw);
        assert_eq!(score_outcome(1, 0), Winner::Challenger);
        assert_eq!(score_outcome(0, 1), Winner::Opponent);
        assert_eq!(score_outcome(u32::MAX, u32::MAX - 1), Winner::Challenger);
    }

    #[test]
    fn score_outcome_is_antisymmetric() {
        let samples = [0u32, 1, 2, 7, 100, 4096, u32::MAX];
        for &a in &samples {
            for &b in &samples {
                let forward = score_outcome(a, b);
                let reverse = score_outcome(b, a);
                match forward {
                    Winner::Challenger => assert_eq!(reverse, Winner::Opponent),
                    Winner::Opponent => assert_eq!(reverse, Winner::Challenger),
                    Winner::Draw => {
                        assert_eq!(a, b);
                        assert_eq!(reverse, Winner::Draw);
                    }
                }
            }
        }
    }

    #[test]
    fn rps_all_nine_pairs() {
        use RpsMove::*;
        for m in [Rock, Paper, Scissors] {
            assert_eq!(rps_round_outcome(m, m), Winner::Draw);
        }
        assert_eq!(rps_round_outcome(Rock, Scissors), Winner::Challenger);
        assert_eq!(rps_round_outcome(Scissors, Paper), Winner::Challenger);
        assert_eq!(rps_round_outcome(Paper, Rock), Winner::Challenger);
        assert_eq!(rps_round_outcome(Scissors, Rock), Winner::Opponent);
        assert_eq!(rps_round_outcome(Paper, Scissors), Winner::Opponent);
        assert_eq!(rps_round_outcome(Rock, Paper), Winner::Opponent);
    }

    #[test]
    fn rps_every_move_beats_and_loses_to_exactly_one() {
        use RpsMove::*;
        for m in [Rock, Paper, Scissors] {
            let mut wins = 0;
            let mut losses = 0;
            for other in [Rock, Paper, Scissors] {
                match rps_round_outcome(m, other) {
                    Winner::Challenger => wins += 1,
                    Winner::Opponent => losses += 1,
                    Winner::Draw => {}
                }
            }
            assert_eq!(wins, 1);
            assert_eq!(losses, 1);
        }
    }

    fn closed(c: RpsMove, o: RpsMove) -> RpsRound {
        RpsRound {
            challenger_move: RpsSlot::Filled(c),
            opponent_move: RpsSlot::Filled(o),
        }
    }

    #[test]
    fn slots_report_their_contents() {
        assert_eq!(RpsSlot::Empty.get(), None);
        assert!(!RpsSlot::Empty.is_filled());
        assert_eq!(RpsSlot::Filled(RpsMove::Rock).get(), Some(RpsMove::Rock));
        assert!(RpsSlot::Filled(RpsMove::Rock).is_filled());

        assert_eq!(WinnerSlot::Undecided.get(), None);
        assert_eq!(
            WinnerSlot::Decided(Winner::Draw).get(),
            Some(Winner::Draw)
        );
    }

    #[test]
    fn tally_skips_open_and_drawn_rounds() {
        use RpsMove::*;
        let env = Env::default();
        let rounds = vec![
            &env,
            closed(Rock, Scissors), // challenger takes round 1
            closed(Paper, Paper),   // drawn, counts for neither
            closed(Scissors, Rock), // opponent takes round 3
            RpsRound {
                challenger_move: RpsSlot::Filled(Rock),
                opponent_move: RpsSlot::Empty, // open, ignored
            },
        ];
        let tally = rps_tally(&rounds);
        assert_eq!(tally.challenger, 1);
        assert_eq!(tally.opponent, 1);
        assert_eq!(rps_match_winner(&tally), None);
    }

    #[test]
    fn best_of_three_first_to_two() {
        use RpsMove::*;
        let env = Env::default();

        // Two straight wins close the match.
        let rounds = vec![&env, closed(Rock, Scissors), closed(Paper, Rock)];
        let tally = rps_tally(&rounds);
        assert_eq!(rps_match_winner(&tally), Some(Winner::Challenger));

        // A drawn round in between does not count toward the two.
        let rounds = vec![
            &env,
            closed(Rock, Scissors),
            closed(Rock, Rock),
            closed(Rock, Paper),
            closed(Scissors, Paper),
        ];
        let tally = rps_tally(&rounds);
        assert_eq!(tally.challenger, 2);
        assert_eq!(tally.opponent, 1);
        assert_eq!(rps_match_winner(&tally), Some(Winner::Challenger));
    }
}
