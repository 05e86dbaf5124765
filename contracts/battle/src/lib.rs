//! Warbit Battle Contract
//!
//! Turn resolution and settlement for two-player staked battles. Two clients
//! never talk to each other: each submits its turns against the shared battle
//! record stored here and re-renders from the merged state, polling events
//! for the opponent's writes.
//!
//! ## Battle Flow
//! 1. Challenger calls `create_proposal` → their stake transfers into escrow.
//! 2. Opponent calls `accept_proposal` (their stake transfers in, battle
//!    record created in one invocation) or `decline_proposal` (challenger
//!    refunded).
//! 3. Each side independently calls `submit_turn`; the turn log is merged as
//!    one value inside the invocation, so concurrent submits cannot lose an
//!    update — the ledger serializes invocations against the contract.
//! 4. When the merge detects completion the winner is computed from the pure
//!    functions in `warbit-shared` and both warriors' records are updated.
//! 5. `finalize` flips the battle to its terminal status and pays out.
//!
//! ## Settlement
//! The winner takes `2 * stake`; a draw refunds each side its own stake as
//! two independent transfers. The status flip to `Finalized` is persisted
//! before any transfer is attempted, and each side carries a `paid` flag, so
//! a failed transfer leaves the battle decided with settlement in
//! `PaymentPending` — retryable via `retry_settlement` without ever paying a
//! side twice. "Battle not decided" and "payment pending" are never
//! conflated.
//!
//! ## Forfeiture
//! A battle whose opponent walks away does not hang forever: once the turn
//! deadline passes, the side that already submitted can `claim_forfeit` and
//! take the win through the normal completion path.

#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Env, Vec,
};

use warbit_shared::{
    rps_match_winner, rps_tally, score_outcome, GameVariant, RpsMove, RpsRound, RpsSlot, Side,
    Winner, WinnerSlot,
};
use warbit_warrior_registry::{MatchOutcome, WarriorRegistryClient};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Starting display health; RPS round losses chip it away.
const FULL_HEALTH: u32 = 100;
const RPS_ROUND_DAMAGE: u32 = 50;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized       = 1,
    NotInitialized           = 2,
    InvalidStake             = 3,
    SelfChallenge            = 4,
    ProposalAlreadyExists    = 5,
    ProposalNotFound         = 6,
    AlreadyResolved          = 7,
    NotAParticipant          = 8,
    BattleNotFound           = 9,
    BattleNotInProgress      = 10,
    InvalidPayloadForVariant = 11,
    MoveAlreadySubmitted     = 12,
    BattleNotCompleted       = 13,
    BattleNotFinalized       = 14,
    AlreadyFinalized         = 15,
    SettlementAlreadyPaid    = 16,
    ForfeitNotAvailable      = 17,
    DeadlineNotReached       = 18,
    InvalidDeadline          = 19,
    Overflow                 = 20,
    UnknownWarrior           = 21,
    WarriorNotOwned          = 22,
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    Token,
    Registry,
    TurnDeadlineSecs,
    Proposal(u64),
    Battle(u64),
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProposalStatus {
    Pending = 0,
    Accepted = 1,
    Declined = 2,
}

/// A pending challenge. Terminal once accepted or declined; never mutated
/// after that.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BattleProposal {
    pub proposal_id: u64,
    pub challenger: Address,
    pub challenger_warrior: u64,
    pub opponent: Address,
    pub opponent_warrior: u64,
    pub stake: i128,
    pub variant: GameVariant,
    pub status: ProposalStatus,
}

/// Status only ever moves forward: InProgress → Completed → Finalized.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BattleStatus {
    InProgress = 0,
    Completed = 1,
    Finalized = 2,
}

/// Settlement sub-state, tracked separately from the battle status so
/// "decided" and "paid" remain distinguishable.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SettlementStatus {
    Unsettled = 0,
    PaymentPending = 1,
    Paid = 2,
}

/// One side's score report for a score-based battle. Immutable once the
/// round closes; the owner may overwrite it while waiting for the opponent.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScoreTurn {
    pub player: Side,
    pub score: u32,
    pub submitted_at: u64,
}

/// Turn history, tagged by variant so one record type serves every
/// mini-game. The whole log is read, merged, and written as one value.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TurnLog {
    Score(Vec<ScoreTurn>),
    Rps(Vec<RpsRound>),
}

/// The live state of an accepted match. Append-only history; never deleted.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BattleRecord {
    pub battle_id: u64,
    pub proposal_id: u64,
    pub challenger: Address,
    pub challenger_warrior: u64,
    pub opponent: Address,
    pub opponent_warrior: u64,
    pub stake: i128,
    pub variant: GameVariant,
    pub status: BattleStatus,
    pub turns: TurnLog,
    /// Set exactly once, in the same write that sets `Completed`.
    pub winner: WinnerSlot,
    pub settlement: SettlementStatus,
    pub challenger_paid: bool,
    pub opponent_paid: bool,
    /// Bumped on every write; cheap change detection for polling clients.
    pub version: u32,
    pub created_at: u64,
    pub updated_at: u64,
    /// Zero until the battle is finalized.
    pub finalized_at: u64,
    /// Ledger time after which the waiting side may claim a forfeit.
    pub deadline_at: u64,
}

/// A player's round contribution: a score report or an RPS move, matching
/// the battle's variant.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TurnPayload {
    Score(u32),
    Move(RpsMove),
}

/// Per-call settlement summary. UI feedback only — the token ledger is the
/// source of truth, so this is built fresh on every call and never stored.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SettlementResult {
    pub battle_id: u64,
    pub outcome: Winner,
    pub token: Address,
    pub amount_to_challenger: i128,
    pub amount_to_opponent: i128,
    pub fully_paid: bool,
}

/// Everything a client needs to render "waiting for opponent", "your turn",
/// "results decided, payment pending" or "results decided, payment complete"
/// without a second round trip. Health values are cosmetic, derived from
/// round losses.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BattleView {
    pub battle_id: u64,
    pub status: BattleStatus,
    pub variant: GameVariant,
    pub your_side: Side,
    pub your_turn_recorded: bool,
    pub opponent_turn_recorded: bool,
    pub challenger_score: u32,
    pub opponent_score: u32,
    pub challenger_round_wins: u32,
    pub opponent_round_wins: u32,
    pub challenger_health: u32,
    pub opponent_health: u32,
    pub winner: WinnerSlot,
    pub settlement: SettlementStatus,
    pub version: u32,
    pub deadline_at: u64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct ProposalCreated {
    #[topic]
    pub proposal_id: u64,
    #[topic]
    pub challenger: Address,
    pub opponent: Address,
    pub stake: i128,
    pub variant: GameVariant,
}

#[contractevent]
pub struct ProposalAccepted {
    #[topic]
    pub proposal_id: u64,
    #[topic]
    pub opponent: Address,
    pub battle_id: u64,
}

#[contractevent]
pub struct ProposalDeclined {
    #[topic]
    pub proposal_id: u64,
    #[topic]
    pub opponent: Address,
}

#[contractevent]
pub struct TurnSubmitted {
    #[topic]
    pub battle_id: u64,
    #[topic]
    pub player: Address,
    pub version: u32,
}

#[contractevent]
pub struct BattleCompleted {
    #[topic]
    pub battle_id: u64,
    pub winner: Winner,
}

#[contractevent]
pub struct BattleForfeited {
    #[topic]
    pub battle_id: u64,
    pub winner: Winner,
}

#[contractevent]
pub struct SettlementPaid {
    #[topic]
    pub battle_id: u64,
    pub outcome: Winner,
    pub amount_to_challenger: i128,
    pub amount_to_opponent: i128,
}

#[contractevent]
pub struct SettlementPending {
    #[topic]
    pub battle_id: u64,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct Battle;

#[contractimpl]
impl Battle {
    /// Initialize the battle contract.
    ///
    /// `registry` must be a deployed warrior-registry with this contract
    /// authorized as a writer. `turn_deadline_secs` is the time a waiting
    /// player must allow before claiming a forfeit.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        registry: Address,
        turn_deadline_secs: u64,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        if turn_deadline_secs == 0 {
            return Err(Error::InvalidDeadline);
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::Registry, &registry);
        env.storage()
            .instance()
            .set(&DataKey::TurnDeadlineSecs, &turn_deadline_secs);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Proposal lifecycle
    // -----------------------------------------------------------------------

    /// Challenge another warrior. The challenger's stake transfers into
    /// escrow immediately; it is returned if the opponent declines.
    ///
    /// Both warriors must exist in the registry and belong to the side
    /// staking them; this is checked before any token moves, so a bad id can
    /// never lock escrowed funds behind an unfinishable battle.
    ///
    /// `variant` is required — there is no default mini-game.
    pub fn create_proposal(
        env: Env,
        challenger: Address,
        proposal_id: u64,
        challenger_warrior: u64,
        opponent: Address,
        opponent_warrior: u64,
        stake: i128,
        variant: GameVariant,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        challenger.require_auth();

        if stake <= 0 {
            return Err(Error::InvalidStake);
        }
        if challenger == opponent {
            return Err(Error::SelfChallenge);
        }

        let key = DataKey::Proposal(proposal_id);
        if env.storage().persistent().has(&key) {
            return Err(Error::ProposalAlreadyExists);
        }

        require_owned_warrior(&env, challenger_warrior, &challenger)?;
        require_owned_warrior(&env, opponent_warrior, &opponent)?;

        // Escrow the challenger's stake.
        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(
            &challenger,
            &env.current_contract_address(),
            &stake,
        );

        let proposal = BattleProposal {
            proposal_id,
            challenger: challenger.clone(),
            challenger_warrior,
            opponent: opponent.clone(),
            opponent_warrior,
            stake,
            variant,
            status: ProposalStatus::Pending,
        };
        save_proposal(&env, &proposal);

        ProposalCreated {
            proposal_id,
            challenger,
            opponent,
            stake,
            variant,
        }
        .publish(&env);
        Ok(())
    }

    /// Accept a pending proposal: escrow the opponent's stake, mark the
    /// proposal accepted, and create the live battle record — all in one
    /// invocation, so there is no window where a proposal is accepted but no
    /// battle exists.
    ///
    /// Only the challenged opponent may accept; a resolved proposal returns
    /// `AlreadyResolved` (double-click and accept/decline races are benign).
    pub fn accept_proposal(
        env: Env,
        proposal_id: u64,
        opponent: Address,
    ) -> Result<BattleRecord, Error> {
        require_initialized(&env)?;
        let mut proposal = get_proposal(&env, proposal_id)?;

        opponent.require_auth();
        if opponent != proposal.opponent {
            return Err(Error::NotAParticipant);
        }
        if proposal.status != ProposalStatus::Pending {
            return Err(Error::AlreadyResolved);
        }
        require_owned_warrior(&env, proposal.opponent_warrior, &opponent)?;

        // Escrow the opponent's stake alongside the challenger's.
        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(
            &opponent,
            &env.current_contract_address(),
            &proposal.stake,
        );

        proposal.status = ProposalStatus::Accepted;
        save_proposal(&env, &proposal);

        let now = env.ledger().timestamp();
        let deadline = now
            .checked_add(get_turn_deadline_secs(&env))
            .ok_or(Error::Overflow)?;

        let turns = if proposal.variant.is_score_based() {
            TurnLog::Score(Vec::new(&env))
        } else {
            TurnLog::Rps(Vec::new(&env))
        };
        let battle = BattleRecord {
            battle_id: proposal_id,
            proposal_id,
            challenger: proposal.challenger.clone(),
            challenger_warrior: proposal.challenger_warrior,
            opponent: proposal.opponent.clone(),
            opponent_warrior: proposal.opponent_warrior,
            stake: proposal.stake,
            variant: proposal.variant,
            status: BattleStatus::InProgress,
            turns,
            winner: WinnerSlot::Undecided,
            settlement: SettlementStatus::Unsettled,
            challenger_paid: false,
            opponent_paid: false,
            version: 1,
            created_at: now,
            updated_at: now,
            finalized_at: 0,
            deadline_at: deadline,
        };
        store_battle(&env, &battle);

        ProposalAccepted {
            proposal_id,
            opponent,
            battle_id: proposal_id,
        }
        .publish(&env);
        Ok(battle)
    }

    /// Decline a pending proposal and refund the challenger's escrowed
    /// stake. Same guards as `accept_proposal`.
    pub fn decline_proposal(env: Env, proposal_id: u64, opponent: Address) -> Result<(), Error> {
        require_initialized(&env)?;
        let mut proposal = get_proposal(&env, proposal_id)?;

        opponent.require_auth();
        if opponent != proposal.opponent {
            return Err(Error::NotAParticipant);
        }
        if proposal.status != ProposalStatus::Pending {
            return Err(Error::AlreadyResolved);
        }

        proposal.status = ProposalStatus::Declined;
        save_proposal(&env, &proposal);

        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(
            &env.current_contract_address(),
            &proposal.challenger,
            &proposal.stake,
        );

        ProposalDeclined {
            proposal_id,
            opponent,
        }
        .publish(&env);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn submission & merge
    // -----------------------------------------------------------------------

    /// Submit a turn for the authenticated caller and merge it into the
    /// shared turn log. The caller's side is derived from their address —
    /// never from the payload.
    ///
    /// Score variants may overwrite their own entry while the round is still
    /// open; an RPS move is immutable once placed. When the merge closes the
    /// final round, the winner is computed and both warriors' records are
    /// updated — exactly once, in the same invocation.
    pub fn submit_turn(
        env: Env,
        battle_id: u64,
        caller: Address,
        payload: TurnPayload,
    ) -> Result<BattleView, Error> {
        require_initialized(&env)?;
        let mut battle = get_battle_record(&env, battle_id)?;

        if battle.status != BattleStatus::InProgress {
            return Err(Error::BattleNotInProgress);
        }
        caller.require_auth();
        let side = side_of(&battle, &caller)?;

        let now = env.ledger().timestamp();
        let mut turns = battle.turns.clone();
        match (&mut turns, &payload) {
            (TurnLog::Score(log), TurnPayload::Score(score)) => {
                merge_score_turn(log, side, *score, now);
            }
            (TurnLog::Rps(rounds), TurnPayload::Move(mv)) => {
                merge_rps_move(rounds, side, *mv)?;
            }
            _ => return Err(Error::InvalidPayloadForVariant),
        }
        battle.turns = turns;

        if let Some(winner) = detect_completion(&battle.turns) {
            complete_battle(&env, &mut battle, winner)?;
            BattleCompleted { battle_id, winner }.publish(&env);
        } else {
            // Re-arm the forfeit clock for the side now on the hook.
            battle.deadline_at = now
                .checked_add(get_turn_deadline_secs(&env))
                .ok_or(Error::Overflow)?;
        }

        save_battle(&env, &mut battle)?;

        TurnSubmitted {
            battle_id,
            player: caller,
            version: battle.version,
        }
        .publish(&env);
        build_view(&battle, side)
    }

    /// Claim a win by forfeit: the caller has submitted in the current open
    /// round, the opponent has not, and the turn deadline has passed. Runs
    /// the normal completion path, so settlement behaves exactly as for a
    /// played-out match.
    pub fn claim_forfeit(env: Env, battle_id: u64, caller: Address) -> Result<BattleView, Error> {
        require_initialized(&env)?;
        let mut battle = get_battle_record(&env, battle_id)?;

        if battle.status != BattleStatus::InProgress {
            return Err(Error::BattleNotInProgress);
        }
        caller.require_auth();
        let side = side_of(&battle, &caller)?;

        if !opponent_is_stalling(&battle.turns, side) {
            return Err(Error::ForfeitNotAvailable);
        }
        if env.ledger().timestamp() < battle.deadline_at {
            return Err(Error::DeadlineNotReached);
        }

        let winner = match side {
            Side::Challenger => Winner::Challenger,
            Side::Opponent => Winner::Opponent,
        };
        complete_battle(&env, &mut battle, winner)?;
        save_battle(&env, &mut battle)?;

        BattleForfeited { battle_id, winner }.publish(&env);
        build_view(&battle, side)
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    /// Finalize a completed battle and distribute the escrowed stakes.
    ///
    /// The `Finalized` status and per-side payment intents are persisted
    /// before any transfer is attempted. A transfer failure leaves the
    /// battle finalized with settlement `PaymentPending`; the outcome is
    /// final even if payment needs a retry. Calling again on a fully paid
    /// battle returns `AlreadyFinalized` without a second transfer.
    pub fn finalize(env: Env, battle_id: u64) -> Result<SettlementResult, Error> {
        require_initialized(&env)?;
        let mut battle = get_battle_record(&env, battle_id)?;

        match battle.status {
            BattleStatus::InProgress => return Err(Error::BattleNotCompleted),
            BattleStatus::Finalized => {
                if battle.settlement == SettlementStatus::Paid {
                    return Err(Error::AlreadyFinalized);
                }
                // Finalized but unpaid: behave as a retry.
                return settle(&env, &mut battle);
            }
            BattleStatus::Completed => {}
        }

        let winner = battle.winner.get().ok_or(Error::BattleNotCompleted)?;
        let (owed_challenger, owed_opponent) = payout_amounts(&battle, winner)?;

        // Flip to terminal status and record the payment intents before any
        // transfer is attempted, so a failed transfer cannot be mistaken for
        // an undecided battle.
        battle.status = BattleStatus::Finalized;
        battle.finalized_at = env.ledger().timestamp();
        battle.settlement = SettlementStatus::PaymentPending;
        battle.challenger_paid = owed_challenger == 0;
        battle.opponent_paid = owed_opponent == 0;
        save_battle(&env, &mut battle)?;

        settle(&env, &mut battle)
    }

    /// Re-attempt the unpaid side(s) of a finalized battle. Safe to call any
    /// number of times; a paid side is never paid again.
    pub fn retry_settlement(env: Env, battle_id: u64) -> Result<SettlementResult, Error> {
        require_initialized(&env)?;
        let mut battle = get_battle_record(&env, battle_id)?;

        if battle.status != BattleStatus::Finalized {
            return Err(Error::BattleNotFinalized);
        }
        if battle.settlement == SettlementStatus::Paid {
            return Err(Error::SettlementAlreadyPaid);
        }
        settle(&env, &mut battle)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn get_proposal(env: Env, proposal_id: u64) -> Result<BattleProposal, Error> {
        require_initialized(&env)?;
        get_proposal(&env, proposal_id)
    }

    /// Render-ready view for one participant.
    pub fn get_battle(env: Env, battle_id: u64, viewer: Address) -> Result<BattleView, Error> {
        require_initialized(&env)?;
        let battle = get_battle_record(&env, battle_id)?;
        let side = side_of(&battle, &viewer)?;
        build_view(&battle, side)
    }

    /// Raw record, for indexers and debugging.
    pub fn get_record(env: Env, battle_id: u64) -> Result<BattleRecord, Error> {
        require_initialized(&env)?;
        get_battle_record(&env, battle_id)
    }
}

// ---------------------------------------------------------------------------
// Merge & completion internals
// ---------------------------------------------------------------------------

/// Merge a score report into the log: replace the caller's open entry if one
/// exists, otherwise append. The other side's entry is never touched.
fn merge_score_turn(log: &mut Vec<ScoreTurn>, side: Side, score: u32, now: u64) {
    let turn = ScoreTurn {
        player: side,
        score,
        submitted_at: now,
    };
    for i in 0..log.len() {
        if log.get_unchecked(i).player == side {
            log.set(i, turn);
            return;
        }
    }
    log.push_back(turn);
}

/// Fill the caller's slot in the last open round, or open a new round. A
/// placed move is immutable: the opposing player may close the round at any
/// moment, so there is no safe revision window.
fn merge_rps_move(rounds: &mut Vec<RpsRound>, side: Side, mv: RpsMove) -> Result<(), Error> {
    let len = rounds.len();
    if len > 0 {
        let mut last = rounds.get_unchecked(len - 1);
        if !last.is_closed() {
            let slot = match side {
                Side::Challenger => &mut last.challenger_move,
                Side::Opponent => &mut last.opponent_move,
            };
            if slot.is_filled() {
                return Err(Error::MoveAlreadySubmitted);
            }
            *slot = RpsSlot::Filled(mv);
            rounds.set(len - 1, last);
            return Ok(());
        }
    }

    let mut round = RpsRound {
        challenger_move: RpsSlot::Empty,
        opponent_move: RpsSlot::Empty,
    };
    match side {
        Side::Challenger => round.challenger_move = RpsSlot::Filled(mv),
        Side::Opponent => round.opponent_move = RpsSlot::Filled(mv),
    }
    rounds.push_back(round);
    Ok(())
}

/// Completion check over the merged log: score battles close once both
/// entries exist; RPS closes when a side reaches two round-wins.
fn detect_completion(turns: &TurnLog) -> Option<Winner> {
    match turns {
        TurnLog::Score(log) => {
            let (challenger, opponent) = score_entries(log);
            match (challenger, opponent) {
                (Some(c), Some(o)) => Some(score_outcome(c, o)),
                _ => None,
            }
        }
        TurnLog::Rps(rounds) => rps_match_winner(&rps_tally(rounds)),
    }
}

/// Whether `side` has submitted in the current open round while the
/// opponent has not — the precondition for claiming a forfeit.
fn opponent_is_stalling(turns: &TurnLog, side: Side) -> bool {
    match turns {
        TurnLog::Score(log) => {
            let (challenger, opponent) = score_entries(log);
            let (mine, theirs) = match side {
                Side::Challenger => (challenger, opponent),
                Side::Opponent => (opponent, challenger),
            };
            mine.is_some() && theirs.is_none()
        }
        TurnLog::Rps(rounds) => {
            let len = rounds.len();
            if len == 0 {
                return false;
            }
            let last = rounds.get_unchecked(len - 1);
            if last.is_closed() {
                return false;
            }
            let (mine, theirs) = match side {
                Side::Challenger => (last.challenger_move, last.opponent_move),
                Side::Opponent => (last.opponent_move, last.challenger_move),
            };
            mine.is_filled() && !theirs.is_filled()
        }
    }
}

fn score_entries(log: &Vec<ScoreTurn>) -> (Option<u32>, Option<u32>) {
    let mut challenger = None;
    let mut opponent = None;
    for turn in log.iter() {
        match turn.player {
            Side::Challenger => challenger = Some(turn.score),
            Side::Opponent => opponent = Some(turn.score),
        }
    }
    (challenger, opponent)
}

/// Flip the battle to `Completed`, set the winner (exactly once) and push
/// win/loss/draw counters to the registry for both warriors.
fn complete_battle(env: &Env, battle: &mut BattleRecord, winner: Winner) -> Result<(), Error> {
    battle.status = BattleStatus::Completed;
    battle.winner = WinnerSlot::Decided(winner);

    let (challenger_outcome, opponent_outcome) = match winner {
        Winner::Challenger => (MatchOutcome::Win, MatchOutcome::Loss),
        Winner::Opponent => (MatchOutcome::Loss, MatchOutcome::Win),
        Winner::Draw => (MatchOutcome::Draw, MatchOutcome::Draw),
    };

    let registry = WarriorRegistryClient::new(env, &get_registry(env));
    let me = env.current_contract_address();
    registry.record_result(&me, &battle.challenger_warrior, &challenger_outcome);
    registry.record_result(&me, &battle.opponent_warrior, &opponent_outcome);
    Ok(())
}

// ---------------------------------------------------------------------------
// Settlement internals
// ---------------------------------------------------------------------------

/// Gross amounts owed per side: winner takes both stakes, a draw refunds
/// each side its own.
fn payout_amounts(battle: &BattleRecord, winner: Winner) -> Result<(i128, i128), Error> {
    let pot = battle.stake.checked_mul(2).ok_or(Error::Overflow)?;
    Ok(match winner {
        Winner::Challenger => (pot, 0),
        Winner::Opponent => (0, pot),
        Winner::Draw => (battle.stake, battle.stake),
    })
}

/// Attempt the outstanding transfers for a finalized battle. Each side is
/// paid at most once; a failed transfer leaves its flag unset and the
/// settlement in `PaymentPending` for a later retry.
fn settle(env: &Env, battle: &mut BattleRecord) -> Result<SettlementResult, Error> {
    let winner = battle.winner.get().ok_or(Error::BattleNotCompleted)?;
    let (owed_challenger, owed_opponent) = payout_amounts(battle, winner)?;

    let token = get_token(env);
    let token_client = TokenClient::new(env, &token);
    let me = env.current_contract_address();
    let registry = WarriorRegistryClient::new(env, &get_registry(env));

    if !battle.challenger_paid && owed_challenger > 0 {
        let result = token_client.try_transfer(&me, &battle.challenger, &owed_challenger);
        if matches!(result, Ok(Ok(_))) {
            battle.challenger_paid = true;
            registry.credit_earnings(&me, &battle.challenger_warrior, &owed_challenger);
        }
    }
    if !battle.opponent_paid && owed_opponent > 0 {
        let result = token_client.try_transfer(&me, &battle.opponent, &owed_opponent);
        if matches!(result, Ok(Ok(_))) {
            battle.opponent_paid = true;
            registry.credit_earnings(&me, &battle.opponent_warrior, &owed_opponent);
        }
    }

    let fully_paid = battle.challenger_paid && battle.opponent_paid;
    battle.settlement = if fully_paid {
        SettlementStatus::Paid
    } else {
        SettlementStatus::PaymentPending
    };
    save_battle(env, battle)?;

    if fully_paid {
        SettlementPaid {
            battle_id: battle.battle_id,
            outcome: winner,
            amount_to_challenger: owed_challenger,
            amount_to_opponent: owed_opponent,
        }
        .publish(env);
    } else {
        SettlementPending {
            battle_id: battle.battle_id,
        }
        .publish(env);
    }

    Ok(SettlementResult {
        battle_id: battle.battle_id,
        outcome: winner,
        token,
        amount_to_challenger: owed_challenger,
        amount_to_opponent: owed_opponent,
        fully_paid,
    })
}

// ---------------------------------------------------------------------------
// View internals
// ---------------------------------------------------------------------------

fn build_view(battle: &BattleRecord, side: Side) -> Result<BattleView, Error> {
    let mut challenger_score = 0;
    let mut opponent_score = 0;
    let mut challenger_round_wins = 0;
    let mut opponent_round_wins = 0;
    let challenger_recorded;
    let opponent_recorded;

    match &battle.turns {
        TurnLog::Score(log) => {
            let (challenger, opponent) = score_entries(log);
            challenger_score = challenger.unwrap_or(0);
            opponent_score = opponent.unwrap_or(0);
            challenger_recorded = challenger.is_some();
            opponent_recorded = opponent.is_some();
        }
        TurnLog::Rps(rounds) => {
            let tally = rps_tally(rounds);
            challenger_round_wins = tally.challenger;
            opponent_round_wins = tally.opponent;
            let len = rounds.len();
            if len > 0 {
                let last = rounds.get_unchecked(len - 1);
                challenger_recorded = last.challenger_move.is_filled();
                opponent_recorded = last.opponent_move.is_filled();
            } else {
                challenger_recorded = false;
                opponent_recorded = false;
            }
        }
    }

    let (your_turn_recorded, opponent_turn_recorded) = match side {
        Side::Challenger => (challenger_recorded, opponent_recorded),
        Side::Opponent => (opponent_recorded, challenger_recorded),
    };

    Ok(BattleView {
        battle_id: battle.battle_id,
        status: battle.status,
        variant: battle.variant,
        your_side: side,
        your_turn_recorded,
        opponent_turn_recorded,
        challenger_score,
        opponent_score,
        challenger_round_wins,
        opponent_round_wins,
        challenger_health: health_from_losses(opponent_round_wins),
        opponent_health: health_from_losses(challenger_round_wins),
        winner: battle.winner,
        settlement: battle.settlement,
        version: battle.version,
        deadline_at: battle.deadline_at,
    })
}

/// Cosmetic health bar: each round lost chips away half the bar.
fn health_from_losses(rounds_lost: u32) -> u32 {
    FULL_HEALTH.saturating_sub(rounds_lost.saturating_mul(RPS_ROUND_DAMAGE))
}

// ---------------------------------------------------------------------------
// Storage helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

/// The warrior must be registered and staked by its registered owner.
fn require_owned_warrior(env: &Env, warrior_id: u64, owner: &Address) -> Result<(), Error> {
    let registry = WarriorRegistryClient::new(env, &get_registry(env));
    let profile = match registry.try_get_warrior(&warrior_id) {
        Ok(Ok(profile)) => profile,
        _ => return Err(Error::UnknownWarrior),
    };
    if &profile.owner != owner {
        return Err(Error::WarriorNotOwned);
    }
    Ok(())
}

fn side_of(battle: &BattleRecord, who: &Address) -> Result<Side, Error> {
    if who == &battle.challenger {
        Ok(Side::Challenger)
    } else if who == &battle.opponent {
        Ok(Side::Opponent)
    } else {
        Err(Error::NotAParticipant)
    }
}

fn get_token(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .expect("Battle: token not set")
}

fn get_registry(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Registry)
        .expect("Battle: registry not set")
}

fn get_turn_deadline_secs(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::TurnDeadlineSecs)
        .expect("Battle: deadline not set")
}

fn get_proposal(env: &Env, proposal_id: u64) -> Result<BattleProposal, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Proposal(proposal_id))
        .ok_or(Error::ProposalNotFound)
}

fn save_proposal(env: &Env, proposal: &BattleProposal) {
    let key = DataKey::Proposal(proposal.proposal_id);
    env.storage().persistent().set(&key, proposal);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

fn get_battle_record(env: &Env, battle_id: u64) -> Result<BattleRecord, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Battle(battle_id))
        .ok_or(Error::BattleNotFound)
}

/// Bump the version, refresh `updated_at` and persist. Every write to a
/// battle record goes through here so pollers always see the version move.
fn save_battle(env: &Env, battle: &mut BattleRecord) -> Result<(), Error> {
    battle.version = battle.version.checked_add(1).ok_or(Error::Overflow)?;
    battle.updated_at = env.ledger().timestamp();
    store_battle(env, battle);
    Ok(())
}

fn store_battle(env: &Env, battle: &BattleRecord) {
    let key = DataKey::Battle(battle.battle_id);
    env.storage().persistent().set(&key, battle);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
