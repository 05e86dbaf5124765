//! Warbit Warrior Registry Contract
//!
//! Durable per-warrior profile store: ownership, win/loss/draw counters and
//! an earnings cache. The contract is permissioned — only the admin or
//! authorized writers (in practice the battle contract) may record results,
//! so a player cannot inflate their own record.
//!
//! The `earnings` counter is a display cache of tokens won through battles;
//! the token contract itself remains the authoritative balance.

#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const PERSISTENT_BUMP_LEDGERS: u32 = 518_400; // ~30 days

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    WarriorAlreadyExists = 4,
    WarriorNotFound = 5,
    InvalidAmount = 6,
    Overflow = 7,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WarriorProfile {
    pub owner: Address,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Cached total of tokens won through settled battles.
    pub earnings: i128,
}

/// How a battle ended for one warrior.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchOutcome {
    Win = 0,
    Loss = 1,
    Draw = 2,
}

#[contracttype]
pub enum DataKey {
    Admin,
    Authorized(Address),
    Warrior(u64),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct WarriorRegistered {
    #[topic]
    pub warrior_id: u64,
    pub owner: Address,
}

#[contractevent]
pub struct ResultRecorded {
    #[topic]
    pub warrior_id: u64,
    pub outcome: MatchOutcome,
}

#[contractevent]
pub struct EarningsCredited {
    #[topic]
    pub warrior_id: u64,
    pub amount: i128,
}

#[contractevent]
pub struct WriterChanged {
    #[topic]
    pub addr: Address,
    pub authorized: bool,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct WarriorRegistry;

#[contractimpl]
impl WarriorRegistry {
    /// Initialize the registry with an admin. May only be called once.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(admin), &true);
        Ok(())
    }

    /// Authorize or deauthorize an address (e.g., the battle contract) to
    /// record results and earnings.
    pub fn set_authorized(
        env: Env,
        admin: Address,
        addr: Address,
        auth: bool,
    ) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage()
            .instance()
            .set(&DataKey::Authorized(addr.clone()), &auth);
        WriterChanged {
            addr,
            authorized: auth,
        }
        .publish(&env);
        Ok(())
    }

    /// Register a new warrior under `owner`. Ids are external (minted by the
    /// surrounding application); a taken id is rejected.
    pub fn register(env: Env, owner: Address, warrior_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        owner.require_auth();

        let key = DataKey::Warrior(warrior_id);
        if env.storage().persistent().has(&key) {
            return Err(Error::WarriorAlreadyExists);
        }

        let profile = WarriorProfile {
            owner: owner.clone(),
            wins: 0,
            losses: 0,
            draws: 0,
            earnings: 0,
        };
        set_profile(&env, warrior_id, &profile);

        WarriorRegistered { warrior_id, owner }.publish(&env);
        Ok(())
    }

    /// Record a battle outcome against a warrior's counters.
    /// Only authorized writers can record results.
    pub fn record_result(
        env: Env,
        caller: Address,
        warrior_id: u64,
        outcome: MatchOutcome,
    ) -> Result<(), Error> {
        require_writer(&env, &caller)?;

        let mut profile = get_profile(&env, warrior_id)?;
        match outcome {
            MatchOutcome::Win => {
                profile.wins = profile.wins.checked_add(1).ok_or(Error::Overflow)?;
            }
            MatchOutcome::Loss => {
                profile.losses = profile.losses.checked_add(1).ok_or(Error::Overflow)?;
            }
            MatchOutcome::Draw => {
                profile.draws = profile.draws.checked_add(1).ok_or(Error::Overflow)?;
            }
        }
        set_profile(&env, warrior_id, &profile);

        ResultRecorded {
            warrior_id,
            outcome,
        }
        .publish(&env);
        Ok(())
    }

    /// Add settled winnings to a warrior's earnings cache.
    /// Only authorized writers can credit earnings.
    pub fn credit_earnings(
        env: Env,
        caller: Address,
        warrior_id: u64,
        amount: i128,
    ) -> Result<(), Error> {
        require_writer(&env, &caller)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut profile = get_profile(&env, warrior_id)?;
        profile.earnings = profile
            .earnings
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        set_profile(&env, warrior_id, &profile);

        EarningsCredited { warrior_id, amount }.publish(&env);
        Ok(())
    }

    /// View a warrior's profile.
    pub fn get_warrior(env: Env, warrior_id: u64) -> Result<WarriorProfile, Error> {
        require_initialized(&env)?;
        get_profile(&env, warrior_id)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

/// Verify `caller` signed the invocation and is an authorized writer.
fn require_writer(env: &Env, caller: &Address) -> Result<(), Error> {
    require_initialized(env)?;
    caller.require_auth();

    if !env
        .storage()
        .instance()
        .get(&DataKey::Authorized(caller.clone()))
        .unwrap_or(false)
    {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn get_profile(env: &Env, warrior_id: u64) -> Result<WarriorProfile, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Warrior(warrior_id))
        .ok_or(Error::WarriorNotFound)
}

fn set_profile(env: &Env, warrior_id: u64, profile: &WarriorProfile) {
    let key = DataKey::Warrior(warrior_id);
    env.storage().persistent().set(&key, profile);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test;
