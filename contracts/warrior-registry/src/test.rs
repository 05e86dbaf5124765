#![cfg(test)]

use super::*;
use soroban_sdk::{testutils::Address as _, Address, Env};

fn setup(env: &Env) -> (WarriorRegistryClient<'_>, Address, Address) {
    let admin = Address::generate(env);
    let writer = Address::generate(env);

    let contract_id = env.register(WarriorRegistry, ());
    let client = WarriorRegistryClient::new(env, &contract_id);

    env.mock_all_auths();
    client.init(&admin);
    client.set_authorized(&admin, &writer, &true);

    (client, admin, writer)
}

#[test]
fn test_init_rejects_reinit() {
    let env = Env::default();
    let (client, admin, _) = setup(&env);

    let result = client.try_init(&admin);
    assert_eq!(result, Err(Ok(Error::AlreadyInitialized)));
}

#[test]
fn test_register_and_get() {
    let env = Env::default();
    let (client, _, _) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &1u64);

    let profile = client.get_warrior(&1u64);
    assert_eq!(profile.owner, owner);
    assert_eq!(profile.wins, 0);
    assert_eq!(profile.losses, 0);
    assert_eq!(profile.draws, 0);
    assert_eq!(profile.earnings, 0);
}

#[test]
fn test_duplicate_register_rejected() {
    let env = Env::default();
    let (client, _, _) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &1u64);

    let result = client.try_register(&Address::generate(&env), &1u64);
    assert_eq!(result, Err(Ok(Error::WarriorAlreadyExists)));
}

#[test]
fn test_unknown_warrior_rejected() {
    let env = Env::default();
    let (client, _, writer) = setup(&env);

    assert_eq!(
        client.try_get_warrior(&99u64),
        Err(Ok(Error::WarriorNotFound))
    );
    assert_eq!(
        client.try_record_result(&writer, &99u64, &MatchOutcome::Win),
        Err(Ok(Error::WarriorNotFound))
    );
}

#[test]
fn test_record_result_updates_counters() {
    let env = Env::default();
    let (client, _, writer) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &5u64);

    client.record_result(&writer, &5u64, &MatchOutcome::Win);
    client.record_result(&writer, &5u64, &MatchOutcome::Win);
    client.record_result(&writer, &5u64, &MatchOutcome::Loss);
    client.record_result(&writer, &5u64, &MatchOutcome::Draw);

    let profile = client.get_warrior(&5u64);
    assert_eq!(profile.wins, 2);
    assert_eq!(profile.losses, 1);
    assert_eq!(profile.draws, 1);
}

#[test]
fn test_unauthorized_writer_rejected() {
    let env = Env::default();
    let (client, _, _) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &5u64);

    // The warrior's own owner is not a writer.
    let result = client.try_record_result(&owner, &5u64, &MatchOutcome::Win);
    assert_eq!(result, Err(Ok(Error::NotAuthorized)));

    let result = client.try_credit_earnings(&owner, &5u64, &100i128);
    assert_eq!(result, Err(Ok(Error::NotAuthorized)));
}

#[test]
fn test_deauthorized_writer_rejected() {
    let env = Env::default();
    let (client, admin, writer) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &5u64);

    client.set_authorized(&admin, &writer, &false);
    let result = client.try_record_result(&writer, &5u64, &MatchOutcome::Win);
    assert_eq!(result, Err(Ok(Error::NotAuthorized)));
}

#[test]
fn test_credit_earnings_accumulates() {
    let env = Env::default();
    let (client, _, writer) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &7u64);

    client.credit_earnings(&writer, &7u64, &200i128);
    client.credit_earnings(&writer, &7u64, &50i128);

    let profile = client.get_warrior(&7u64);
    assert_eq!(profile.earnings, 250);
}

#[test]
fn test_credit_earnings_rejects_non_positive() {
    let env = Env::default();
    let (client, _, writer) = setup(&env);

    let owner = Address::generate(&env);
    client.register(&owner, &7u64);

    assert_eq!(
        client.try_credit_earnings(&writer, &7u64, &0i128),
        Err(Ok(Error::InvalidAmount))
    );
    assert_eq!(
        client.try_credit_earnings(&writer, &7u64, &-5i128),
        Err(Ok(Error::InvalidAmount))
    );
}

#[test]
fn test_set_authorized_requires_admin() {
    let env = Env::default();
    let (client, _, writer) = setup(&env);

    let intruder = Address::generate(&env);
    let result = client.try_set_authorized(&writer, &intruder, &true);
    assert_eq!(result, Err(Ok(Error::NotAuthorized)));
}
