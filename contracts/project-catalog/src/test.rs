#![cfg(test)]
use super::*;
use harambee_credential_registry::{
    CredentialRegistryContract, CredentialRegistryContractClient, ReissuePolicy,
};
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, BytesN, Env, String};

struct Setup<'a> {
    env: Env,
    catalog: ProjectCatalogContractClient<'a>,
    registry: CredentialRegistryContractClient<'a>,
    catalog_owner: Address,
    attestor: Address,
}

fn setup() -> Setup<'static> {
    let env = Env::default();
    env.mock_all_auths();

    let registry_owner = Address::generate(&env);
    let registry_id = env.register(CredentialRegistryContract, ());
    let registry = CredentialRegistryContractClient::new(&env, &registry_id);
    registry.initialize(&registry_owner, &ReissuePolicy::Reject);

    let attestor = Address::generate(&env);
    registry.add_attestor(&registry_owner, &attestor);

    let catalog_owner = Address::generate(&env);
    let catalog_id = env.register(ProjectCatalogContract, ());
    let catalog = ProjectCatalogContractClient::new(&env, &catalog_id);
    catalog.initialize(
        &catalog_owner,
        &registry_id,
        &String::from_str(&env, "Artist"),
    );

    Setup {
        env,
        catalog,
        registry,
        catalog_owner,
        attestor,
    }
}

/// Grant the "Artist" credential to an address.
fn attest(s: &Setup, recipient: &Address) {
    s.registry.issue_attestation(
        &s.attestor,
        recipient,
        &String::from_str(&s.env, "Artist"),
        &BytesN::from_array(&s.env, &[1; 32]),
    );
}

fn submit(s: &Setup, owner: &Address, name: &str) -> u64 {
    s.catalog.submit_project(
        owner,
        &String::from_str(&s.env, name),
        &String::from_str(&s.env, "QmDescriptionCID"),
        &String::from_str(&s.env, "Music"),
    )
}

#[test]
fn test_initialize() {
    let s = setup();
    assert_eq!(s.catalog.get_owner(), s.catalog_owner);
    assert_eq!(
        s.catalog.required_credential(),
        String::from_str(&s.env, "Artist")
    );
    assert_eq!(s.catalog.project_count(), 0);
}

#[test]
fn test_initialize_twice_fails() {
    let s = setup();
    let other = Address::generate(&s.env);
    assert_eq!(
        s.catalog
            .try_initialize(&other, &s.catalog.get_registry(), &String::from_str(&s.env, "Artist")),
        Err(Ok(Error::AlreadyInitialized))
    );
}

#[test]
fn test_submit_requires_credential() {
    let s = setup();
    let unattested = Address::generate(&s.env);

    assert_eq!(
        s.catalog.try_submit_project(
            &unattested,
            &String::from_str(&s.env, "My Project"),
            &String::from_str(&s.env, "QmCID"),
            &String::from_str(&s.env, "Music"),
        ),
        Err(Ok(Error::Unattested))
    );
    assert_eq!(s.catalog.project_count(), 0);
}

#[test]
fn test_submit_project() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    let id = submit(&s, &artist, "Kibera Sound Archive");
    assert_eq!(id, 1);

    let project = s.catalog.get_project(&id);
    assert_eq!(project.id, 1);
    assert_eq!(project.owner, artist);
    assert_eq!(project.name, String::from_str(&s.env, "Kibera Sound Archive"));
    assert_eq!(project.category, String::from_str(&s.env, "Music"));
    assert!(project.active);
}

#[test]
fn test_ids_are_strictly_increasing() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    assert_eq!(submit(&s, &artist, "First"), 1);
    assert_eq!(submit(&s, &artist, "Second"), 2);
    assert_eq!(submit(&s, &artist, "Third"), 3);
    assert_eq!(s.catalog.project_count(), 3);

    // Deactivation never frees an id.
    s.catalog.set_active(&artist, &2, &false);
    assert_eq!(submit(&s, &artist, "Fourth"), 4);
}

#[test]
fn test_empty_name_rejected() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    assert_eq!(
        s.catalog.try_submit_project(
            &artist,
            &String::from_str(&s.env, ""),
            &String::from_str(&s.env, "QmCID"),
            &String::from_str(&s.env, "Music"),
        ),
        Err(Ok(Error::InvalidArgument))
    );
}

#[test]
fn test_get_project_not_found() {
    let s = setup();
    assert_eq!(s.catalog.try_get_project(&42), Err(Ok(Error::NotFound)));
    assert_eq!(s.catalog.find_project(&42), None);
    assert_eq!(s.catalog.project_summary(&42), None);
}

#[test]
fn test_set_active_permissions() {
    let s = setup();
    let artist = Address::generate(&s.env);
    let stranger = Address::generate(&s.env);
    attest(&s, &artist);
    let id = submit(&s, &artist, "Project");

    assert_eq!(
        s.catalog.try_set_active(&stranger, &id, &false),
        Err(Ok(Error::AccessDenied))
    );

    // Project owner may toggle.
    s.catalog.set_active(&artist, &id, &false);
    assert!(!s.catalog.get_project(&id).active);

    // Catalog owner may toggle any project.
    s.catalog.set_active(&s.catalog_owner, &id, &true);
    assert!(s.catalog.get_project(&id).active);
}

#[test]
fn test_set_active_unknown_project() {
    let s = setup();
    assert_eq!(
        s.catalog.try_set_active(&s.catalog_owner, &9, &false),
        Err(Ok(Error::NotFound))
    );
}

#[test]
fn test_active_projects_ascending_and_filtered() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    for name in ["A", "B", "C", "D", "E"] {
        submit(&s, &artist, name);
    }
    s.catalog.set_active(&artist, &2, &false);
    s.catalog.set_active(&artist, &4, &false);

    let active = s.catalog.get_all_active_projects();
    assert_eq!(active.len(), 3);
    assert_eq!(active.get(0).unwrap().id, 1);
    assert_eq!(active.get(1).unwrap().id, 3);
    assert_eq!(active.get(2).unwrap().id, 5);
}

#[test]
fn test_paged_query_is_restartable() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    for i in 0..7 {
        submit(&s, &artist, if i % 2 == 0 { "Even" } else { "Odd" });
    }

    let first = s.catalog.get_active_projects(&0, &3);
    assert_eq!(first.len(), 3);
    assert_eq!(first.get(2).unwrap().id, 3);

    // Resume from the last id seen.
    let second = s.catalog.get_active_projects(&3, &3);
    assert_eq!(second.len(), 3);
    assert_eq!(second.get(0).unwrap().id, 4);

    let third = s.catalog.get_active_projects(&6, &3);
    assert_eq!(third.len(), 1);
    assert_eq!(third.get(0).unwrap().id, 7);

    let done = s.catalog.get_active_projects(&7, &3);
    assert_eq!(done.len(), 0);
}

#[test]
fn test_paged_query_limit_is_capped() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);

    for _ in 0..(QUERY_LIMIT_MAX + 5) {
        submit(&s, &artist, "P");
    }

    let page = s.catalog.get_active_projects(&0, &1000);
    assert_eq!(page.len(), QUERY_LIMIT_MAX);
}

#[test]
fn test_project_summary() {
    let s = setup();
    let artist = Address::generate(&s.env);
    attest(&s, &artist);
    let id = submit(&s, &artist, "Project");

    assert_eq!(
        s.catalog.project_summary(&id),
        Some((id, artist.clone(), true))
    );
    s.catalog.set_active(&artist, &id, &false);
    assert_eq!(s.catalog.project_summary(&id), Some((id, artist, false)));
}
