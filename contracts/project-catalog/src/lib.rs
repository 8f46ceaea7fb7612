#![no_std]
//! Project catalog for the Harambee funding platform.
//!
//! Submission is gated on a credential held in the credential registry:
//! callers without the required credential type cannot list a project.
//! Project ids are assigned from 1 upward and never reused; id and owner are
//! immutable after creation, only the active flag may change. Active-project
//! queries return ascending id order — downstream consumers rely on that
//! ordering being deterministic.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, Env, String,
    Symbol, Vec,
};

#[cfg(test)]
mod test;

/// Hard cap on projects returned by one paged query.
pub const QUERY_LIMIT_MAX: u32 = 30;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    AccessDenied = 2,
    Unattested = 3,
    NotFound = 4,
    InvalidArgument = 5,
}

/// A listed project. `description_ref` is an off-ledger content descriptor
/// (e.g. an IPFS CID), not the description itself.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Project {
    pub id: u64,
    pub owner: Address,
    pub name: String,
    pub description_ref: String,
    pub category: String,
    pub active: bool,
    pub submitted_at: u64,
}

#[contracttype]
#[derive(Clone)]
enum DataKey {
    Owner,
    Registry,
    RequiredCredential,
    ProjectCount,
    Project(u64),
}

// Interface for the credential registry contract.
#[soroban_sdk::contractclient(name = "CredentialGateClient")]
pub trait CredentialGate {
    fn has_attestation_type(env: Env, recipient: Address, credential_type: String) -> bool;
}

mod events {
    use super::*;

    pub fn emit_project_submitted(env: &Env, id: u64, owner: &Address, name: &String) {
        const PROJECT_SUBMITTED: Symbol = symbol_short!("proj_sub");
        env.events()
            .publish((PROJECT_SUBMITTED, id), (owner.clone(), name.clone()));
    }

    pub fn emit_project_active(env: &Env, id: u64, active: bool, caller: &Address) {
        const PROJECT_ACTIVE: Symbol = symbol_short!("proj_act");
        env.events()
            .publish((PROJECT_ACTIVE, id), (active, caller.clone()));
    }
}

fn get_owner(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .expect("not initialized")
}

fn project_count(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::ProjectCount)
        .unwrap_or(0)
}

fn load_project(env: &Env, id: u64) -> Option<Project> {
    env.storage().persistent().get(&DataKey::Project(id))
}

fn store_project(env: &Env, project: &Project) {
    env.storage()
        .persistent()
        .set(&DataKey::Project(project.id), project);
}

#[contract]
pub struct ProjectCatalogContract;

#[contractimpl]
impl ProjectCatalogContract {
    /// One-time setup.
    ///
    /// * `owner` - Catalog administrator (may toggle any project's flag).
    /// * `credential_registry` - Credential registry contract address.
    /// * `required_credential` - Credential type required to submit, e.g. "Artist".
    pub fn initialize(
        env: Env,
        owner: Address,
        credential_registry: Address,
        required_credential: String,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        if required_credential.is_empty() {
            return Err(Error::InvalidArgument);
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage()
            .instance()
            .set(&DataKey::Registry, &credential_registry);
        env.storage()
            .instance()
            .set(&DataKey::RequiredCredential, &required_credential);
        Ok(())
    }

    /// List a new project. The caller must hold the required credential.
    ///
    /// Assigns the next project id (starting at 1), records the caller as
    /// owner, and marks the project active. Returns the new id.
    pub fn submit_project(
        env: Env,
        caller: Address,
        name: String,
        description_ref: String,
        category: String,
    ) -> Result<u64, Error> {
        caller.require_auth();
        if name.is_empty() || category.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let registry: Address = env
            .storage()
            .instance()
            .get(&DataKey::Registry)
            .expect("not initialized");
        let required: String = env
            .storage()
            .instance()
            .get(&DataKey::RequiredCredential)
            .expect("not initialized");
        let gate = CredentialGateClient::new(&env, &registry);
        if !gate.has_attestation_type(&caller, &required) {
            return Err(Error::Unattested);
        }

        let id = project_count(&env) + 1;
        let project = Project {
            id,
            owner: caller.clone(),
            name: name.clone(),
            description_ref,
            category,
            active: true,
            submitted_at: env.ledger().timestamp(),
        };
        store_project(&env, &project);
        env.storage().instance().set(&DataKey::ProjectCount, &id);

        events::emit_project_submitted(&env, id, &caller, &name);
        Ok(id)
    }

    /// Project by id, or `NotFound`.
    pub fn get_project(env: Env, id: u64) -> Result<Project, Error> {
        load_project(&env, id).ok_or(Error::NotFound)
    }

    /// Non-failing lookup for callers that branch on absence.
    pub fn find_project(env: Env, id: u64) -> Option<Project> {
        load_project(&env, id)
    }

    /// `(id, owner, active)` for cross-contract consumers that only need
    /// payout routing and the activity flag.
    pub fn project_summary(env: Env, id: u64) -> Option<(u64, Address, bool)> {
        load_project(&env, id).map(|p| (p.id, p.owner, p.active))
    }

    /// Toggle a project's active flag. Allowed for the project owner and the
    /// catalog owner; history is never removed.
    pub fn set_active(env: Env, caller: Address, id: u64, active: bool) -> Result<(), Error> {
        caller.require_auth();
        let mut project = load_project(&env, id).ok_or(Error::NotFound)?;
        if caller != project.owner && caller != get_owner(&env) {
            return Err(Error::AccessDenied);
        }
        project.active = active;
        store_project(&env, &project);
        events::emit_project_active(&env, id, active, &caller);
        Ok(())
    }

    /// One page of active projects in ascending id order.
    ///
    /// `start_after` is the last id seen by the caller (0 for the first page);
    /// the page is restartable from any id. `limit` is capped at
    /// `QUERY_LIMIT_MAX` so a single call stays bounded regardless of catalog
    /// size.
    pub fn get_active_projects(env: Env, start_after: u64, limit: u32) -> Vec<Project> {
        let limit = limit.min(QUERY_LIMIT_MAX);
        let count = project_count(&env);
        let mut page = Vec::new(&env);
        let mut id = start_after.saturating_add(1);
        while id <= count && page.len() < limit {
            if let Some(project) = load_project(&env, id) {
                if project.active {
                    page.push_back(project);
                }
            }
            id += 1;
        }
        page
    }

    /// Every active project in ascending id order. The ordering (ascending
    /// id, i.e. creation order) is a contract other components depend on.
    pub fn get_all_active_projects(env: Env) -> Vec<Project> {
        let count = project_count(&env);
        let mut all = Vec::new(&env);
        for id in 1..=count {
            if let Some(project) = load_project(&env, id) {
                if project.active {
                    all.push_back(project);
                }
            }
        }
        all
    }

    /// Total number of projects ever listed (ids run 1..=count).
    pub fn project_count(env: Env) -> u64 {
        project_count(&env)
    }

    /// Credential type required to submit a project.
    pub fn required_credential(env: Env) -> String {
        env.storage()
            .instance()
            .get(&DataKey::RequiredCredential)
            .expect("not initialized")
    }

    /// Credential registry this catalog gates on.
    pub fn get_registry(env: Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::Registry)
            .expect("not initialized")
    }

    /// Catalog owner.
    pub fn get_owner(env: Env) -> Address {
        get_owner(&env)
    }
}
