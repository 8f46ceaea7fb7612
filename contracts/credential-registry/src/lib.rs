#![no_std]
//! Credential registry for the Harambee funding platform.
//!
//! A single owner curates a set of attestors; attestors issue typed,
//! timestamped credentials to recipients. At most one live attestation exists
//! per `(recipient, credential type)` pair. Downstream contracts gate on
//! `has_attestation_type`, which is a pure lookup and never depends on who
//! asks.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, BytesN, Env,
    String, Symbol,
};


#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    AccessDenied = 2,
    AlreadyMember = 3,
    NotMember = 4,
    DuplicateAttestation = 5,
    NotFound = 6,
    InvalidArgument = 7,
}

/// What happens when an attestor re-issues an existing `(recipient, type)`
/// pair. Fixed per deployment at `initialize`, owner-updatable.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReissuePolicy {
    /// Second issuance fails with `DuplicateAttestation`.
    Reject,
    /// Second issuance replaces the stored record.
    Overwrite,
}

/// A typed, timestamped claim about a recipient, issued by an attestor.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attestation {
    pub recipient: Address,
    pub credential_type: String,
    pub evidence_hash: BytesN<32>,
    pub attestor: Address,
    pub issued_at: u64,
}

#[contracttype]
#[derive(Clone)]
enum DataKey {
    Owner,
    ReissuePolicy,
    Attestor(Address),
    Attestation(Address, String),
}

mod events {
    use super::*;

    pub fn emit_attestor_added(env: &Env, attestor: &Address, owner: &Address) {
        const ATTESTOR_ADDED: Symbol = symbol_short!("att_add");
        env.events()
            .publish((ATTESTOR_ADDED, attestor.clone()), owner.clone());
    }

    pub fn emit_attestor_removed(env: &Env, attestor: &Address, owner: &Address) {
        const ATTESTOR_REMOVED: Symbol = symbol_short!("att_rem");
        env.events()
            .publish((ATTESTOR_REMOVED, attestor.clone()), owner.clone());
    }

    pub fn emit_attestation_issued(
        env: &Env,
        recipient: &Address,
        credential_type: &String,
        attestor: &Address,
    ) {
        const ATTESTATION_ISSUED: Symbol = symbol_short!("att_iss");
        env.events().publish(
            (ATTESTATION_ISSUED, recipient.clone()),
            (credential_type.clone(), attestor.clone()),
        );
    }

    pub fn emit_ownership_transferred(env: &Env, old_owner: &Address, new_owner: &Address) {
        const OWNER_SET: Symbol = symbol_short!("owner");
        env.events()
            .publish((OWNER_SET,), (old_owner.clone(), new_owner.clone()));
    }
}

fn get_owner(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .expect("not initialized")
}

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    if *caller != get_owner(env) {
        return Err(Error::AccessDenied);
    }
    Ok(())
}

#[contract]
pub struct CredentialRegistryContract;

#[contractimpl]
impl CredentialRegistryContract {
    /// One-time setup of the registry owner and re-issue policy.
    pub fn initialize(env: Env, owner: Address, reissue_policy: ReissuePolicy) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage()
            .instance()
            .set(&DataKey::ReissuePolicy, &reissue_policy);
        Ok(())
    }

    /// Hand the registry over to a new owner. Owner only.
    pub fn transfer_ownership(env: Env, caller: Address, new_owner: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        env.storage().instance().set(&DataKey::Owner, &new_owner);
        events::emit_ownership_transferred(&env, &caller, &new_owner);
        Ok(())
    }

    /// Current registry owner.
    pub fn get_owner(env: Env) -> Address {
        get_owner(&env)
    }

    /// Owner: change what re-issuing an existing `(recipient, type)` pair does.
    pub fn set_reissue_policy(
        env: Env,
        caller: Address,
        policy: ReissuePolicy,
    ) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        env.storage().instance().set(&DataKey::ReissuePolicy, &policy);
        Ok(())
    }

    pub fn get_reissue_policy(env: Env) -> ReissuePolicy {
        env.storage()
            .instance()
            .get(&DataKey::ReissuePolicy)
            .unwrap_or(ReissuePolicy::Reject)
    }

    /// Authorize an address to issue attestations. Owner only; adding an
    /// existing attestor fails rather than silently succeeding.
    pub fn add_attestor(env: Env, caller: Address, attestor: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        let key = DataKey::Attestor(attestor.clone());
        if env.storage().instance().has(&key) {
            return Err(Error::AlreadyMember);
        }
        env.storage().instance().set(&key, &());
        events::emit_attestor_added(&env, &attestor, &caller);
        Ok(())
    }

    /// Remove an attestor. Owner only; removing a non-attestor fails.
    pub fn remove_attestor(env: Env, caller: Address, attestor: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        let key = DataKey::Attestor(attestor.clone());
        if !env.storage().instance().has(&key) {
            return Err(Error::NotMember);
        }
        env.storage().instance().remove(&key);
        events::emit_attestor_removed(&env, &attestor, &caller);
        Ok(())
    }

    /// True if the address is currently authorized to issue attestations.
    pub fn is_attestor(env: Env, address: Address) -> bool {
        env.storage().instance().has(&DataKey::Attestor(address))
    }

    /// Issue a credential to `recipient`. Caller must be a current attestor.
    ///
    /// A duplicate `(recipient, credential_type)` pair fails with
    /// `DuplicateAttestation` under the `Reject` policy and replaces the
    /// stored record under `Overwrite`. `issued_at` is stamped from the
    /// ledger clock.
    pub fn issue_attestation(
        env: Env,
        attestor: Address,
        recipient: Address,
        credential_type: String,
        evidence_hash: BytesN<32>,
    ) -> Result<(), Error> {
        attestor.require_auth();
        if !env
            .storage()
            .instance()
            .has(&DataKey::Attestor(attestor.clone()))
        {
            return Err(Error::AccessDenied);
        }
        if credential_type.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let key = DataKey::Attestation(recipient.clone(), credential_type.clone());
        if env.storage().persistent().has(&key)
            && Self::get_reissue_policy(env.clone()) == ReissuePolicy::Reject
        {
            return Err(Error::DuplicateAttestation);
        }

        let attestation = Attestation {
            recipient: recipient.clone(),
            credential_type: credential_type.clone(),
            evidence_hash,
            attestor: attestor.clone(),
            issued_at: env.ledger().timestamp(),
        };
        env.storage().persistent().set(&key, &attestation);

        events::emit_attestation_issued(&env, &recipient, &credential_type, &attestor);
        Ok(())
    }

    /// True if `recipient` holds a live credential of the given type.
    /// Pure lookup, callable by anyone.
    pub fn has_attestation_type(env: Env, recipient: Address, credential_type: String) -> bool {
        env.storage()
            .persistent()
            .has(&DataKey::Attestation(recipient, credential_type))
    }

    /// Full attestation record for `(recipient, credential_type)`.
    pub fn get_attestation(
        env: Env,
        recipient: Address,
        credential_type: String,
    ) -> Result<Attestation, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Attestation(recipient, credential_type))
            .ok_or(Error::NotFound)
    }
}
