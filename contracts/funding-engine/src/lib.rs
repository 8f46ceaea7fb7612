#![no_std]
//! Quadratic funding engine for the Harambee platform.
//!
//! Owns the round lifecycle (`Inactive → Active → Ended → Inactive`), the
//! per-round contribution ledger, and the distribution of a native-asset
//! matching pool plus direct token contributions to project owners.
//!
//! Matching weight per project is the square of the sum of square roots of
//! each contributor's cumulative contribution. `sqrt` is not additive, so the
//! aggregate cannot be built from per-call roots: each contribution applies
//! the delta `isqrt(new_cumulative) - isqrt(old_cumulative)` to the project's
//! running root sum, and the round-wide sum of squared root sums is maintained
//! the same way. Both aggregates therefore always equal an exact from-scratch
//! recomputation. All arithmetic is overflow-checked.
//!
//! Ledger entries are keyed by round number, so advancing the round is the
//! reset: stale rounds' entries are never read again.
//!
//! Asset-layer failures (insufficient balance or allowance on the
//! contribution token, a payout recipient unable to accept funds) surface as
//! the token contract's own errors and abort the whole call; the ledger is
//! never left partially updated.

use harambee_common::math::{mul_div_floor, scaled_sqrt};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env, Symbol,
    Vec,
};




/// Hard cap on projects settled by one `distribute_matching_funds` call.
/// Larger rounds resume from a stored cursor on the next call.
pub const DISTRIBUTE_BATCH_MAX: u32 = 30;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    AccessDenied = 2,
    InvalidRoundState = 3,
    NotFound = 4,
    ProjectInactive = 5,
    InvalidArgument = 6,
    ArithmeticOverflow = 7,
}

/// Round lifecycle. Every round-scoped operation checks the current state and
/// fails with `InvalidRoundState` rather than tolerating mis-ordered calls.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoundState {
    Inactive,
    Active,
    Ended,
}

/// Per-project ledger aggregates for the current round.
///
/// `sum_sqrt_contributions` carries `SQRT_PRECISION` fixed-point digits per
/// root (see `harambee_common::math`).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectStats {
    pub total_contributions: i128,
    pub num_unique_contributors: u32,
    pub sum_sqrt_contributions: i128,
}

impl ProjectStats {
    fn zero() -> Self {
        ProjectStats {
            total_contributions: 0,
            num_unique_contributors: 0,
            sum_sqrt_contributions: 0,
        }
    }
}

/// Resumable distribution cursor. The pool and the round-wide squared-root-sum
/// aggregate are snapshotted on the first call so later batches settle against
/// the same denominators.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Distribution {
    pub pool: i128,
    pub sum_squares: i128,
    pub cursor: u32,
    pub matched_out: i128,
}

#[contracttype]
#[derive(Clone)]
enum DataKey {
    Owner,
    Catalog,
    PoolToken,
    ContributionToken,
    RoundNumber,
    RoundState,
    MatchingPool,
    // Round-scoped ledger (keyed by round number).
    Contribution(u32, u64, Address),
    Stats(u32, u64),
    RoundProjects(u32),
    SumSquares(u32),
    Distribution(u32),
}

// Interface for the project catalog contract.
#[soroban_sdk::contractclient(name = "CatalogClient")]
pub trait ProjectLookup {
    fn project_summary(env: Env, id: u64) -> Option<(u64, Address, bool)>;
}

mod events {
    use super::*;

    pub fn emit_round_started(env: &Env, round: u32) {
        const ROUND_STARTED: Symbol = symbol_short!("rnd_start");
        env.events().publish((ROUND_STARTED,), round);
    }

    pub fn emit_round_ended(env: &Env, round: u32) {
        const ROUND_ENDED: Symbol = symbol_short!("rnd_end");
        env.events().publish((ROUND_ENDED,), round);
    }

    pub fn emit_deposit(env: &Env, from: &Address, amount: i128, pool: i128) {
        const DEPOSIT: Symbol = symbol_short!("deposit");
        env.events().publish((DEPOSIT, from.clone()), (amount, pool));
    }

    pub fn emit_contribution(
        env: &Env,
        project_id: u64,
        contributor: &Address,
        amount: i128,
        cumulative: i128,
    ) {
        const CONTRIBUTION: Symbol = symbol_short!("contrib");
        env.events().publish(
            (CONTRIBUTION, project_id, contributor.clone()),
            (amount, cumulative),
        );
    }

    pub fn emit_payout(
        env: &Env,
        project_id: u64,
        owner: &Address,
        token_amount: i128,
        match_amount: i128,
    ) {
        const PAYOUT: Symbol = symbol_short!("payout");
        env.events().publish(
            (PAYOUT, project_id),
            (owner.clone(), token_amount, match_amount),
        );
    }

    pub fn emit_distribution_completed(env: &Env, round: u32, matched: i128, carried: i128) {
        const DIST_DONE: Symbol = symbol_short!("dist_done");
        env.events().publish((DIST_DONE, round), (matched, carried));
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

fn round_state(env: &Env) -> RoundState {
    env.storage()
        .instance()
        .get(&DataKey::RoundState)
        .unwrap_or(RoundState::Inactive)
}

fn require_state(env: &Env, expected: RoundState) -> Result<(), Error> {
    if round_state(env) != expected {
        return Err(Error::InvalidRoundState);
    }
    Ok(())
}

fn round_number(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::RoundNumber)
        .unwrap_or(0)
}

fn matching_pool(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::MatchingPool)
        .unwrap_or(0)
}

fn get_stats(env: &Env, round: u32, project_id: u64) -> ProjectStats {
    env.storage()
        .persistent()
        .get(&DataKey::Stats(round, project_id))
        .unwrap_or_else(ProjectStats::zero)
}

fn round_projects(env: &Env, round: u32) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::RoundProjects(round))
        .unwrap_or_else(|| Vec::new(env))
}

fn sum_squares(env: &Env, round: u32) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::SumSquares(round))
        .unwrap_or(0)
}

#[contract]
pub struct FundingEngineContract;

#[contractimpl]
impl FundingEngineContract {
    /// One-time setup.
    ///
    /// * `owner` - Round administrator.
    /// * `catalog` - Project catalog contract address.
    /// * `pool_token` - Native-asset contract funding the matching pool.
    /// * `contribution_token` - Fungible token contributions are made in.
    pub fn initialize(
        env: Env,
        owner: Address,
        catalog: Address,
        pool_token: Address,
        contribution_token: Address,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Catalog, &catalog);
        env.storage().instance().set(&DataKey::PoolToken, &pool_token);
        env.storage()
            .instance()
            .set(&DataKey::ContributionToken, &contribution_token);
        Ok(())
    }

    // ── Round lifecycle ─────────────────────────────────────────────

    /// Open a new round. Owner only; legal only from `Inactive`.
    ///
    /// Increments the round number, which implicitly presents an empty
    /// contribution ledger (ledger entries are keyed by round). The pool
    /// balance is not zeroed: at this point it holds only the rounding
    /// remainder carried over from the previous distribution.
    pub fn start_round(env: Env, caller: Address) -> Result<u32, Error> {
        require_owner(&env, &caller)?;
        require_state(&env, RoundState::Inactive)?;

        let round = round_number(&env)
            .checked_add(1)
            .ok_or(Error::ArithmeticOverflow)?;
        env.storage().instance().set(&DataKey::RoundNumber, &round);
        env.storage()
            .instance()
            .set(&DataKey::RoundState, &RoundState::Active);

        events::emit_round_started(&env, round);
        Ok(round)
    }

    /// Close the current round. Owner only; legal only from `Active`.
    /// Freezes all further deposits and contributions.
    pub fn end_round(env: Env, caller: Address) -> Result<(), Error> {
        require_owner(&env, &caller)?;
        require_state(&env, RoundState::Active)?;
        env.storage()
            .instance()
            .set(&DataKey::RoundState, &RoundState::Ended);
        events::emit_round_ended(&env, round_number(&env));
        Ok(())
    }

    // ── Funding ─────────────────────────────────────────────────────

    /// Add native-asset value to the current round's matching pool.
    ///
    /// Anyone may deposit, but only while a round is `Active` so funds cannot
    /// stray across rounds. Pool accounting is committed before the asset
    /// pull; a failed transfer aborts the call and reverts the balance.
    pub fn deposit_matching_funds(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidArgument);
        }
        require_state(&env, RoundState::Active)?;

        let pool = matching_pool(&env)
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        env.storage().instance().set(&DataKey::MatchingPool, &pool);

        let pool_token: Address = env.storage().instance().get(&DataKey::PoolToken).unwrap();
        token::Client::new(&env, &pool_token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        events::emit_deposit(&env, &from, amount, pool);
        Ok(())
    }

    /// Contribute `amount` of the contribution token to a project.
    ///
    /// Requires an `Active` round, a positive amount, and a known, active
    /// project. The token is pulled via `transfer_from`, so the contributor
    /// must have approved the engine beforehand; allowance or balance
    /// shortfalls are the token contract's errors and leave the ledger
    /// untouched.
    ///
    /// Ledger update for a contributor moving from cumulative `old` to
    /// `new = old + amount`:
    ///
    /// ```text
    /// sum_sqrt  += scaled_sqrt(new) - scaled_sqrt(old)
    /// ΣS        += sum_sqrt_after² - sum_sqrt_before²
    /// total     += amount
    /// ```
    ///
    /// so both aggregates track cumulative roots exactly, never drifting
    /// per-call approximations.
    pub fn contribute(
        env: Env,
        contributor: Address,
        project_id: u64,
        amount: i128,
    ) -> Result<(), Error> {
        contributor.require_auth();
        require_state(&env, RoundState::Active)?;
        if amount <= 0 {
            return Err(Error::InvalidArgument);
        }

        let catalog: Address = env.storage().instance().get(&DataKey::Catalog).unwrap();
        let (_, _, active) = CatalogClient::new(&env, &catalog)
            .project_summary(&project_id)
            .ok_or(Error::NotFound)?;
        if !active {
            return Err(Error::ProjectInactive);
        }

        let round = round_number(&env);
        let contribution_key = DataKey::Contribution(round, project_id, contributor.clone());
        let old: i128 = env
            .storage()
            .persistent()
            .get(&contribution_key)
            .unwrap_or(0);
        let new = old.checked_add(amount).ok_or(Error::ArithmeticOverflow)?;

        let old_sqrt = scaled_sqrt(old).ok_or(Error::ArithmeticOverflow)?;
        let new_sqrt = scaled_sqrt(new).ok_or(Error::ArithmeticOverflow)?;

        let mut stats = get_stats(&env, round, project_id);
        if stats.total_contributions == 0 {
            let mut projects = round_projects(&env, round);
            projects.push_back(project_id);
            env.storage()
                .persistent()
                .set(&DataKey::RoundProjects(round), &projects);
        }
        if old == 0 {
            stats.num_unique_contributors += 1;
        }

        let sum_before = stats.sum_sqrt_contributions;
        let sum_after = sum_before
            .checked_add(new_sqrt - old_sqrt)
            .ok_or(Error::ArithmeticOverflow)?;
        stats.sum_sqrt_contributions = sum_after;
        stats.total_contributions = stats
            .total_contributions
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;

        // Round-wide Σ (per-project root sum)², updated by the same
        // cumulative-delta rule.
        let sq_before = sum_before
            .checked_mul(sum_before)
            .ok_or(Error::ArithmeticOverflow)?;
        let sq_after = sum_after
            .checked_mul(sum_after)
            .ok_or(Error::ArithmeticOverflow)?;
        let squares = sum_squares(&env, round)
            .checked_add(sq_after - sq_before)
            .ok_or(Error::ArithmeticOverflow)?;

        env.storage().persistent().set(&contribution_key, &new);
        env.storage()
            .persistent()
            .set(&DataKey::Stats(round, project_id), &stats);
        env.storage()
            .persistent()
            .set(&DataKey::SumSquares(round), &squares);

        let contribution_token: Address = env
            .storage()
            .instance()
            .get(&DataKey::ContributionToken)
            .unwrap();
        token::Client::new(&env, &contribution_token).transfer_from(
            &env.current_contract_address(),
            &contributor,
            &env.current_contract_address(),
            &amount,
        );

        events::emit_contribution(&env, project_id, &contributor, amount, new);
        Ok(())
    }

    // ── Distribution ────────────────────────────────────────────────

    /// Settle the ended round: pay each contributed-to project its direct
    /// token contributions plus its matching share
    /// `pool * sum_sqrt² / Σ sum_sqrt²` (floored).
    ///
    /// Owner only; legal only from `Ended`. At most `DISTRIBUTE_BATCH_MAX`
    /// projects are settled per call; the cursor is stored and the call
    /// returns how many projects remain, so arbitrarily large rounds settle
    /// across several bounded transactions. Pool and denominator are
    /// snapshotted on the first call.
    ///
    /// A project deactivated after contributions were accepted still receives
    /// its direct contributions but forfeits its matching share, which stays
    /// in the pool. The undistributed remainder (flooring dust plus forfeited
    /// shares) carries over as the next round's opening pool balance.
    ///
    /// All cursor and round-state changes are committed before any transfer
    /// in the batch is executed. Once the last batch completes the state
    /// returns to `Inactive`; a further call fails with `InvalidRoundState`.
    /// A round with no contributions settles immediately, distributing
    /// nothing.
    pub fn distribute_matching_funds(env: Env, caller: Address) -> Result<u32, Error> {
        require_owner(&env, &caller)?;
        require_state(&env, RoundState::Ended)?;

        let round = round_number(&env);
        let dist_key = DataKey::Distribution(round);
        let mut dist: Distribution =
            env.storage()
                .persistent()
                .get(&dist_key)
                .unwrap_or(Distribution {
                    pool: matching_pool(&env),
                    sum_squares: sum_squares(&env, round),
                    cursor: 0,
                    matched_out: 0,
                });

        let projects = round_projects(&env, round);
        let catalog: Address = env.storage().instance().get(&DataKey::Catalog).unwrap();
        let catalog_client = CatalogClient::new(&env, &catalog);

        // Phase 1: compute this batch's payouts against the snapshots.
        let batch_end = projects.len().min(dist.cursor + DISTRIBUTE_BATCH_MAX);
        let mut payouts: Vec<(u64, Address, i128, i128)> = Vec::new(&env);
        let mut matched = dist.matched_out;
        for i in dist.cursor..batch_end {
            let project_id = projects.get(i).unwrap();
            let stats = get_stats(&env, round, project_id);
            let (_, owner, active) = catalog_client
                .project_summary(&project_id)
                .ok_or(Error::NotFound)?;

            let share = if active && dist.sum_squares > 0 {
                let sq = stats
                    .sum_sqrt_contributions
                    .checked_mul(stats.sum_sqrt_contributions)
                    .ok_or(Error::ArithmeticOverflow)?;
                mul_div_floor(dist.pool, sq, dist.sum_squares)
                    .ok_or(Error::ArithmeticOverflow)?
            } else {
                0
            };
            matched = matched.checked_add(share).ok_or(Error::ArithmeticOverflow)?;
            payouts.push_back((project_id, owner, stats.total_contributions, share));
        }

        // Phase 2: commit ledger state before any transfer runs.
        dist.cursor = batch_end;
        dist.matched_out = matched;
        env.storage().persistent().set(&dist_key, &dist);

        let remaining = projects.len() - batch_end;
        if remaining == 0 {
            let carried = dist.pool - dist.matched_out;
            env.storage()
                .instance()
                .set(&DataKey::MatchingPool, &carried);
            env.storage()
                .instance()
                .set(&DataKey::RoundState, &RoundState::Inactive);
            events::emit_distribution_completed(&env, round, dist.matched_out, carried);
        }

        // Phase 3: transfers. A recipient rejecting funds aborts the whole
        // call, reverting this batch's cursor advance with it.
        let contribution_token: Address = env
            .storage()
            .instance()
            .get(&DataKey::ContributionToken)
            .unwrap();
        let pool_token: Address = env.storage().instance().get(&DataKey::PoolToken).unwrap();
        let token_client = token::Client::new(&env, &contribution_token);
        let pool_client = token::Client::new(&env, &pool_token);
        let this = env.current_contract_address();
        for (project_id, owner, token_amount, match_amount) in payouts.iter() {
            if token_amount > 0 {
                token_client.transfer(&this, &owner, &token_amount);
            }
            if match_amount > 0 {
                pool_client.transfer(&this, &owner, &match_amount);
            }
            events::emit_payout(&env, project_id, &owner, token_amount, match_amount);
        }

        Ok(remaining)
    }

    // ── Read-only queries ───────────────────────────────────────────

    /// True while the current round accepts deposits and contributions.
    pub fn round_active(env: Env) -> bool {
        round_state(&env) == RoundState::Active
    }

    pub fn round_number(env: Env) -> u32 {
        round_number(&env)
    }

    pub fn round_state(env: Env) -> RoundState {
        round_state(&env)
    }

    /// Native-asset balance earmarked for matching in the current round.
    pub fn matching_pool(env: Env) -> i128 {
        matching_pool(&env)
    }

    /// Current-round ledger aggregates for a project. Zeros when the project
    /// has no contributions this round, and zeros again as soon as the round
    /// is settled: `Inactive` only ever holds before the first round or after
    /// a completed distribution, so an `Inactive` ledger always reads empty.
    pub fn get_project_stats(env: Env, project_id: u64) -> ProjectStats {
        if round_state(&env) == RoundState::Inactive {
            return ProjectStats::zero();
        }
        get_stats(&env, round_number(&env), project_id)
    }

    /// A contributor's cumulative contribution to a project this round.
    /// Reads as zero once the round is settled, like `get_project_stats`.
    pub fn get_contribution(env: Env, project_id: u64, contributor: Address) -> i128 {
        if round_state(&env) == RoundState::Inactive {
            return 0;
        }
        env.storage()
            .persistent()
            .get(&DataKey::Contribution(
                round_number(&env),
                project_id,
                contributor,
            ))
            .unwrap_or(0)
    }

    pub fn get_owner(env: Env) -> Address {
        get_owner(&env)
    }

    pub fn get_catalog(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Catalog).unwrap()
    }
}
