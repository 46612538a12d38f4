#![cfg(kani)]
//! Kani proof harnesses for the tag validation model.
//!
//! These harnesses verify core invariants of the validation semantics using
//! a model that mirrors `validate_tags`/`validate_conditions` without
//! `String`, pattern matching, or set containers.
//!
//! Model:
//! - The tag universe is `MAX_N` slots; tag sets are boolean arrays.
//! - Each rule applies to a subset of slots (the pattern abstraction) and
//!   carries one constraint kind:
//!   0 = forbidden, 1 = add-requires-role, 2 = remove-requires-role,
//!   3 = privileged.
//! - Roles are a bitmask; a role requirement passes when the held mask
//!   intersects the required mask.
//! - A slot is invalid when any applicable rule rejects its change.
//! - Groups are member masks plus a condition: 0 = exclusive, 1 = at-most,
//!   2 = at-least, with an inclusive bound.
//!
//! Run with: `cargo kani --tests --harness <harness_name>`

/// Maximum number of tag slots / rules / groups for bounded proofs.
const MAX_N: usize = 6;

const KIND_FORBIDDEN: u8 = 0;
const KIND_ADD_REQUIRES: u8 = 1;
const KIND_REMOVE_REQUIRES: u8 = 2;
const KIND_PRIVILEGED: u8 = 3;

/// Does one rule reject a change to slot `slot`?
///
/// `is_add` is the change direction; `roles_held`/`rule_roles` are bitmasks.
fn rule_rejects(
    applies: bool,
    kind: u8,
    rule_roles: u8,
    is_add: bool,
    roles_held: u8,
) -> bool {
    if !applies {
        return false;
    }
    match kind {
        KIND_FORBIDDEN => is_add,
        KIND_ADD_REQUIRES => is_add && (roles_held & rule_roles) == 0,
        KIND_REMOVE_REQUIRES => !is_add && (roles_held & rule_roles) == 0,
        _ => roles_held == 0,
    }
}

/// Mirror of the delta check: a slot is invalid when any applicable rule
/// rejects its side of the delta.
fn model_validate_tags(
    n_tags: usize,
    n_rules: usize,
    added: &[bool; MAX_N],
    removed: &[bool; MAX_N],
    roles_held: u8,
    rule_applies: &[[bool; MAX_N]; MAX_N],
    rule_kind: &[u8; MAX_N],
    rule_roles: &[u8; MAX_N],
) -> [bool; MAX_N] {
    let mut invalid = [false; MAX_N];
    let mut slot: usize = 0;
    while slot < n_tags {
        let mut rule: usize = 0;
        while rule < n_rules {
            if added[slot]
                && rule_rejects(
                    rule_applies[rule][slot],
                    rule_kind[rule],
                    rule_roles[rule],
                    true,
                    roles_held,
                )
            {
                invalid[slot] = true;
            }
            if removed[slot]
                && rule_rejects(
                    rule_applies[rule][slot],
                    rule_kind[rule],
                    rule_roles[rule],
                    false,
                    roles_held,
                )
            {
                invalid[slot] = true;
            }
            rule += 1;
        }
        slot += 1;
    }
    invalid
}

/// Mirror of a group condition check over a member count.
fn condition_admits(kind: u8, bound: usize, count: usize) -> bool {
    match kind {
        0 => count <= 1,
        1 => count <= bound,
        _ => count >= bound,
    }
}

fn count_members(n_tags: usize, current: &[bool; MAX_N], members: &[bool; MAX_N]) -> usize {
    let mut count: usize = 0;
    let mut slot: usize = 0;
    while slot < n_tags {
        if current[slot] && members[slot] {
            count += 1;
        }
        slot += 1;
    }
    count
}

// ---------------------------------------------------------------------------
// Proof 1: Panic freedom
//
// The model never panics for any inputs up to MAX_N slots and rules.
// ---------------------------------------------------------------------------

#[kani::proof]
#[kani::unwind(8)]
fn panic_freedom() {
    let n_tags: usize = kani::any();
    kani::assume(n_tags >= 1 && n_tags <= MAX_N);
    let n_rules: usize = kani::any();
    kani::assume(n_rules <= MAX_N);

    let added: [bool; MAX_N] = kani::any();
    let removed: [bool; MAX_N] = kani::any();
    let roles_held: u8 = kani::any();
    let rule_applies: [[bool; MAX_N]; MAX_N] = kani::any();
    let rule_kind: [u8; MAX_N] = kani::any();
    let rule_roles: [u8; MAX_N] = kani::any();

    let mut i: usize = 0;
    while i < n_rules {
        kani::assume(rule_kind[i] <= KIND_PRIVILEGED);
        i += 1;
    }

    let _ = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );
}

// ---------------------------------------------------------------------------
// Proof 2: Delta confinement
//
// A slot outside the delta can never be marked invalid.
// ---------------------------------------------------------------------------

#[kani::proof]
#[kani::unwind(8)]
fn delta_confinement() {
    let n_tags: usize = kani::any();
    kani::assume(n_tags >= 1 && n_tags <= MAX_N);
    let n_rules: usize = kani::any();
    kani::assume(n_rules <= MAX_N);

    let added: [bool; MAX_N] = kani::any();
    let removed: [bool; MAX_N] = kani::any();
    let roles_held: u8 = kani::any();
    let rule_applies: [[bool; MAX_N]; MAX_N] = kani::any();
    let rule_kind: [u8; MAX_N] = kani::any();
    let rule_roles: [u8; MAX_N] = kani::any();

    let mut i: usize = 0;
    while i < n_rules {
        kani::assume(rule_kind[i] <= KIND_PRIVILEGED);
        i += 1;
    }

    let invalid = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );

    let mut slot: usize = 0;
    while slot < n_tags {
        if invalid[slot] {
            kani::assert(
                added[slot] || removed[slot],
                "invalid slot outside the delta",
            );
        }
        slot += 1;
    }
}

// ---------------------------------------------------------------------------
// Proof 3: Role monotonicity
//
// Widening the held-role mask never marks a new slot invalid.
// ---------------------------------------------------------------------------

#[kani::proof]
#[kani::unwind(8)]
fn role_monotonicity() {
    let n_tags: usize = kani::any();
    kani::assume(n_tags >= 1 && n_tags <= MAX_N);
    let n_rules: usize = kani::any();
    kani::assume(n_rules <= MAX_N);

    let added: [bool; MAX_N] = kani::any();
    let removed: [bool; MAX_N] = kani::any();
    let roles_held: u8 = kani::any();
    let extra_roles: u8 = kani::any();
    let rule_applies: [[bool; MAX_N]; MAX_N] = kani::any();
    let rule_kind: [u8; MAX_N] = kani::any();
    let rule_roles: [u8; MAX_N] = kani::any();

    let mut i: usize = 0;
    while i < n_rules {
        kani::assume(rule_kind[i] <= KIND_PRIVILEGED);
        i += 1;
    }

    let narrow = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );
    let wide = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held | extra_roles,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );

    let mut slot: usize = 0;
    while slot < n_tags {
        if wide[slot] {
            kani::assert(narrow[slot], "granting roles invalidated a slot");
        }
        slot += 1;
    }
}

// ---------------------------------------------------------------------------
// Proof 4: Determinism
//
// The same inputs always produce the same invalid set.
// ---------------------------------------------------------------------------

#[kani::proof]
#[kani::unwind(8)]
fn determinism() {
    let n_tags: usize = kani::any();
    kani::assume(n_tags >= 1 && n_tags <= MAX_N);
    let n_rules: usize = kani::any();
    kani::assume(n_rules <= MAX_N);

    let added: [bool; MAX_N] = kani::any();
    let removed: [bool; MAX_N] = kani::any();
    let roles_held: u8 = kani::any();
    let rule_applies: [[bool; MAX_N]; MAX_N] = kani::any();
    let rule_kind: [u8; MAX_N] = kani::any();
    let rule_roles: [u8; MAX_N] = kani::any();

    let mut i: usize = 0;
    while i < n_rules {
        kani::assume(rule_kind[i] <= KIND_PRIVILEGED);
        i += 1;
    }

    let first = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );
    let second = model_validate_tags(
        n_tags,
        n_rules,
        &added,
        &removed,
        roles_held,
        &rule_applies,
        &rule_kind,
        &rule_roles,
    );

    let mut slot: usize = 0;
    while slot < n_tags {
        kani::assert(first[slot] == second[slot], "invalid sets must match");
        slot += 1;
    }
}

// ---------------------------------------------------------------------------
// Proof 5: Exclusivity equals at-most-one
//
// The exclusive condition admits exactly the counts at-most(1) admits, for
// every reachable member count.
// ---------------------------------------------------------------------------

#[kani::proof]
#[kani::unwind(8)]
fn exclusive_equals_at_most_one() {
    let n_tags: usize = kani::any();
    kani::assume(n_tags >= 1 && n_tags <= MAX_N);

    let current: [bool; MAX_N] = kani::any();
    let members: [bool; MAX_N] = kani::any();

    let count = count_members(n_tags, &current, &members);
    kani::assert(
        condition_admits(0, 0, count) == condition_admits(1, 1, count),
        "exclusive must coincide with at-most(1)",
    );
}
