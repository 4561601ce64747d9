//! Deterministic record addressing.
//!
//! Every record lives at a 32-byte address derived from its kind, its owner
//! and (for liquidity positions) a slot index. The derivation is a pure
//! function, so any party can recompute where a record lives, and a record
//! read back from an address must name the owner the address was derived for.

use candid::Principal;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;

const GLOBAL_STATE_SEED: &[u8] = b"global_state";
const USER_LIQUIDITY_SEED: &[u8] = b"user_liquidity";
const USER_BALANCE_SEED: &[u8] = b"user_balance";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    GlobalState,
    UserLiquidity { owner: Principal, slot: u64 },
    UserBalance { owner: Principal },
}

impl RecordKey {
    pub fn owner(&self) -> Option<Principal> {
        match self {
            RecordKey::GlobalState => None,
            RecordKey::UserLiquidity { owner, .. } | RecordKey::UserBalance { owner } => Some(*owner),
        }
    }

    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        match self {
            RecordKey::GlobalState => {
                hasher.update(GLOBAL_STATE_SEED);
            }
            RecordKey::UserLiquidity { owner, slot } => {
                hasher.update(USER_LIQUIDITY_SEED);
                hash_principal(&mut hasher, owner);
                hasher.update(slot.to_le_bytes());
            }
            RecordKey::UserBalance { owner } => {
                hasher.update(USER_BALANCE_SEED);
                hash_principal(&mut hasher, owner);
            }
        }
        Address(hasher.finalize().into())
    }
}

// Principals are variable length; prefix the length so seeds cannot collide
fn hash_principal(hasher: &mut Sha256, owner: &Principal) {
    let bytes = owner.as_slice();
    hasher.update([bytes.len() as u8]);
    hasher.update(bytes);
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Storable for Address {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Address(out)
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 32,
        is_fixed_size: true,
    };
}
