//! # Operation Environment
//!
//! The two environmental inputs every ledger operation needs: the calling
//! principal and the current logical height. The host runtime constructs a
//! [`TxEnv`] per operation and passes it by reference; engines read it and
//! nothing else — no hidden globals, no wall clock.
//!
//! The height counter is externally advanced and monotonically non-decreasing.
//! Engines only ever compare it; they never advance it.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// The environment of a single externally invoked operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEnv {
    caller: Identity,
    height: u64,
}

impl TxEnv {
    /// Creates the environment for one operation.
    pub fn new(caller: Identity, height: u64) -> Self {
        Self { caller, height }
    }

    /// The authenticated identity of the current caller.
    pub fn caller(&self) -> &Identity {
        &self.caller
    }

    /// The current logical height.
    pub fn height(&self) -> u64 {
        self.height
    }
}
