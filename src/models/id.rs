//! # Prefixed Identifiers
//!
//! Entities are keyed by strings of the form `<prefix>_<u64>`, e.g.
//! `tsk_240912375409561826`. The numeric part is a roughly time-ordered
//! 64-bit value:
//!
//! ```text
//! | 32 bits: seconds since BASE_EPOCH | 21 bits: worker hash | 10 bits: sequence | 1 bit: version |
//! ```
//!
//! The worker hash is derived from `hostname:pid`, and the sequence counter
//! starts at a random offset per process so two workers started in the same
//! second rarely collide.

use crate::error::{Result, TaskforgeError};
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// 2022-06-20T00:00:00Z
pub const BASE_EPOCH: u64 = 1_655_683_200;
pub const VERSION: u64 = 0;

const TIMESTAMP_BITS: u32 = 32;
const WORKER_ID_BITS: u32 = 21;
const SEQUENCE_BITS: u32 = 10;
const VERSION_BITS: u32 = 1;

const TIMESTAMP_SHIFT: u32 = 32;
const WORKER_ID_SHIFT: u32 = 11;
const SEQUENCE_SHIFT: u32 = 1;
const VERSION_SHIFT: u32 = 0;

pub const SEQUENCE_MAX: u64 = (1 << SEQUENCE_BITS) - 1;

static SEQUENCE_START: OnceLock<u64> = OnceLock::new();
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);
static WORKER_HASH: OnceLock<u64> = OnceLock::new();

/// Entity prefixes used in identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Task,
    Step,
    Artifact,
    Organization,
    Workflow,
    WorkflowPermanent,
    WorkflowRun,
    WorkflowRunBlock,
    Credential,
    PersistentBrowserSession,
    Action,
}

impl IdPrefix {
    pub const ALL: [IdPrefix; 11] = [
        Self::Task,
        Self::Step,
        Self::Artifact,
        Self::Organization,
        Self::Workflow,
        Self::WorkflowPermanent,
        Self::WorkflowRun,
        Self::WorkflowRunBlock,
        Self::Credential,
        Self::PersistentBrowserSession,
        Self::Action,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "tsk",
            Self::Step => "stp",
            Self::Artifact => "a",
            Self::Organization => "o",
            Self::Workflow => "w",
            Self::WorkflowPermanent => "wpid",
            Self::WorkflowRun => "wr",
            Self::WorkflowRunBlock => "wrb",
            Self::Credential => "cred",
            Self::PersistentBrowserSession => "pbs",
            Self::Action => "act",
        }
    }
}

impl fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdPrefix {
    type Err = TaskforgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|prefix| prefix.as_str() == s)
            .ok_or_else(|| TaskforgeError::InvalidInput(format!("Unknown id prefix: {s}")))
    }
}

/// Generate a raw 64-bit identifier
pub fn generate_id() -> u64 {
    compose_id(current_time(), worker_hash(), next_sequence())
}

/// Generate an identifier with the given entity prefix
pub fn generate(prefix: IdPrefix) -> String {
    format!("{prefix}_{}", generate_id())
}

pub fn generate_task_id() -> String {
    generate(IdPrefix::Task)
}

pub fn generate_step_id() -> String {
    generate(IdPrefix::Step)
}

pub fn generate_artifact_id() -> String {
    generate(IdPrefix::Artifact)
}

pub fn generate_org_id() -> String {
    generate(IdPrefix::Organization)
}

pub fn generate_workflow_run_id() -> String {
    generate(IdPrefix::WorkflowRun)
}

/// Split a prefixed identifier into its prefix and numeric part
pub fn parse_prefixed_id(id: &str) -> Result<(IdPrefix, u64)> {
    let (prefix, number) = id
        .rsplit_once('_')
        .ok_or_else(|| TaskforgeError::InvalidInput(format!("Malformed id: {id}")))?;

    let prefix = prefix.parse::<IdPrefix>()?;
    let number = number
        .parse::<u64>()
        .map_err(|e| TaskforgeError::InvalidInput(format!("Malformed id {id}: {e}")))?;

    Ok((prefix, number))
}

/// Seconds since [`BASE_EPOCH`] encoded in an identifier
pub fn id_timestamp(id: u64) -> u64 {
    (id >> TIMESTAMP_SHIFT) & mask(TIMESTAMP_BITS)
}

fn compose_id(now_secs: u64, worker: u64, sequence: u64) -> u64 {
    let created_at = now_secs.saturating_sub(BASE_EPOCH);

    mask_shift(created_at, TIMESTAMP_BITS, TIMESTAMP_SHIFT)
        | mask_shift(worker, WORKER_ID_BITS, WORKER_ID_SHIFT)
        | mask_shift(sequence, SEQUENCE_BITS, SEQUENCE_SHIFT)
        | mask_shift(VERSION, VERSION_BITS, VERSION_SHIFT)
}

fn next_sequence() -> u64 {
    let start = *SEQUENCE_START.get_or_init(|| rand::thread_rng().gen_range(0..=SEQUENCE_MAX));
    (start + SEQUENCE_COUNTER.fetch_add(1, Ordering::Relaxed)) % SEQUENCE_MAX
}

fn worker_hash() -> u64 {
    *WORKER_HASH.get_or_init(|| {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let identity = format!("{host}:{}", std::process::id());

        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        hasher.finish()
    })
}

fn current_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(BASE_EPOCH)
}

fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

fn mask_shift(value: u64, mask_bits: u32, shift_bits: u32) -> u64 {
    (value & mask(mask_bits)) << shift_bits
}
