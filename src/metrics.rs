//! Minimal metrics scaffolding: process-wide atomic counters for command
//! dispatch and persistence health, with a cheap snapshot for `status`.

use std::sync::atomic::{AtomicU64, Ordering};

static COMMANDS_DISPATCHED: AtomicU64 = AtomicU64::new(0);
static COMMAND_ERRORS: AtomicU64 = AtomicU64::new(0);
static COOLDOWN_REJECTIONS: AtomicU64 = AtomicU64::new(0);
static PERSIST_RETRIES: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILED: AtomicU64 = AtomicU64::new(0);

pub fn inc_commands_dispatched() {
    COMMANDS_DISPATCHED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_command_errors() {
    COMMAND_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_cooldown_rejections() {
    COOLDOWN_REJECTIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persist_retry() {
    PERSIST_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persist_failed() {
    PERSIST_FAILED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub commands_dispatched: u64,
    pub command_errors: u64,
    pub cooldown_rejections: u64,
    pub persist_retries: u64,
    pub persist_failed: u64,
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        commands_dispatched: COMMANDS_DISPATCHED.load(Ordering::Relaxed),
        command_errors: COMMAND_ERRORS.load(Ordering::Relaxed),
        cooldown_rejections: COOLDOWN_REJECTIONS.load(Ordering::Relaxed),
        persist_retries: PERSIST_RETRIES.load(Ordering::Relaxed),
        persist_failed: PERSIST_FAILED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_the_snapshot() {
        let before = snapshot();
        inc_commands_dispatched();
        inc_commands_dispatched();
        inc_command_errors();
        inc_persist_retry();
        let after = snapshot();
        assert!(after.commands_dispatched >= before.commands_dispatched + 2);
        assert!(after.command_errors >= before.command_errors + 1);
        assert!(after.persist_retries >= before.persist_retries + 1);
    }
}
