use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::config::{DeviceLimits, ThrottleConfig};
use crate::domain::DeviceClass;
use crate::error::{AppError, AppResult};
use crate::security::clock::Clock;
use crate::security::fingerprint::ClientFingerprint;

const SHARD_COUNT: usize = 16;

/// Device-class-aware login throttle: a fixed 60s request window with a
/// consecutive-burst detector per client key, plus an independent loop guard
/// that hard-blocks sub-2-second retry storms. Keys are sharded so requests
/// for distinct clients proceed in parallel while each key's counters see a
/// serialized read-modify-write.
pub struct LoginThrottle {
    shards: Vec<RwLock<HashMap<String, ClientActivity>>>,
    config: ThrottleConfig,
    clock: Arc<dyn Clock>,
    shard_budget: usize,
}

impl LoginThrottle {
    pub fn new(config: ThrottleConfig, clock: Arc<dyn Clock>) -> Self {
        let shard_budget = config.max_tracked_keys.div_ceil(SHARD_COUNT).max(1);
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
            config,
            clock,
            shard_budget,
        }
    }

    /// Runs the throttle decision for one request. Returns the remaining
    /// window quota on allow. Counters advance whether or not the caller's
    /// credentials later verify; abusive traffic must be rejected before any
    /// expensive work.
    pub fn check(&self, fingerprint: &ClientFingerprint) -> AppResult<u32> {
        let now = self.clock.now();
        let window = Duration::seconds(self.config.window_seconds as i64);
        let loop_window = Duration::milliseconds(self.config.loop_window_ms as i64);

        let mut entries = self.write_shard(Self::shard_index(&fingerprint.key));

        let Some(activity) = entries.get_mut(&fingerprint.key) else {
            if entries.len() >= self.shard_budget {
                Self::evict_oldest_idle(&mut entries);
            }
            entries.insert(
                fingerprint.key.clone(),
                ClientActivity::first(now, fingerprint.device),
            );
            return Ok(self
                .limits_for(fingerprint.device)
                .max_requests
                .saturating_sub(1));
        };

        let limits = self.limits_for(activity.rate.device);

        // Loop guard first, independent of the window state: it catches
        // sub-2-second storms that the coarser counters would let through.
        if now - activity.loop_state.first_attempt_at < loop_window {
            activity.loop_state.attempts += 1;
            activity.loop_state.last_attempt_at = now;
            if activity.loop_state.attempts > self.config.loop_max_attempts {
                activity.rate.blocked_until =
                    Some(now + Duration::seconds(self.config.loop_block_seconds as i64));
                activity.loop_state = LoopState::fresh(now);
                tracing::warn!(key = %fingerprint.key, "request loop detected, hard-blocking client");
                return Err(AppError::LoopDetected {
                    retry_after_seconds: self.config.loop_block_seconds,
                });
            }
        } else {
            activity.loop_state = LoopState::fresh(now);
        }

        if let Some(blocked_until) = activity.rate.blocked_until {
            if blocked_until > now {
                return Err(AppError::RateLimited {
                    retry_after_seconds: seconds_until(blocked_until, now),
                });
            }
        }

        let rate = &mut activity.rate;

        // Lazy window roll.
        if now - rate.window_start > window {
            rate.count = 1;
            rate.window_start = now;
            rate.last_request_at = now;
            rate.consecutive_fast = 1;
            rate.blocked_until = None;
            return Ok(limits.max_requests.saturating_sub(1));
        }

        let delta = now - rate.last_request_at;
        if delta < Duration::milliseconds(limits.min_interval_ms as i64) {
            rate.consecutive_fast += 1;
            let hard_fast = delta < Duration::milliseconds(limits.hard_fast_ms as i64);
            let high_frequency = rate.count > limits.high_frequency_floor
                && delta < Duration::milliseconds(limits.high_frequency_interval_ms as i64);
            if rate.consecutive_fast >= limits.max_consecutive_fast && (hard_fast || high_frequency)
            {
                rate.blocked_until = Some(now + Duration::seconds(limits.block_seconds as i64));
                rate.last_request_at = now;
                return Err(AppError::RateLimited {
                    retry_after_seconds: limits.block_seconds,
                });
            }
        } else {
            rate.consecutive_fast = rate.consecutive_fast.saturating_sub(1).max(1);
        }

        rate.count += 1;
        rate.last_request_at = now;

        if rate.count >= limits.max_requests {
            let window_ends = rate.window_start + window;
            return Err(AppError::RateLimited {
                retry_after_seconds: seconds_until(window_ends, now),
            });
        }

        Ok(limits.max_requests - rate.count)
    }

    /// Drops entries idle past the retention horizon, then enforces the
    /// size cap oldest-idle-first. Returns the number of evicted keys.
    /// Scheduled on an interval in main; safe to call concurrently with
    /// `check` because each shard is swept under its own write lock.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let retention = Duration::seconds(self.config.retention_seconds as i64);
        let mut removed = 0;

        for index in 0..self.shards.len() {
            let mut entries = self.write_shard(index);
            let before = entries.len();
            entries.retain(|_, activity| !activity.is_evictable(now, retention));
            removed += before - entries.len();

            while entries.len() > self.shard_budget {
                if !Self::evict_oldest_idle(&mut entries) {
                    break;
                }
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "throttle sweep evicted idle entries");
        }
        removed
    }

    pub fn tracked_keys(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .unwrap_or_else(|e| {
                        tracing::warn!("throttle shard lock was poisoned, recovering the lock");
                        e.into_inner()
                    })
                    .len()
            })
            .sum()
    }

    pub fn sweep_interval_seconds(&self) -> u64 {
        self.config.sweep_interval_seconds
    }

    fn limits_for(&self, device: DeviceClass) -> DeviceLimits {
        match device {
            DeviceClass::Desktop => self.config.desktop,
            DeviceClass::Mobile => self.config.mobile,
        }
    }

    fn shard_index(key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % SHARD_COUNT
    }

    fn write_shard(&self, index: usize) -> RwLockWriteGuard<'_, HashMap<String, ClientActivity>> {
        self.shards[index].write().unwrap_or_else(|e| {
            tracing::warn!("throttle shard lock was poisoned, recovering the lock");
            e.into_inner()
        })
    }

    fn evict_oldest_idle(entries: &mut HashMap<String, ClientActivity>) -> bool {
        let oldest = entries
            .iter()
            .min_by_key(|(_, activity)| activity.last_activity())
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                entries.remove(&key);
                true
            }
            None => false,
        }
    }
}

fn seconds_until(target: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (target - now).num_milliseconds().max(0) as u64;
    ms.div_ceil(1_000).max(1)
}

struct ClientActivity {
    rate: RateState,
    loop_state: LoopState,
}

impl ClientActivity {
    fn first(now: DateTime<Utc>, device: DeviceClass) -> Self {
        Self {
            rate: RateState {
                count: 1,
                window_start: now,
                last_request_at: now,
                consecutive_fast: 1,
                blocked_until: None,
                device,
            },
            loop_state: LoopState::fresh(now),
        }
    }

    fn last_activity(&self) -> DateTime<Utc> {
        self.rate
            .last_request_at
            .max(self.loop_state.last_attempt_at)
    }

    fn is_evictable(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        // Entries serving an active block survive retention.
        if self.rate.blocked_until.is_some_and(|until| until > now) {
            return false;
        }
        now - self.last_activity() > retention
    }
}

#[derive(Clone)]
struct RateState {
    count: u32,
    window_start: DateTime<Utc>,
    last_request_at: DateTime<Utc>,
    consecutive_fast: u32,
    blocked_until: Option<DateTime<Utc>>,
    device: DeviceClass,
}

#[derive(Clone)]
struct LoopState {
    attempts: u32,
    first_attempt_at: DateTime<Utc>,
    last_attempt_at: DateTime<Utc>,
}

impl LoopState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            first_attempt_at: now,
            last_attempt_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_until_rounds_up_and_never_reports_zero() {
        let now = Utc::now();
        assert_eq!(seconds_until(now + Duration::milliseconds(1_001), now), 2);
        assert_eq!(seconds_until(now + Duration::seconds(10), now), 10);
        assert_eq!(seconds_until(now, now), 1);
        assert_eq!(seconds_until(now - Duration::seconds(5), now), 1);
    }

    #[test]
    fn shard_index_is_stable_and_in_range() {
        let index = LoginThrottle::shard_index("203.0.113.7|desktop|curl/8.4.0");
        assert_eq!(
            index,
            LoginThrottle::shard_index("203.0.113.7|desktop|curl/8.4.0")
        );
        assert!(index < SHARD_COUNT);
    }
}
