//! Initiative limiter — cooldown and daily cap for persona-initiated
//! messages, so a quiet user is nudged but never flooded.

use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use tracing::debug;

use amica_core::config::InitiativeConfig;
use amica_core::types::{NpcId, UserId};

#[derive(Debug, Clone, Copy)]
struct InitiativeState {
    last_sent: DateTime<Utc>,
    day_ordinal: i32,
    sent_today: u32,
}

/// Per-pair limiter for persona-initiated messages.
///
/// A send is allowed when the cooldown since the last initiative has
/// elapsed and the daily cap is not exhausted. Days roll over at UTC
/// midnight. All methods take an explicit `now` so tests drive the clock.
#[derive(Debug, Default)]
pub struct InitiativeLimiter {
    state: DashMap<(UserId, NpcId), InitiativeState>,
}

impl InitiativeLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn day_of(now: DateTime<Utc>) -> i32 {
        now.num_days_from_ce()
    }

    /// Whether an initiative toward this pair may be sent at `now`.
    #[must_use]
    pub fn allow(
        &self,
        user: UserId,
        npc: NpcId,
        now: DateTime<Utc>,
        config: &InitiativeConfig,
    ) -> bool {
        match self.state.get(&(user, npc)) {
            None => true,
            Some(entry) => {
                let elapsed = now.signed_duration_since(entry.last_sent);
                if elapsed.num_seconds() < config.cooldown_seconds as i64 {
                    return false;
                }
                if entry.day_ordinal == Self::day_of(now) && entry.sent_today >= config.daily_cap {
                    return false;
                }
                true
            }
        }
    }

    /// Record that an initiative was sent at `now`.
    pub fn record(&self, user: UserId, npc: NpcId, now: DateTime<Utc>) {
        let day = Self::day_of(now);
        self.state
            .entry((user, npc))
            .and_modify(|entry| {
                entry.last_sent = now;
                if entry.day_ordinal == day {
                    entry.sent_today += 1;
                } else {
                    entry.day_ordinal = day;
                    entry.sent_today = 1;
                }
            })
            .or_insert(InitiativeState {
                last_sent: now,
                day_ordinal: day,
                sent_today: 1,
            });
        debug!(user = %user, npc = %npc, "initiative recorded");
    }

    /// Combined check-and-record. Returns whether the send may proceed.
    pub fn try_initiate(
        &self,
        user: UserId,
        npc: NpcId,
        now: DateTime<Utc>,
        config: &InitiativeConfig,
    ) -> bool {
        if self.allow(user, npc, now, config) {
            self.record(user, npc, now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).single().expect("valid")
    }

    fn config() -> InitiativeConfig {
        InitiativeConfig {
            cooldown_seconds: 3600,
            daily_cap: 3,
        }
    }

    #[test]
    fn first_initiative_is_allowed() {
        let limiter = InitiativeLimiter::new();
        assert!(limiter.try_initiate(UserId::new(), NpcId::new(), t0(), &config()));
    }

    #[test]
    fn cooldown_blocks_rapid_sends() {
        let limiter = InitiativeLimiter::new();
        let (user, npc) = (UserId::new(), NpcId::new());
        assert!(limiter.try_initiate(user, npc, t0(), &config()));
        assert!(!limiter.try_initiate(user, npc, t0() + Duration::minutes(30), &config()));
        assert!(limiter.try_initiate(user, npc, t0() + Duration::minutes(61), &config()));
    }

    #[test]
    fn daily_cap_blocks_fourth_send() {
        let limiter = InitiativeLimiter::new();
        let (user, npc) = (UserId::new(), NpcId::new());
        for i in 0..3 {
            let now = t0() + Duration::hours(2 * i);
            assert!(limiter.try_initiate(user, npc, now, &config()), "send {i}");
        }
        assert!(!limiter.try_initiate(user, npc, t0() + Duration::hours(8), &config()));
    }

    #[test]
    fn cap_resets_at_day_rollover() {
        let limiter = InitiativeLimiter::new();
        let (user, npc) = (UserId::new(), NpcId::new());
        for i in 0..3 {
            limiter.record(user, npc, t0() + Duration::hours(2 * i));
        }
        let next_day = t0() + Duration::days(1);
        assert!(limiter.allow(user, npc, next_day, &config()));
    }

    #[test]
    fn pairs_are_independent() {
        let limiter = InitiativeLimiter::new();
        let user = UserId::new();
        let luna = NpcId::new();
        let mara = NpcId::new();
        assert!(limiter.try_initiate(user, luna, t0(), &config()));
        assert!(limiter.try_initiate(user, mara, t0(), &config()));
    }
}
