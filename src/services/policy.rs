use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};

use crate::database::PayrollStore;
use crate::error::AppError;
use crate::services::time_math;

pub const ROUNDING_MINUTES: &str = "rounding_minutes";
pub const WORKDAY_START: &str = "workday_start";
pub const WORKDAY_END: &str = "workday_end";
pub const GRACE_MINUTES: &str = "grace_minutes";
pub const REQUIRE_PHOTO_IN: &str = "require_photo_in";
pub const REQUIRE_PHOTO_OUT: &str = "require_photo_out";
pub const REQUIRE_GEO: &str = "require_geo";
pub const PUNCH_COOLDOWN_SECONDS: &str = "punch_cooldown_seconds";
pub const ALLOW_CROSS_MIDNIGHT: &str = "allow_cross_midnight";
pub const MAX_SHIFT_HOURS_SOFT: &str = "max_shift_hours_soft";

/// Upper bounds for the numeric settings.
pub const MAX_POLICY_MINUTES: u32 = 24 * 60;
pub const MAX_COOLDOWN_SECONDS: u64 = 24 * 60 * 60;

/// Punch-level rules read from the flat policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendancePolicy {
    pub rounding_minutes: u32,
    pub workday_start: String,
    pub workday_end: String,
    pub grace_minutes: u32,
    pub require_photo_in: bool,
    pub require_photo_out: bool,
    pub require_geo: bool,
    pub punch_cooldown_seconds: u64,
    pub allow_cross_midnight: bool,
    pub max_shift_hours_soft: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        AttendancePolicy {
            rounding_minutes: 0,
            workday_start: "08:00".to_string(),
            workday_end: "17:00".to_string(),
            grace_minutes: 0,
            require_photo_in: false,
            require_photo_out: false,
            require_geo: false,
            punch_cooldown_seconds: 0,
            allow_cross_midnight: false,
            max_shift_hours_soft: 16.0,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<String> {
    time_math::parse_hhmm(value).map(time_math::format_hhmm)
}

fn parse_bounded<T: std::str::FromStr + PartialOrd>(value: &str, max: T) -> Option<T> {
    value.trim().parse::<T>().ok().filter(|parsed| *parsed <= max)
}

fn parse_hours(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|hours| hours.is_finite() && *hours > 0.0)
}

impl AttendancePolicy {
    /// Unknown keys are ignored; missing or malformed values keep their default.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let mut policy = AttendancePolicy::default();

        for (key, value) in settings {
            if let Err(reason) = policy.apply(key, value) {
                log::warn!("Ignoring policy setting {}={:?}: {}", key, value, reason);
            }
        }

        policy
    }

    /// Applies one setting. Fails on an unknown key, a malformed value, or minutes
    /// and seconds beyond one day.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        let malformed = || format!("malformed value {:?}", value);

        match key {
            ROUNDING_MINUTES => {
                self.rounding_minutes =
                    parse_bounded(value, MAX_POLICY_MINUTES).ok_or_else(malformed)?
            }
            WORKDAY_START => self.workday_start = parse_time(value).ok_or_else(malformed)?,
            WORKDAY_END => self.workday_end = parse_time(value).ok_or_else(malformed)?,
            GRACE_MINUTES => {
                self.grace_minutes = parse_bounded(value, MAX_POLICY_MINUTES).ok_or_else(malformed)?
            }
            REQUIRE_PHOTO_IN => self.require_photo_in = parse_flag(value).ok_or_else(malformed)?,
            REQUIRE_PHOTO_OUT => self.require_photo_out = parse_flag(value).ok_or_else(malformed)?,
            REQUIRE_GEO => self.require_geo = parse_flag(value).ok_or_else(malformed)?,
            PUNCH_COOLDOWN_SECONDS => {
                self.punch_cooldown_seconds =
                    parse_bounded(value, MAX_COOLDOWN_SECONDS).ok_or_else(malformed)?
            }
            ALLOW_CROSS_MIDNIGHT => {
                self.allow_cross_midnight = parse_flag(value).ok_or_else(malformed)?
            }
            MAX_SHIFT_HOURS_SOFT => {
                self.max_shift_hours_soft = parse_hours(value).ok_or_else(malformed)?
            }
            _ => return Err(format!("unknown policy key {:?}", key)),
        }

        Ok(())
    }

    /// Settings as stored, flags rendered "0"/"1".
    pub fn to_settings(&self) -> BTreeMap<String, String> {
        let flag = |on: bool| if on { "1" } else { "0" }.to_string();

        BTreeMap::from([
            (ROUNDING_MINUTES.to_string(), self.rounding_minutes.to_string()),
            (WORKDAY_START.to_string(), self.workday_start.clone()),
            (WORKDAY_END.to_string(), self.workday_end.clone()),
            (GRACE_MINUTES.to_string(), self.grace_minutes.to_string()),
            (REQUIRE_PHOTO_IN.to_string(), flag(self.require_photo_in)),
            (REQUIRE_PHOTO_OUT.to_string(), flag(self.require_photo_out)),
            (REQUIRE_GEO.to_string(), flag(self.require_geo)),
            (
                PUNCH_COOLDOWN_SECONDS.to_string(),
                self.punch_cooldown_seconds.to_string(),
            ),
            (ALLOW_CROSS_MIDNIGHT.to_string(), flag(self.allow_cross_midnight)),
            (
                MAX_SHIFT_HOURS_SOFT.to_string(),
                self.max_shift_hours_soft.to_string(),
            ),
        ])
    }
}

const POLICY_CACHE_KEY: &str = "attendance_policy";

/// Caches the parsed policy for a TTL; writes through `update` invalidate it.
#[derive(Clone)]
pub struct PolicyCache {
    cache: Cache<&'static str, AttendancePolicy>,
}

impl PolicyCache {
    pub fn new(ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Self { cache }
    }

    /// Current policy. An unreadable settings table yields the defaults, uncached.
    pub async fn get<S: PayrollStore>(&self, store: &S) -> AttendancePolicy {
        let loaded = self
            .cache
            .try_get_with(POLICY_CACHE_KEY, async {
                let settings = store.get_policy_settings().await?;
                Ok::<_, AppError>(AttendancePolicy::from_settings(&settings))
            })
            .await;

        match loaded {
            Ok(policy) => policy,
            Err(err) => {
                log::warn!("Policy settings unavailable, using defaults: {}", err);
                AttendancePolicy::default()
            }
        }
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(POLICY_CACHE_KEY).await;
    }

    /// Validates every setting against the stored policy, writes them and drops the
    /// cached copy. Nothing is written if any setting is rejected.
    pub async fn update<S: PayrollStore>(
        &self,
        store: &S,
        settings: &HashMap<String, String>,
    ) -> Result<AttendancePolicy, AppError> {
        let mut policy = AttendancePolicy::from_settings(&store.get_policy_settings().await?);
        for (key, value) in settings {
            policy.apply(key, value).map_err(AppError::BadRequest)?;
        }

        for (key, value) in settings {
            store.save_policy_setting(key, value.trim()).await?;
        }
        self.invalidate().await;

        log::info!("Attendance policy updated: {:?}", settings.keys().collect::<Vec<_>>());
        Ok(policy)
    }
}
