use std::{path::Path, str::FromStr};

use anyhow::Context;

use crate::{Error, RankParams};

fn default_gravity() -> f64 {
    RankParams::default().gravity
}

fn default_timebase_hours() -> f64 {
    RankParams::default().timebase_hours
}

fn default_edit_window_minutes() -> i64 {
    120
}

fn default_page_size() -> i64 {
    30
}

fn default_vote_attempts() -> u32 {
    3
}

fn default_max_display_depth() -> usize {
    32
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    #[serde(default = "default_timebase_hours")]
    pub timebase_hours: f64,

    /// How long after posting a comment its author may still edit it
    #[serde(default = "default_edit_window_minutes")]
    pub edit_window_minutes: i64,

    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Total number of tries for a vote write that keeps conflicting
    #[serde(default = "default_vote_attempts")]
    pub vote_attempts: u32,

    /// Replies nested deeper than this are shown flat at this depth
    #[serde(default = "default_max_display_depth")]
    pub max_display_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            gravity: default_gravity(),
            timebase_hours: default_timebase_hours(),
            edit_window_minutes: default_edit_window_minutes(),
            page_size: default_page_size(),
            vote_attempts: default_vote_attempts(),
            max_display_depth: default_max_display_depth(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<EngineConfig> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: EngineConfig = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("validating config file {:?}", path))?;
        Ok(config)
    }

    /// Applies the `THREADLINE_*` environment variables on top of `self`
    pub fn with_env(self) -> anyhow::Result<EngineConfig> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<EngineConfig> {
        fn apply<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            var: &str,
            field: &mut T,
        ) -> anyhow::Result<()>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            if let Some(v) = lookup(var) {
                *field = v
                    .trim()
                    .parse()
                    .with_context(|| format!("parsing {var}={v:?}"))?;
            }
            Ok(())
        }
        apply(&lookup, "THREADLINE_GRAVITY", &mut self.gravity)?;
        apply(&lookup, "THREADLINE_TIMEBASE_HOURS", &mut self.timebase_hours)?;
        apply(
            &lookup,
            "THREADLINE_EDIT_WINDOW_MINUTES",
            &mut self.edit_window_minutes,
        )?;
        apply(&lookup, "THREADLINE_PAGE_SIZE", &mut self.page_size)?;
        apply(&lookup, "THREADLINE_VOTE_ATTEMPTS", &mut self.vote_attempts)?;
        apply(
            &lookup,
            "THREADLINE_MAX_DISPLAY_DEPTH",
            &mut self.max_display_depth,
        )?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.gravity.is_finite() && self.gravity > 0.) {
            return Err(Error::InvalidInput(format!(
                "gravity must be a positive number, got {}",
                self.gravity
            )));
        }
        if !(self.timebase_hours.is_finite() && self.timebase_hours > 0.) {
            return Err(Error::InvalidInput(format!(
                "timebase must be a positive number of hours, got {}",
                self.timebase_hours
            )));
        }
        if self.edit_window_minutes < 0 {
            return Err(Error::InvalidInput(format!(
                "edit window must not be negative, got {}",
                self.edit_window_minutes
            )));
        }
        if chrono::Duration::try_minutes(self.edit_window_minutes).is_none() {
            return Err(Error::InvalidInput(format!(
                "edit window of {} minutes is too long",
                self.edit_window_minutes
            )));
        }
        if self.page_size <= 0 {
            return Err(Error::InvalidInput(format!(
                "page size must be positive, got {}",
                self.page_size
            )));
        }
        if self.vote_attempts == 0 {
            return Err(Error::InvalidInput(String::from(
                "at least one vote attempt is required",
            )));
        }
        Ok(())
    }

    pub fn rank_params(&self) -> RankParams {
        RankParams {
            gravity: self.gravity,
            timebase_hours: self.timebase_hours,
        }
    }

    /// Windows too long to represent saturate, leaving edits always open
    pub fn edit_window(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.edit_window_minutes)
            .unwrap_or_else(chrono::Duration::max_value)
    }
}
