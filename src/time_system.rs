//! Canadian byo-yomi clock and per-turn time budgeting.
//!
//! A [`TimeSystem`] tracks main (absolute) time followed by byo-yomi periods,
//! each period granting `byo_yomi_time` milliseconds for `byo_yomi_stones`
//! moves. The `timed_out` flag only records that the player has lost on time;
//! what happens to the match is up to whoever owns the clock. All times are in
//! milliseconds.
//!
//! Text form: `<main>+<periods>x<byo_yomi_time>/<stones>`, e.g. `5m+3x30s/1`.

use std::fmt;
use std::str::FromStr;

use crate::constants::{LATENCY_COMPENSATION, N, TIME_ALLOT_FACTOR};

/// Phase of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    MainTime,
    ByoYomi,
    TimedOut,
}

/// How network round-trip latency is subtracted from the thinking budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyCompensation {
    /// Always subtract a fixed amount.
    Fixed(u32),
    /// Subtract the measured round trip, once one has been measured.
    Measured(Option<u32>),
}

impl Default for LatencyCompensation {
    fn default() -> Self {
        LatencyCompensation::Fixed(LATENCY_COMPENSATION)
    }
}

impl LatencyCompensation {
    /// Record a measured round trip. Ignored for fixed compensation.
    ///
    /// For a controller that times its own protocol exchanges; the binaries
    /// here use [`LatencyCompensation::Fixed`].
    pub fn record_round_trip(&mut self, ms: u32) {
        if let LatencyCompensation::Measured(rt) = self {
            *rt = Some(ms);
        }
    }

    pub fn compensation_ms(&self) -> Option<u32> {
        match *self {
            LatencyCompensation::Fixed(ms) => Some(ms),
            LatencyCompensation::Measured(rt) => rt,
        }
    }
}

/// Error returned when parsing the text form of a time system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeSystemParseError {
    #[error("time system too short")]
    TooShort,
    #[error("missing '{0}' separator")]
    MissingSeparator(char),
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
    #[error("invalid count: {0:?}")]
    InvalidCount(String),
    #[error("byo-yomi periods need at least one stone")]
    NoStones,
    #[error("byo-yomi time or stones given without periods")]
    OrphanByoYomi,
}

/// Canadian byo-yomi time system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSystem {
    pub can_timeout: bool,
    pub timed_out: bool,
    pub main_time: u32,
    pub main_time_remaining: u32,
    pub byo_yomi_time: u32,
    pub byo_yomi_time_remaining: u32,
    pub byo_yomi_stones: u32,
    pub byo_yomi_stones_remaining: u32,
    pub byo_yomi_periods: u32,
    pub byo_yomi_periods_remaining: u32,
}

impl TimeSystem {
    /// Complete Canadian byo-yomi time system.
    pub fn canadian(
        main_time: u32,
        byo_yomi_time: u32,
        byo_yomi_stones: u32,
        byo_yomi_periods: u32,
    ) -> Self {
        Self {
            can_timeout: true,
            timed_out: false,
            main_time,
            main_time_remaining: main_time,
            byo_yomi_time,
            byo_yomi_time_remaining: byo_yomi_time,
            byo_yomi_stones,
            byo_yomi_stones_remaining: byo_yomi_stones,
            byo_yomi_periods,
            byo_yomi_periods_remaining: byo_yomi_periods,
        }
    }

    /// Absolute time only.
    pub fn sudden_death(main_time: u32) -> Self {
        Self::canadian(main_time, 0, 0, 0)
    }

    /// Constant time per turn; this system never times out.
    ///
    /// Its text form is that of a one-period, one-stone byo-yomi clock and
    /// parses back as [`TimeSystem::canadian`].
    pub fn per_turn(time_per_turn: u32) -> Self {
        Self {
            can_timeout: false,
            ..Self::canadian(0, time_per_turn, 1, 1)
        }
    }

    pub fn state(&self) -> ClockState {
        if self.timed_out {
            ClockState::TimedOut
        } else if self.main_time_remaining > 0 {
            ClockState::MainTime
        } else {
            ClockState::ByoYomi
        }
    }

    /// Consume `milliseconds` of thinking time for one move.
    ///
    /// A call that starts or ends in byo-yomi consumes exactly one stone, even
    /// for a zero-length move. Once the last period runs out the clock is timed
    /// out and any remaining elapsed time is discarded; further calls do
    /// nothing.
    pub fn advance_clock(&mut self, milliseconds: u32) {
        if !self.can_timeout || self.timed_out {
            return;
        }

        if milliseconds == 0 {
            if self.main_time_remaining == 0 && self.byo_yomi_periods_remaining > 0 {
                self.byo_yomi_stones_remaining = self.byo_yomi_stones_remaining.saturating_sub(1);
                if self.byo_yomi_stones_remaining == 0 {
                    self.byo_yomi_stones_remaining = self.byo_yomi_stones;
                    self.byo_yomi_time_remaining = self.byo_yomi_time;
                }
            }
            return;
        }

        let mut ms = milliseconds;
        let mut consumed_stone = false;

        while ms > 0 {
            if self.main_time_remaining > 0 {
                let elapsed = self.main_time_remaining.min(ms);
                self.main_time_remaining -= elapsed;
                ms -= elapsed;
                continue;
            }

            if self.byo_yomi_periods_remaining == 0 {
                self.timed_out = true;
                log::warn!("clock: main time exhausted without byo-yomi");
                return;
            }

            let elapsed = self.byo_yomi_time_remaining.min(ms);
            self.byo_yomi_time_remaining -= elapsed;
            ms -= elapsed;

            if !consumed_stone {
                self.byo_yomi_stones_remaining = self.byo_yomi_stones_remaining.saturating_sub(1);
                consumed_stone = true;
            }

            if self.byo_yomi_time_remaining == 0 {
                self.byo_yomi_periods_remaining -= 1;
                if self.byo_yomi_periods_remaining == 0 {
                    self.timed_out = true;
                    log::warn!("clock: byo-yomi periods exhausted");
                    return;
                }
                self.byo_yomi_stones_remaining = self.byo_yomi_stones;
                self.byo_yomi_time_remaining = self.byo_yomi_time;
            } else if self.byo_yomi_stones_remaining == 0 {
                // All stones played within the period: start it afresh.
                self.byo_yomi_stones_remaining = self.byo_yomi_stones;
                self.byo_yomi_time_remaining = self.byo_yomi_time;
            }
        }
    }

    /// Restore the clock to its configured values.
    pub fn reset_clock(&mut self) {
        self.timed_out = false;
        self.main_time_remaining = self.main_time;
        self.byo_yomi_time_remaining = self.byo_yomi_time;
        self.byo_yomi_stones_remaining = self.byo_yomi_stones;
        self.byo_yomi_periods_remaining = self.byo_yomi_periods;
    }

    /// Milliseconds to spend on the current turn.
    ///
    /// Main time is shared linearly over an estimate of the turns left; in
    /// byo-yomi the period time is split over the stones still owed, whichever
    /// is larger. The result is scaled by [`TIME_ALLOT_FACTOR`] and reduced by
    /// the latency compensation when it is larger than it.
    pub fn calc_time_to_play(&self, turns_played: u16, latency: &LatencyCompensation) -> u32 {
        let e1 = (N * N) as f64 * 2.0 / 3.0 - turns_played as f64;
        let e2 = N as f64 / 4.0;
        let turns_left = e1.max(e2);
        let mtt = self.main_time_remaining as f64 / turns_left;

        let mut t = if self.byo_yomi_stones_remaining > 0 {
            let byt = self.byo_yomi_time_remaining as f64 / self.byo_yomi_stones_remaining as f64;
            byt.max(mtt)
        } else {
            mtt
        };

        t *= TIME_ALLOT_FACTOR;

        if let Some(delay) = latency.compensation_ms() {
            if t > delay as f64 {
                t -= delay as f64;
            }
        }

        t.max(0.0) as u32
    }
}

fn format_duration(ms: u32) -> String {
    if ms == 0 {
        return "0".into();
    }
    if ms % 1000 != 0 {
        return format!("{ms}ms");
    }
    let secs = ms / 1000;
    if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

fn parse_duration(s: &str) -> Result<u32, TimeSystemParseError> {
    let invalid = || TimeSystemParseError::InvalidDuration(s.to_string());
    let s = s.trim();
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return Err(invalid());
    }
    let value: u32 = s[..digits_end].parse().map_err(|_| invalid())?;
    let scale = match &s[digits_end..] {
        "" | "ms" => 1,
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        _ => return Err(invalid()),
    };
    value.checked_mul(scale).ok_or_else(invalid)
}

fn parse_count(s: &str) -> Result<u32, TimeSystemParseError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeSystemParseError::InvalidCount(s.to_string()));
    }
    s.parse()
        .map_err(|_| TimeSystemParseError::InvalidCount(s.to_string()))
}

impl fmt::Display for TimeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}x{}/{}",
            format_duration(self.main_time),
            self.byo_yomi_periods,
            format_duration(self.byo_yomi_time),
            self.byo_yomi_stones
        )
    }
}

impl FromStr for TimeSystem {
    type Err = TimeSystemParseError;

    /// Parse `<main>+<periods>x<byo_yomi_time>/<stones>`.
    ///
    /// Zero periods describe sudden death; anything else is a Canadian clock.
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let s = src.trim();
        if s.len() < 9 {
            return Err(TimeSystemParseError::TooShort);
        }

        let (main, rest) = s
            .split_once('+')
            .ok_or(TimeSystemParseError::MissingSeparator('+'))?;
        let (periods, rest) = rest
            .split_once('x')
            .ok_or(TimeSystemParseError::MissingSeparator('x'))?;
        let (byo_yomi, stones) = rest
            .split_once('/')
            .ok_or(TimeSystemParseError::MissingSeparator('/'))?;

        let main = parse_duration(main)?;
        let periods = parse_count(periods)?;
        let byo_yomi = parse_duration(byo_yomi)?;
        let stones = parse_count(stones)?;

        if periods == 0 {
            if byo_yomi != 0 || stones != 0 {
                return Err(TimeSystemParseError::OrphanByoYomi);
            }
            return Ok(TimeSystem::sudden_death(main));
        }
        if stones == 0 {
            return Err(TimeSystemParseError::NoStones);
        }
        Ok(TimeSystem::canadian(main, byo_yomi, stones, periods))
    }
}
