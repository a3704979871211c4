//! Go release identifiers and their total order.
//!
//! Identifiers follow `go1.<minor>[.<patch> | rc<n> | beta<n>]`, plus the
//! rolling `gotip` channel. Each parsed [`Version`] carries a numeric key,
//! `num = minor * 10_000 + offset`, where the offset ranks channels inside a
//! minor line:
//!
//! ```text
//! beta1..beta99     ->    1 ..   99
//! rc1..rc899        ->  101 ..  999
//! official release  -> 1000
//! .0 .. .8999       -> 1000 .. 9999
//! ```
//!
//! Counters outside those ranges are rejected so that a line never spills
//! into the numeric range of the next one.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::errors::{GovmError, GovmResult};

/// Name of the rolling development channel.
pub const TIP: &str = "gotip";

/// Sort key assigned to [`TIP`]. Larger than any computable release key.
pub const TIP_NUM: u64 = u64::MAX;

const PREFIX: &str = "go1.";
const LINE_WIDTH: u64 = 10_000;
const RELEASE_OFFSET: u64 = 1_000;
const RC_OFFSET: u64 = 100;
const MAX_BETA: u64 = 99;
const MAX_RC: u64 = RELEASE_OFFSET - RC_OFFSET - 1;
const MAX_PATCH: u64 = LINE_WIDTH - RELEASE_OFFSET - 1;

/// Lines from this minor onward publish their first release as `go1.N.0`.
const EXPLICIT_ZERO_PATCH_SINCE: u64 = 21;

/// Maturity channel of a release inside its minor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "n")]
pub enum Channel {
    /// `go1.Nbeta<k>`
    Beta(u64),
    /// `go1.Nrc<k>`
    Rc(u64),
    /// `go1.N`
    Release,
    /// `go1.N.<k>`
    Patch(u64),
    /// `gotip`
    Tip,
}

impl Channel {
    fn offset(self) -> u64 {
        match self {
            Self::Beta(n) => n,
            Self::Rc(n) => RC_OFFSET + n,
            Self::Release => RELEASE_OFFSET,
            Self::Patch(n) => RELEASE_OFFSET + n,
            Self::Tip => 0,
        }
    }
}

/// A parsed release identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Version {
    /// Exact textual identifier, e.g. `go1.21.3`.
    pub raw: String,
    /// Minor line identifier, e.g. `go1.21`.
    pub normalized: String,
    /// Total order key.
    pub num: u64,
    /// Maturity channel.
    pub channel: Channel,
    #[serde(skip)]
    minor: u64,
}

impl Version {
    /// Parses a release identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::Parse`] if `raw` does not match the grammar or a
    /// counter is out of range.
    pub fn parse(raw: &str) -> GovmResult<Self> {
        if raw == TIP {
            return Ok(Self::tip());
        }

        let rest = raw
            .strip_prefix(PREFIX)
            .ok_or_else(|| GovmError::parse(raw, "expected a go1.<minor> prefix"))?;

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(GovmError::parse(raw, "missing minor version number"));
        }
        let (minor_str, suffix) = rest.split_at(digits);
        let minor = parse_counter(raw, minor_str)?;

        let channel = if suffix.is_empty() {
            Channel::Release
        } else if let Some(n) = suffix.strip_prefix('.') {
            Channel::Patch(parse_bounded(raw, n, 0, MAX_PATCH, "patch")?)
        } else if let Some(n) = suffix.strip_prefix("rc") {
            Channel::Rc(parse_bounded(raw, n, 1, MAX_RC, "rc")?)
        } else if let Some(n) = suffix.strip_prefix("beta") {
            Channel::Beta(parse_bounded(raw, n, 1, MAX_BETA, "beta")?)
        } else {
            return Err(GovmError::parse(raw, format!("unknown suffix {suffix:?}")));
        };

        let num = minor
            .checked_mul(LINE_WIDTH)
            .and_then(|base| base.checked_add(channel.offset()))
            .ok_or_else(|| GovmError::parse(raw, "minor version out of range"))?;

        Ok(Self {
            raw: raw.to_string(),
            normalized: format!("{PREFIX}{minor_str}"),
            num,
            channel,
            minor,
        })
    }

    /// The rolling development channel.
    #[must_use]
    pub fn tip() -> Self {
        Self {
            raw: TIP.to_string(),
            normalized: TIP.to_string(),
            num: TIP_NUM,
            channel: Channel::Tip,
            minor: 0,
        }
    }

    /// Whether this is the `gotip` channel.
    #[must_use]
    pub fn is_tip(&self) -> bool {
        self.channel == Channel::Tip
    }

    /// Whether this is an official release (neither beta, rc nor tip).
    #[must_use]
    pub fn is_official(&self) -> bool {
        matches!(self.channel, Channel::Release | Channel::Patch(_))
    }

    /// The minor line number, `21` for `go1.21.3`. Zero for tip.
    #[must_use]
    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Name used for on-disk directories and binaries.
    ///
    /// The first release of a line is published as `go1.N` but installs as
    /// `go1.N.0`; every other identifier is returned unchanged.
    #[must_use]
    pub fn raw_formatted(&self) -> String {
        if self.raw == self.normalized && self.channel == Channel::Release {
            format!("{}.0", self.raw)
        } else {
            self.raw.clone()
        }
    }

    /// Name used by upstream release archives.
    ///
    /// Lines before go1.21 publish their first release without the `.0`.
    #[must_use]
    pub fn archive_stem(&self) -> String {
        if self.channel == Channel::Release && self.minor < EXPLICIT_ZERO_PATCH_SINCE {
            self.raw.clone()
        } else {
            self.raw_formatted()
        }
    }

    /// Whether `id` names this release, treating `go1.N.0` and `go1.N` as equal.
    #[must_use]
    pub fn matches_id(&self, id: &str) -> bool {
        self.raw == id || self.raw_formatted() == id
    }

    /// Returns the canonical form of an explicit `.0` patch (`go1.N.0` -> `go1.N`).
    #[must_use]
    pub fn canonical(self) -> Self {
        match self.channel {
            Channel::Patch(0) => Self {
                raw: self.normalized.clone(),
                channel: Channel::Release,
                ..self
            },
            _ => self,
        }
    }
}

fn parse_counter(raw: &str, digits: &str) -> GovmResult<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GovmError::parse(raw, format!("expected a number, got {digits:?}")));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(GovmError::parse(raw, format!("leading zero in {digits:?}")));
    }
    digits
        .parse::<u64>()
        .map_err(|e| GovmError::parse(raw, e.to_string()))
}

fn parse_bounded(raw: &str, digits: &str, min: u64, max: u64, what: &str) -> GovmResult<u64> {
    let n = parse_counter(raw, digits)?;
    if (min..=max).contains(&n) {
        Ok(n)
    } else {
        Err(GovmError::parse(
            raw,
            format!("{what} number {n} outside {min}..={max}"),
        ))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num
            .cmp(&other.num)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::str::FromStr for Version {
    type Err = GovmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
