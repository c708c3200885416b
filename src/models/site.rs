//! Site identifiers and listing kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A community site with its own adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Dcinside,
    Ppomppu,
    Theqoo,
    Ygosu,
}

impl Site {
    pub const ALL: [Site; 4] = [Site::Dcinside, Site::Ppomppu, Site::Theqoo, Site::Ygosu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Dcinside => "dcinside",
            Site::Ppomppu => "ppomppu",
            Site::Theqoo => "theqoo",
            Site::Ygosu => "ygosu",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Site::ALL
            .into_iter()
            .find(|site| site.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::config(format!("Unknown site '{s}'")))
    }
}

/// Which best-of listing a run ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    RealTime,
    Daily,
}

impl ListingKind {
    /// Collection holding posts of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            ListingKind::RealTime => "Realtime",
            ListingKind::Daily => "Daily",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingKind::RealTime => f.write_str("real-time"),
            ListingKind::Daily => f.write_str("daily"),
        }
    }
}
