//! Page context classification.
//!
//! A page is classified from its location (and, as a fallback, its heading)
//! by a fixed, ordered rule list. The resulting [`PageKind`] decides which
//! dropdown overlays are active on top of the base field set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("unknown page kind '{0}'")]
pub struct UnknownPageKind(pub String);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    AutoPolicy,
    AutoDriver,
    AutoVehicle,
    AutoCoverage,
    AutoIncident,
    HomeDwelling,
    HomeCoverage,
    LeadInfo,
    Applicant,
    Generic,
    Unknown,
}

impl PageKind {
    pub const ALL: [PageKind; 11] = [
        PageKind::AutoPolicy,
        PageKind::AutoDriver,
        PageKind::AutoVehicle,
        PageKind::AutoCoverage,
        PageKind::AutoIncident,
        PageKind::HomeDwelling,
        PageKind::HomeCoverage,
        PageKind::LeadInfo,
        PageKind::Applicant,
        PageKind::Generic,
        PageKind::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PageKind::AutoPolicy => "auto-policy",
            PageKind::AutoDriver => "auto-driver",
            PageKind::AutoVehicle => "auto-vehicle",
            PageKind::AutoCoverage => "auto-coverage",
            PageKind::AutoIncident => "auto-incident",
            PageKind::HomeDwelling => "home-dwelling",
            PageKind::HomeCoverage => "home-coverage",
            PageKind::LeadInfo => "lead-info",
            PageKind::Applicant => "applicant",
            PageKind::Generic => "generic",
            PageKind::Unknown => "unknown",
        }
    }

    /// Overlays layered on the base field set for this kind.
    pub fn overlays(&self) -> &'static [Overlay] {
        match self {
            PageKind::AutoPolicy
            | PageKind::AutoDriver
            | PageKind::AutoVehicle
            | PageKind::AutoCoverage
            | PageKind::AutoIncident => &[Overlay::Auto],
            PageKind::HomeDwelling | PageKind::HomeCoverage => &[Overlay::Home],
            PageKind::Applicant => &[Overlay::Home, Overlay::Auto],
            PageKind::LeadInfo | PageKind::Generic | PageKind::Unknown => &[],
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageKind {
    type Err = UnknownPageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPageKind(s.to_string()))
    }
}

/// Field-set overlay selected by page context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Auto,
    Home,
}

/// Classified page plus the inputs it was derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    pub kind: PageKind,
    pub location: String,
    pub heading: String,
}

impl PageContext {
    pub fn overlays(&self) -> &'static [Overlay] {
        self.kind.overlays()
    }
}

struct Family {
    markers: &'static [&'static str],
    branches: &'static [(&'static [&'static str], PageKind)],
    fallback: PageKind,
}

const FAMILIES: &[Family] = &[
    Family {
        markers: &["/rating/auto/", "/auto/"],
        branches: &[
            (
                &["incident", "violation", "claim", "accident"],
                PageKind::AutoIncident,
            ),
            (&["driver"], PageKind::AutoDriver),
            (&["vehicle"], PageKind::AutoVehicle),
            (&["coverage"], PageKind::AutoCoverage),
        ],
        fallback: PageKind::AutoPolicy,
    },
    Family {
        markers: &["/rating/home/", "/home/"],
        branches: &[(&["coverage", "endorsement"], PageKind::HomeCoverage)],
        fallback: PageKind::HomeDwelling,
    },
    Family {
        markers: &["/lead-info", "/lead/"],
        branches: &[],
        fallback: PageKind::LeadInfo,
    },
    Family {
        markers: &[
            "applicant",
            "/personal-lines/",
            "/personal/",
            "/account/create",
            "/create/personal",
            "/account/edit",
        ],
        branches: &[],
        fallback: PageKind::Applicant,
    },
];

const HEADING_RULES: &[(&str, PageKind)] = &[("applicant", PageKind::Applicant)];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Ordered rule evaluator; hosts in `generic_hosts` classify as
/// [`PageKind::Generic`] when no specific rule fires.
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    generic_hosts: Vec<String>,
}

impl Classifier {
    pub fn new<I, S>(generic_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            generic_hosts: generic_hosts
                .into_iter()
                .map(|h| h.into().to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, location: &str, heading: &str) -> PageKind {
        let loc = location.to_lowercase();
        for family in FAMILIES {
            if contains_any(&loc, family.markers) {
                let kind = family
                    .branches
                    .iter()
                    .find(|(needles, _)| contains_any(&loc, needles))
                    .map(|(_, kind)| *kind)
                    .unwrap_or(family.fallback);
                return kind;
            }
        }

        let heading = heading.to_lowercase();
        if let Some((_, kind)) = HEADING_RULES
            .iter()
            .find(|(needle, _)| heading.contains(needle))
        {
            return *kind;
        }

        if self.is_generic_host(&loc) {
            return PageKind::Generic;
        }
        PageKind::Unknown
    }

    pub fn context(&self, location: &str, heading: &str) -> PageContext {
        let kind = self.classify(location, heading);
        debug!(page = %kind, location, "classified page");
        PageContext {
            kind,
            location: location.to_string(),
            heading: heading.to_string(),
        }
    }

    fn is_generic_host(&self, loc: &str) -> bool {
        let host = Url::parse(loc)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        self.generic_hosts.iter().any(|generic| match &host {
            Some(host) => host == generic || host.ends_with(&format!(".{generic}")),
            None => loc.contains(generic.as_str()),
        })
    }
}
