//! The tag filter engine.
//!
//! A [`TagExpr`] is normalized into an ordered list of OR-groups, each an
//! AND-set of required tags:
//!
//! ```text
//! "tagA, tagB"                    = tagA or tagB
//! ["tagA", "tagB"]                = tagA or tagB
//! [("tagA", "tagC"), "tagB"]      = (tagA and tagC) or tagB
//! [("tagB", "tagC")]              = tagB and tagC
//! ```

use crate::descriptor::parse_list;
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// The sentinel tag that matches every target, tagged or not.
pub const MATCH_ALL_TAG: &str = "all";

/// An OR-of-AND boolean filter over target tag sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagExpr {
    /// Matches every target unconditionally.
    #[default]
    All,
    /// Matches a target when every tag of at least one group is present.
    Any(Vec<BTreeSet<String>>),
}

impl TagExpr {
    pub fn all() -> Self {
        Self::All
    }

    /// An OR over single tags.
    pub fn any<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::groups(tags.into_iter().map(|t| [t]))
    }

    /// An OR over AND-groups.
    pub fn groups<G, I, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for group in groups {
            let group: BTreeSet<String> = group
                .into_iter()
                .flat_map(|s| parse_list(s.as_ref()).map(str::to_string).collect::<Vec<_>>())
                .collect();
            if group.is_empty() {
                continue;
            }
            if group.contains(MATCH_ALL_TAG) {
                return Self::All;
            }
            if !normalized.contains(&group) {
                normalized.push(group);
            }
        }
        Self::Any(normalized)
    }

    /// Parses `"tagA, tagB"` as an OR of the listed tags; `"all"` yields
    /// the match-all sentinel.
    pub fn parse(text: &str) -> Self {
        Self::any(parse_list(text))
    }

    /// Adds an AND-group as a further OR branch.
    pub fn or<I, S>(self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self {
            Self::All => Self::All,
            Self::Any(mut groups) => match Self::groups([group]) {
                Self::All => Self::All,
                Self::Any(extra) => {
                    for g in extra {
                        if !groups.contains(&g) {
                            groups.push(g);
                        }
                    }
                    Self::Any(groups)
                }
            },
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Evaluates the expression against a target's tags.
    ///
    /// Only the match-all sentinel can match an empty tag set.
    pub fn matches(&self, tags: &HashSet<String>) -> bool {
        match self {
            Self::All => true,
            Self::Any(_) if tags.is_empty() => false,
            Self::Any(groups) => groups
                .iter()
                .any(|group| group.iter().all(|tag| tags.contains(tag))),
        }
    }
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(MATCH_ALL_TAG),
            Self::Any(groups) => {
                let rendered = groups
                    .iter()
                    .map(|g| {
                        if g.len() == 1 {
                            g.iter().join("")
                        } else {
                            format!("({})", g.iter().join(" and "))
                        }
                    })
                    .join(" or ");
                f.write_str(&rendered)
            }
        }
    }
}

impl From<&str> for TagExpr {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TagExpr {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Vec<&str>> for TagExpr {
    fn from(tags: Vec<&str>) -> Self {
        Self::any(tags)
    }
}

impl From<Vec<Vec<&str>>> for TagExpr {
    fn from(groups: Vec<Vec<&str>>) -> Self {
        Self::groups(groups)
    }
}

/// Builds a tag set from tag strings, splitting each on whitespace and commas.
pub fn tag_set<I, S>(tags: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .flat_map(|t| parse_list(t.as_ref()).map(str::to_string).collect::<Vec<_>>())
        .collect()
}
