use std::collections::HashSet;
use std::fmt;

/// Condition that makes a listening method run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// One method (or router label) finished
    Method(String),
    /// Every named method finished
    And(Vec<String>),
    /// Any named method finished
    Or(Vec<String>),
}

pub fn and_<I, S>(names: I) -> Trigger
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Trigger::And(names.into_iter().map(Into::into).collect())
}

pub fn or_<I, S>(names: I) -> Trigger
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Trigger::Or(names.into_iter().map(Into::into).collect())
}

impl From<&str> for Trigger {
    fn from(name: &str) -> Self {
        Trigger::Method(name.to_string())
    }
}

impl From<String> for Trigger {
    fn from(name: String) -> Self {
        Trigger::Method(name)
    }
}

impl Trigger {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Trigger::Method(name) => vec![name.as_str()],
            Trigger::And(names) | Trigger::Or(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_satisfied(&self, completed: &HashSet<String>) -> bool {
        match self {
            Trigger::Method(name) => completed.contains(name),
            Trigger::And(names) => names.iter().all(|n| completed.contains(n)),
            Trigger::Or(names) => names.iter().any(|n| completed.contains(n)),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Method(name) => write!(f, "{}", name),
            Trigger::And(names) => write!(f, "and_({})", names.join(", ")),
            Trigger::Or(names) => write!(f, "or_({})", names.join(", ")),
        }
    }
}
