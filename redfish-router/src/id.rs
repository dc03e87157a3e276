use std::fmt;

/// Identifies one registered route. Assigned in registration order starting
/// at 1; ties between trie branches that both match a URL are broken in
/// favor of the lower id, mirroring the source's "rule registered earlier
/// wins" tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
