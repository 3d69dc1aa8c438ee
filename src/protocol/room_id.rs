use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Identifier of the room collaborating on one file of one project.
///
/// Derived from the pair alone, so every party computes the same id without
/// a lookup. Both components are escaped (`%` as `%25`, `:` as `%3A`) before
/// being joined with `:`, so distinct pairs never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    #[must_use]
    pub fn new(project_id: &str, file_id: &str) -> Self {
        Self(format!("{}:{}", escape(project_id), escape(file_id)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for RoomId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { f.write_str(&self.0) }
}

fn escape(component: &str) -> String { component.replace('%', "%25").replace(':', "%3A") }
