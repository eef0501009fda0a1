use super::DataPoint;

/// What a single scheduler tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Logging was disabled; the cache and store were not touched.
    Skipped,
    /// A snapshot was taken and persisted.
    Appended(DataPoint),
    /// A snapshot was taken but the store rejected it. The record is dropped.
    Failed(String),
}

impl TickOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, TickOutcome::Appended(_))
    }

    pub fn data_point(&self) -> Option<&DataPoint> {
        match self {
            TickOutcome::Appended(point) => Some(point),
            _ => None,
        }
    }
}
