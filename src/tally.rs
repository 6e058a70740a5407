use std::collections::BTreeMap;
use std::fmt;

// Query text -> number of executions within one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTally {
    counts: BTreeMap<String, usize>,
}

impl QueryTally {
    // exact text equality
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts = BTreeMap::new();
        for sql in records {
            *counts.entry(sql.into()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn count(&self, sql: &str) -> usize {
        self.counts.get(sql).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Every query whose count strictly exceeds `threshold`.
    pub fn violations(&self, threshold: i64) -> RepeatViolations {
        let entries = self
            .counts
            .iter()
            .filter(|&(_, &count)| exceeds(count, threshold))
            .map(|(sql, &count)| (sql.clone(), count))
            .collect();
        RepeatViolations { entries }
    }
}

fn exceeds(count: usize, threshold: i64) -> bool {
    i64::try_from(count).map_or(true, |count| count > threshold)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatViolations {
    entries: BTreeMap<String, usize>,
}

impl RepeatViolations {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, sql: &str) -> Option<usize> {
        self.entries.get(sql).copied()
    }
}

// Pretty-printed mapping, one query per line
impl fmt::Display for RepeatViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.entries)
    }
}
