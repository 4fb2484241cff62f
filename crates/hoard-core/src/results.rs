use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::classify::{classify, Classification, Tier};
use crate::record::FileRecord;

/// Records accumulated by the consumer side of a scan. Each path appears at
/// most once.
#[derive(Debug, Default, Clone)]
pub struct ResultSet {
    records: Vec<FileRecord>,
    paths: HashSet<PathBuf>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false, leaving the set unchanged, when the path is already present.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        if !self.paths.insert(record.path().to_path_buf()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes()).sum()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.paths.clear();
    }

    /// Drops records whose file no longer exists. Returns how many were removed.
    pub fn retain_existing(&mut self) -> usize {
        let before = self.records.len();
        let paths = &mut self.paths;
        self.records.retain(|record| {
            let exists = record.path().symlink_metadata().is_ok();
            if !exists {
                paths.remove(record.path());
            }
            exists
        });
        before - self.records.len()
    }

    /// Sorted, filtered and truncated rows for display.
    pub fn view(&self, options: &ViewOptions) -> Vec<ResultRow<'_>> {
        let mut rows: Vec<ResultRow<'_>> = self
            .records
            .iter()
            .map(|record| ResultRow {
                record,
                classification: classify(record.path()),
            })
            .filter(|row| options.tiers.shows(row.classification.tier))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = options.sort.compare(a, b);
            let ordering = match options.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            ordering.then_with(|| a.record.path().cmp(b.record.path()))
        });

        if let Some(top_n) = options.top_n {
            rows.truncate(top_n);
        }
        rows
    }
}

/// One displayed record with its classification.
#[derive(Debug, Clone)]
pub struct ResultRow<'a> {
    pub record: &'a FileRecord,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Status,
    Name,
    Dir,
    #[default]
    Size,
    Created,
}

impl SortKey {
    /// Newly selected size and date columns start largest / newest first.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortKey::Size | SortKey::Created => SortDirection::Descending,
            SortKey::Status | SortKey::Name | SortKey::Dir => SortDirection::Ascending,
        }
    }

    fn compare(&self, a: &ResultRow<'_>, b: &ResultRow<'_>) -> Ordering {
        match self {
            SortKey::Status => a
                .classification
                .tier
                .rank()
                .cmp(&b.classification.tier.rank()),
            SortKey::Name => a
                .record
                .base_name()
                .to_lowercase()
                .cmp(&b.record.base_name().to_lowercase()),
            SortKey::Dir => a
                .record
                .dir_name()
                .to_lowercase()
                .cmp(&b.record.dir_name().to_lowercase()),
            SortKey::Size => a.record.size_bytes().cmp(&b.record.size_bytes()),
            SortKey::Created => a.record.created_at().cmp(&b.record.created_at()),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" | "tier" => Ok(SortKey::Status),
            "name" => Ok(SortKey::Name),
            "dir" | "directory" => Ok(SortKey::Dir),
            "size" => Ok(SortKey::Size),
            "created" | "date" => Ok(SortKey::Created),
            other => Err(format!(
                "unknown sort key '{}' (expected status, name, dir, size or created)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Which tiers are visible. System files are hidden unless asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierFilter {
    pub safe: bool,
    pub caution: bool,
    pub system: bool,
}

impl Default for TierFilter {
    fn default() -> Self {
        Self {
            safe: true,
            caution: true,
            system: false,
        }
    }
}

impl TierFilter {
    pub fn only(tiers: &[Tier]) -> Self {
        Self {
            safe: tiers.contains(&Tier::Safe),
            caution: tiers.contains(&Tier::Caution),
            system: tiers.contains(&Tier::System),
        }
    }

    pub fn shows(&self, tier: Tier) -> bool {
        match tier {
            Tier::Safe => self.safe,
            Tier::Caution => self.caution,
            Tier::System => self.system,
        }
    }

    pub fn toggle(&mut self, tier: Tier) {
        match tier {
            Tier::Safe => self.safe = !self.safe,
            Tier::Caution => self.caution = !self.caution,
            Tier::System => self.system = !self.system,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub sort: SortKey,
    pub direction: SortDirection,
    pub tiers: TierFilter,
    pub top_n: Option<usize>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        let sort = SortKey::default();
        Self {
            sort,
            direction: sort.default_direction(),
            tiers: TierFilter::default(),
            top_n: None,
        }
    }
}

impl ViewOptions {
    /// Selecting the active key flips the direction; selecting another key
    /// switches to it with that key's default direction.
    pub fn select_sort(&mut self, key: SortKey) {
        if self.sort == key {
            self.direction = self.direction.flipped();
        } else {
            self.sort = key;
            self.direction = key.default_direction();
        }
    }
}
