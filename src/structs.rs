use std::ops::AddAssign;
use std::path::PathBuf;

/// One row of the package-to-index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub source: &'static str,
    pub target: &'static str,
}

impl Mapping {
    pub const fn new(source: &'static str, target: &'static str) -> Self {
        Self { source, target }
    }

    /// Target suffix without its leading separator, e.g. `bin` for `/bin`.
    pub fn target_name(&self) -> &'static str {
        self.target.strip_prefix('/').unwrap_or(self.target)
    }
}

impl std::fmt::Display for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// The two roots a run works with, validated as existing directories.
#[derive(Debug, Clone)]
pub struct Roots {
    pub package: PathBuf,
    pub index: PathBuf,
    /// The index argument was missing or unusable and the default was taken.
    pub index_defaulted: bool,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Link {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.target.to_string_lossy(),
            self.source.to_string_lossy()
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: usize,
    pub failed: usize,
}

impl AddAssign for LinkReport {
    fn add_assign(&mut self, rhs: Self) {
        self.linked += rhs.linked;
        self.failed += rhs.failed;
    }
}

#[test]
fn test_target_name() {
    assert_eq!(Mapping::new("/sbin", "/bin").target_name(), "bin");
    assert_eq!(
        Mapping::new("/../Settings", "/../Settings").target_name(),
        "../Settings"
    );
}

#[test]
fn test_report_sum() {
    let mut total = LinkReport::default();
    total += LinkReport { linked: 2, failed: 1 };
    total += LinkReport { linked: 3, failed: 0 };
    assert_eq!(total, LinkReport { linked: 5, failed: 1 });
}
