//! Region allow-listing for the `SCAN_REGIONS` setting.

/// Regions the collector is willing to scan.
pub const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-east-1",
    "ca-central-1",
    "sa-east-1",
    "af-south-1",
    "me-south-1",
];

pub fn is_known_region(region: &str) -> bool {
    KNOWN_REGIONS.contains(&region)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Validated regions in the order they were requested. Duplicates are kept.
pub struct RegionSet(Vec<String>);

impl RegionSet {
    /// Parse a comma-separated list, dropping (and logging) unknown regions.
    pub fn parse(raw: &str) -> Self {
        let (valid, invalid): (Vec<&str>, Vec<&str>) = raw
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .partition(|r| is_known_region(r));

        if !invalid.is_empty() {
            tracing::warn!(invalid = %invalid.join(", "), "invalid regions ignored");
        }

        Self(valid.into_iter().map(str::to_owned).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for RegionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}
