use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::CacheState;
use crate::error::SejtoError;
use crate::model::{AdvisorEntry, InstanceRecord, InstanceSpec, InterruptRange, RegionDetail};

pub const DATASET_URL: &str =
    "https://spot-bid-advisor.s3.amazonaws.com/spot-advisor-data.json";
pub const DATASET_FNAME: &str = "spot-advisor-data.json";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const HTTP_USER_AGENT: &str = "aws-spot-advisor-sejto";

/// Decoded AWS Spot Advisor snapshot. Loaded once, read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotAdvisorData {
    #[serde(default)]
    pub global_rate: String,
    pub instance_types: HashMap<String, InstanceSpec>,
    pub ranges: Vec<InterruptRange>,
    /// region -> OS -> instance type -> advisor entry
    pub spot_advisor: HashMap<String, HashMap<String, HashMap<String, AdvisorEntry>>>,
}

impl SpotAdvisorData {
    /// Decode and validate a raw snapshot.
    pub fn from_json(raw: &str) -> Result<Self, SejtoError> {
        let data: Self = serde_json::from_str(raw)
            .map_err(|err| SejtoError::MalformedSnapshot(err.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Interrupt ranges must have contiguous indices starting at 0 and
    /// strictly increasing upper bounds.
    fn validate(&self) -> Result<(), SejtoError> {
        let mut previous_max: Option<u8> = None;
        for (position, range) in self.ranges.iter().enumerate() {
            if range.index != position {
                return Err(SejtoError::MalformedSnapshot(format!(
                    "interrupt range index '{}' at position '{}'",
                    range.index, position
                )));
            }
            if let Some(previous_max) = previous_max {
                if range.max <= previous_max {
                    return Err(SejtoError::MalformedSnapshot(format!(
                        "interrupt range '{}' upper bound '{}' is not greater than '{}'",
                        range.label, range.max, previous_max
                    )));
                }
            }
            previous_max = Some(range.max);
        }

        Ok(())
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.spot_advisor.contains_key(region)
    }

    pub fn has_os(&self, region: &str, os: &str) -> bool {
        self.spot_advisor
            .get(region)
            .map(|entry| entry.contains_key(os))
            .unwrap_or(false)
    }

    /// Regions with their available Operating Systems, sorted by region.
    pub fn region_details(&self) -> Vec<RegionDetail> {
        let mut details: Vec<RegionDetail> = self
            .spot_advisor
            .iter()
            .map(|(region, entries)| {
                let mut operating_systems: Vec<String> = entries.keys().cloned().collect();
                operating_systems.sort();
                RegionDetail {
                    region: region.clone(),
                    operating_systems,
                }
            })
            .collect();
        details.sort_by(|a, b| a.region.cmp(&b.region));
        details
    }

    /// Join advisor entries for (region, OS) with the instance type catalog
    /// and the interrupt range lookup.
    ///
    /// The snapshot is a third-party artifact; entries with dangling
    /// instance-type or range references are skipped, not errors. Records
    /// come back sorted by instance type so downstream stable sorts are
    /// deterministic.
    pub fn select(&self, region: &str, os: &str) -> Result<Vec<InstanceRecord>, SejtoError> {
        let advisor = self
            .spot_advisor
            .get(region)
            .ok_or_else(|| SejtoError::UnknownRegion(region.to_string()))?;
        let entries = advisor.get(os).ok_or_else(|| SejtoError::UnknownOs {
            region: region.to_string(),
            os: os.to_string(),
        })?;

        let mut records = Vec::with_capacity(entries.len());
        for (instance_type, entry) in entries {
            let Some(spec) = self.instance_types.get(instance_type) else {
                debug!(
                    %instance_type,
                    region, os, "instance type missing from catalog, skipping"
                );
                continue;
            };
            // Range indices are validated to match positions.
            let Some(range) = self.ranges.get(entry.r) else {
                debug!(
                    %instance_type,
                    region,
                    os,
                    range = entry.r,
                    "interrupt range missing, skipping"
                );
                continue;
            };

            records.push(InstanceRecord {
                instance_type: instance_type.clone(),
                vcpus: spec.cores,
                mem_gb: spec.ram_gb,
                emr: spec.emr,
                savings: entry.s,
                inter_label: range.label.clone(),
                inter_max: range.max,
            });
        }
        records.sort_by(|a, b| a.instance_type.cmp(&b.instance_type));

        Ok(records)
    }
}

/// Local copy of the snapshot plus the HTTP cache state used for
/// conditional requests.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    pub data_path: PathBuf,
    pub cache: CacheState,
}

impl DatasetStore {
    pub fn new(data_path: PathBuf, cache: CacheState) -> Self {
        Self { data_path, cache }
    }

    /// Fetch the snapshot, preferring the local copy when the remote end
    /// reports no change.
    ///
    /// A checksum mismatch on the local copy drops the caching headers so
    /// fresh data is fetched. On HTTP 304 with a missing local file the
    /// cache state is cleared and the fetch retried once; the retry asks
    /// intermediaries to revalidate so a cached 304 cannot repeat.
    pub async fn update(
        &mut self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<SpotAdvisorData, SejtoError> {
        self.update_inner(client, url, false).await
    }

    async fn update_inner(
        &mut self,
        client: &reqwest::Client,
        url: &str,
        is_retry: bool,
    ) -> Result<SpotAdvisorData, SejtoError> {
        let mut request = client.get(url);
        if is_retry {
            request = request.header(CACHE_CONTROL, "no-cache");
        }
        if self.checksum_matches() {
            if !self.cache.http_etag.is_empty() {
                request = request.header(IF_NONE_MATCH, &self.cache.http_etag);
            }
            if !self.cache.http_last_modified.is_empty() {
                request = request.header(IF_MODIFIED_SINCE, &self.cache.http_last_modified);
            }
        } else {
            debug!(
                path = %self.data_path.display(),
                "dataset checksum mismatch, fetching fresh data"
            );
        }

        debug!(url, "HTTP req GET");
        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, "HTTP rsp");

        match status {
            StatusCode::NOT_MODIFIED => {
                debug!("no change in data, using local copy");
                match fs::read_to_string(&self.data_path) {
                    Ok(raw) => {
                        self.extract_caching_headers(response.headers());
                        SpotAdvisorData::from_json(&raw)
                    }
                    Err(err) if err.kind() == ErrorKind::NotFound && !is_retry => {
                        warn!(
                            path = %self.data_path.display(),
                            "data file missing, fetching fresh data"
                        );
                        self.cache = CacheState::default();
                        Box::pin(self.update_inner(client, url, true)).await
                    }
                    Err(err) => Err(err.into()),
                }
            }
            StatusCode::OK => {
                debug!("change in data detected, overwriting local copy");
                self.extract_caching_headers(response.headers());
                let raw = response.text().await?;
                let data = SpotAdvisorData::from_json(&raw)?;
                fs::write(&self.data_path, &raw)?;
                self.cache.data_checksum = sha256_hex(raw.as_bytes());
                Ok(data)
            }
            other => Err(SejtoError::UnexpectedStatus(other)),
        }
    }

    fn checksum_matches(&self) -> bool {
        if self.cache.data_checksum.is_empty() {
            return false;
        }

        match fs::read(&self.data_path) {
            Ok(bytes) => sha256_hex(&bytes) == self.cache.data_checksum,
            Err(_) => false,
        }
    }

    fn extract_caching_headers(&mut self, headers: &reqwest::header::HeaderMap) {
        self.cache.http_etag = headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.cache.http_last_modified = headers
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
    }
}

/// SHA-256 hash and hex-encode.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        serde_json::json!({
            "global_rate": "<5%",
            "instance_types": {
                "t3.nano": {"emr": false, "cores": 2, "ram_gb": 0.5},
                "m5.xlarge": {"emr": true, "cores": 4, "ram_gb": 16.0},
                "c7g.metal": {"emr": false, "cores": 64, "ram_gb": 128.0}
            },
            "ranges": [
                {"index": 0, "label": "<5%", "dots": 0, "max": 5},
                {"index": 1, "label": "5-10%", "dots": 1, "max": 11},
                {"index": 2, "label": "10-15%", "dots": 2, "max": 16},
                {"index": 3, "label": "15-20%", "dots": 3, "max": 22},
                {"index": 4, "label": ">20%", "dots": 4, "max": 100}
            ],
            "spot_advisor": {
                "us-east-1": {
                    "Linux": {
                        "t3.nano": {"s": 90, "r": 0},
                        "m5.xlarge": {"s": 72, "r": 1},
                        "c7g.metal": {"s": 65, "r": 3},
                        "ghost.large": {"s": 50, "r": 0},
                        "dangling.range": {"s": 50, "r": 9}
                    },
                    "Windows": {
                        "m5.xlarge": {"s": 55, "r": 2}
                    }
                },
                "eu-west-1": {
                    "Linux": {
                        "t3.nano": {"s": 81, "r": 1}
                    }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_from_json() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        assert_eq!(data.global_rate, "<5%");
        assert_eq!(data.instance_types.len(), 3);
        assert_eq!(data.ranges.len(), 5);
        assert_eq!(data.ranges[1].label, "5-10%");
    }

    #[test]
    fn test_from_json_missing_keys() {
        let err = SpotAdvisorData::from_json(r#"{"global_rate": "<5%"}"#).unwrap_err();
        assert!(matches!(err, SejtoError::MalformedSnapshot(_)));

        let err = SpotAdvisorData::from_json("not json at all").unwrap_err();
        assert!(matches!(err, SejtoError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_validate_rejects_non_contiguous_indices() {
        let raw = serde_json::json!({
            "instance_types": {},
            "ranges": [
                {"index": 0, "label": "<5%", "dots": 0, "max": 5},
                {"index": 2, "label": "5-10%", "dots": 1, "max": 11}
            ],
            "spot_advisor": {}
        })
        .to_string();
        let err = SpotAdvisorData::from_json(&raw).unwrap_err();
        assert!(matches!(err, SejtoError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_validate_rejects_non_increasing_bounds() {
        let raw = serde_json::json!({
            "instance_types": {},
            "ranges": [
                {"index": 0, "label": "<5%", "dots": 0, "max": 5},
                {"index": 1, "label": "5-10%", "dots": 1, "max": 5}
            ],
            "spot_advisor": {}
        })
        .to_string();
        let err = SpotAdvisorData::from_json(&raw).unwrap_err();
        assert!(matches!(err, SejtoError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_has_region_and_os() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        assert!(data.has_region("us-east-1"));
        assert!(!data.has_region("mars-north-1"));
        assert!(data.has_os("us-east-1", "Windows"));
        assert!(!data.has_os("eu-west-1", "Windows"));
        assert!(!data.has_os("mars-north-1", "Linux"));
    }

    #[test]
    fn test_region_details_sorted() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        let details = data.region_details();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].region, "eu-west-1");
        assert_eq!(details[0].operating_systems, vec!["Linux"]);
        assert_eq!(details[1].region, "us-east-1");
        assert_eq!(details[1].operating_systems, vec!["Linux", "Windows"]);
    }

    #[test]
    fn test_select_joins_and_skips_dangling() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        let records = data.select("us-east-1", "Linux").unwrap();

        // 'ghost.large' has no catalog entry, 'dangling.range' references a
        // nonexistent range; both are skipped silently.
        let names: Vec<&str> = records
            .iter()
            .map(|record| record.instance_type.as_str())
            .collect();
        assert_eq!(names, vec!["c7g.metal", "m5.xlarge", "t3.nano"]);

        let nano = &records[2];
        assert_eq!(nano.vcpus, 2);
        assert_eq!(nano.mem_gb, 0.5);
        assert!(!nano.emr);
        assert_eq!(nano.savings, 90);
        assert_eq!(nano.inter_label, "<5%");
        assert_eq!(nano.inter_max, 5);
    }

    #[test]
    fn test_select_unknown_region() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        let err = data.select("mars-north-1", "Linux").unwrap_err();
        assert!(matches!(err, SejtoError::UnknownRegion(region) if region == "mars-north-1"));
    }

    #[test]
    fn test_select_unknown_os() {
        let data = SpotAdvisorData::from_json(&sample_json()).unwrap();
        let err = data.select("eu-west-1", "Windows").unwrap_err();
        assert!(matches!(err, SejtoError::UnknownOs { .. }));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
