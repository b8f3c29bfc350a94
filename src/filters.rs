use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SejtoError;
use crate::model::{self, InstanceRecord};

// e.g. 'c7i-flex' -> series 'c', generation '7', options 'i-flex'
static RE_WITH_GEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<series>[a-z]+)(?P<gen>[0-9]+)(?P<opts>.*)$")
        .expect("hardcoded regex is valid")
});
// e.g. 'u-6tb1' -> series 'u', options '6tb1'
static RE_NO_GEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<series>[a-z]+)-(?P<opts>.+)$").expect("hardcoded regex is valid")
});

/// Instance type identifier disassembled into its tokens, all lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstanceType {
    pub series: String,
    pub generation: String,
    pub options: String,
    pub size: String,
}

/// Disassemble an identifier like "c7gn.2xlarge" into series, generation,
/// options and size. Returns None when the identifier does not follow the
/// expected shape; such instances pass the series/generation/options
/// filters unchecked.
pub fn parse_instance_type(instance_type: &str) -> Option<ParsedInstanceType> {
    let (name, size) = instance_type.split_once('.')?;
    if size.is_empty() {
        return None;
    }

    if let Some(caps) = RE_WITH_GEN.captures(name) {
        return Some(ParsedInstanceType {
            series: caps["series"].to_lowercase(),
            generation: caps["gen"].to_string(),
            options: caps["opts"].to_lowercase(),
            size: size.to_lowercase(),
        });
    }

    let caps = RE_NO_GEN.captures(name)?;
    Some(ParsedInstanceType {
        series: caps["series"].to_lowercase(),
        // High-memory types like 'u-6tb1' carry no generation number.
        generation: "0".to_string(),
        options: caps["opts"].to_lowercase(),
        size: size.to_lowercase(),
    })
}

/// Conjunction of independently optional filters. Absent bound means "no
/// constraint"; a record is kept iff every enabled filter passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceFilter {
    pub vcpu_min: Option<u32>,
    pub vcpu_max: Option<u32>,
    pub mem_min: Option<f64>,
    pub mem_max: Option<f64>,
    pub savings_min: Option<u8>,
    pub savings_max: Option<u8>,
    /// Interrupt bounds compare against the range's upper bound in percent.
    pub inters_min: Option<u8>,
    pub inters_max: Option<u8>,
    pub emr_only: bool,
    pub exclude_metal: bool,
    pub exclude_vm: bool,
    pub include_series: Option<BTreeSet<String>>,
    pub exclude_series: Option<BTreeSet<String>>,
    pub include_generations: Option<BTreeSet<String>>,
    pub exclude_generations: Option<BTreeSet<String>>,
    pub include_options: Option<BTreeSet<String>>,
    pub exclude_options: Option<BTreeSet<String>>,
}

impl InstanceFilter {
    /// Reject contradictory or unknown filter values before any record is
    /// scanned.
    pub fn validate(&self) -> Result<(), SejtoError> {
        check_bounds("vcpu", self.vcpu_min, self.vcpu_max)?;
        check_bounds("mem", self.mem_min, self.mem_max)?;
        check_bounds("savings", self.savings_min, self.savings_max)?;
        check_bounds("inters", self.inters_min, self.inters_max)?;

        for set in [&self.include_series, &self.exclude_series].into_iter().flatten() {
            let unknown: Vec<&str> = set
                .iter()
                .map(String::as_str)
                .filter(|key| !model::is_valid_series(key))
                .collect();
            if !unknown.is_empty() {
                return Err(SejtoError::InvalidConfig(format!(
                    "Unsupported EC2 instance series '{}'",
                    unknown.join(",")
                )));
            }
        }

        for set in [&self.include_options, &self.exclude_options].into_iter().flatten() {
            let unknown: Vec<&str> = set
                .iter()
                .map(String::as_str)
                .filter(|key| !model::is_valid_option(key))
                .collect();
            if !unknown.is_empty() {
                return Err(SejtoError::InvalidConfig(format!(
                    "Unsupported EC2 instance options '{}'",
                    unknown.join(",")
                )));
            }
        }

        for set in [&self.include_generations, &self.exclude_generations]
            .into_iter()
            .flatten()
        {
            let unknown: Vec<&str> = set
                .iter()
                .map(String::as_str)
                .filter(|gen| !gen.parse::<u32>().map(|value| value >= 1).unwrap_or(false))
                .collect();
            if !unknown.is_empty() {
                return Err(SejtoError::InvalidConfig(format!(
                    "Unsupported EC2 instance generations '{}'",
                    unknown.join(",")
                )));
            }
        }

        Ok(())
    }

    /// Pure predicate over a single joined record.
    pub fn matches(&self, record: &InstanceRecord) -> bool {
        if !within(record.vcpus, self.vcpu_min, self.vcpu_max) {
            return false;
        }
        if !within(record.mem_gb, self.mem_min, self.mem_max) {
            return false;
        }
        if !within(record.savings, self.savings_min, self.savings_max) {
            return false;
        }
        if !within(record.inter_max, self.inters_min, self.inters_max) {
            return false;
        }
        if self.emr_only && !record.emr {
            return false;
        }

        let metal = record.is_metal();
        if metal && self.exclude_metal {
            return false;
        }
        if !metal && self.exclude_vm {
            return false;
        }

        self.matches_instance_tokens(&record.instance_type)
    }

    /// Filter a sequence of records, preserving input order.
    pub fn apply(&self, records: Vec<InstanceRecord>) -> Vec<InstanceRecord> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }

    fn matches_instance_tokens(&self, instance_type: &str) -> bool {
        let no_token_filters = self.include_series.is_none()
            && self.exclude_series.is_none()
            && self.include_generations.is_none()
            && self.exclude_generations.is_none()
            && self.include_options.is_none()
            && self.exclude_options.is_none();
        if no_token_filters {
            return true;
        }

        // Identifiers that don't parse are kept rather than dropped.
        let Some(parsed) = parse_instance_type(instance_type) else {
            return true;
        };

        if !keep_token(
            &parsed.series,
            self.include_series.as_ref(),
            self.exclude_series.as_ref(),
        ) {
            return false;
        }
        if !keep_token(
            &parsed.generation,
            self.include_generations.as_ref(),
            self.exclude_generations.as_ref(),
        ) {
            return false;
        }
        keep_options(
            &parsed.options,
            self.include_options.as_ref(),
            self.exclude_options.as_ref(),
        )
    }
}

fn check_bounds<T>(name: &str, min: Option<T>, max: Option<T>) -> Result<(), SejtoError>
where
    T: PartialOrd + std::fmt::Display,
{
    if let (Some(min), Some(max)) = (&min, &max) {
        if min > max {
            return Err(SejtoError::InvalidConfig(format!(
                "{}_min '{}' must not be greater than {}_max '{}'",
                name, min, name, max
            )));
        }
    }

    Ok(())
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }

    true
}

/// Include wins over exclude: with an include set only membership counts
/// and the exclude set is never consulted.
fn keep_token(
    token: &str,
    include: Option<&BTreeSet<String>>,
    exclude: Option<&BTreeSet<String>>,
) -> bool {
    if let Some(include) = include {
        return include.contains(token);
    }
    if let Some(exclude) = exclude {
        if exclude.contains(token) {
            return false;
        }
    }

    true
}

fn keep_options(
    options: &str,
    include: Option<&BTreeSet<String>>,
    exclude: Option<&BTreeSet<String>>,
) -> bool {
    if let Some(include) = include {
        return include.iter().any(|key| option_present(options, key));
    }
    if let Some(exclude) = exclude {
        if exclude.iter().any(|key| option_present(options, key)) {
            return false;
        }
    }

    true
}

/// Check whether a single option letter occurs in the options token.
/// 'e' must not match the 'e' of '-flex' and 'flex' matches only as the
/// whole '-flex' suffix.
fn option_present(options: &str, key: &str) -> bool {
    match key {
        "flex" => options.contains("-flex"),
        "e" => {
            let bytes = options.as_bytes();
            bytes.iter().enumerate().any(|(idx, byte)| {
                *byte == b'e' && bytes.get(idx + 1).copied() != Some(b'x')
            })
        }
        _ => options.contains(key),
    }
}
