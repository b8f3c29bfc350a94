use std::cmp::Ordering;
use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::SejtoError;
use crate::model::{InstanceRecord, RegionDetail};

pub const DEFAULT_SORT_ORDER: &str = "interrupts:asc,savings:desc";

const RECORD_FIELDS: [&str; 5] = ["instance_type", "vcpus", "mem_gb", "savings", "interrupts"];
const REGION_FIELDS: [&str; 2] = ["region", "operating_systems"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

/// Sortable result columns. Interrupts compare the range upper bound, not
/// the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    InstanceType,
    Vcpus,
    MemGb,
    Emr,
    Savings,
    Interrupts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Presentation sort order, applied after filtering with a stable sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    keys: Vec<(SortColumn, SortDirection)>,
}

impl Default for SortOrder {
    fn default() -> Self {
        // DEFAULT_SORT_ORDER is a valid literal.
        Self::parse(DEFAULT_SORT_ORDER).expect("default sort order parses")
    }
}

impl SortOrder {
    /// Parse "columnA:sort_order,columnB:sort_order,...".
    pub fn parse(input: &str) -> Result<Self, SejtoError> {
        let mut keys = Vec::new();
        for chunk in input.split(',') {
            let Some((column, order)) = chunk.split_once(':') else {
                return Err(SejtoError::InvalidConfig(format!(
                    "Input format must be 'column:sort_order', not '{}'",
                    chunk
                )));
            };

            let column = match column.to_lowercase().as_str() {
                "instance_type" => SortColumn::InstanceType,
                "vcpus" => SortColumn::Vcpus,
                "mem_gb" => SortColumn::MemGb,
                "emr" => SortColumn::Emr,
                "savings" => SortColumn::Savings,
                "interrupts" => SortColumn::Interrupts,
                other => {
                    return Err(SejtoError::InvalidConfig(format!(
                        "Column '{}' is invalid. Valid columns are 'instance_type', \
                         'vcpus', 'mem_gb', 'emr', 'savings', 'interrupts'",
                        other
                    )));
                }
            };
            let order = match order.to_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(SejtoError::InvalidConfig(format!(
                        "Sort order '{}' is invalid. Valid values are 'asc', 'desc'",
                        other
                    )));
                }
            };
            keys.push((column, order));
        }

        if keys.is_empty() {
            return Err(SejtoError::InvalidConfig(
                "No sort order at all. That's impossible!".to_string(),
            ));
        }

        Ok(Self { keys })
    }

    pub fn sort(&self, records: &mut [InstanceRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }

    fn compare(&self, a: &InstanceRecord, b: &InstanceRecord) -> Ordering {
        for (column, direction) in &self.keys {
            let ordering = match column {
                SortColumn::InstanceType => a.instance_type.cmp(&b.instance_type),
                SortColumn::Vcpus => a.vcpus.cmp(&b.vcpus),
                SortColumn::MemGb => a.mem_gb.total_cmp(&b.mem_gb),
                SortColumn::Emr => a.emr.cmp(&b.emr),
                SortColumn::Savings => a.savings.cmp(&b.savings),
                SortColumn::Interrupts => a.inter_max.cmp(&b.inter_max),
            };
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

/// What actually gets rendered per record, in field order.
#[derive(Debug, Serialize)]
struct Row<'a> {
    instance_type: &'a str,
    vcpus: u32,
    mem_gb: f64,
    savings: u8,
    interrupts: &'a str,
}

impl<'a> From<&'a InstanceRecord> for Row<'a> {
    fn from(record: &'a InstanceRecord) -> Self {
        Self {
            instance_type: &record.instance_type,
            vcpus: record.vcpus,
            mem_gb: record.mem_gb,
            savings: record.savings,
            interrupts: &record.inter_label,
        }
    }
}

/// Render records in the requested format. Empty input renders the
/// format's empty form: no text lines, header-only CSV, JSON `[]`.
pub fn render(records: &[InstanceRecord], format: OutputFormat) -> Result<String, SejtoError> {
    match format {
        OutputFormat::Text => Ok(render_text(records)),
        OutputFormat::Csv => render_csv(records),
        OutputFormat::Json => render_json(records),
    }
}

fn render_text(records: &[InstanceRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let row = Row::from(record);
        // write! into a String cannot fail.
        let _ = writeln!(
            out,
            "instance_type={} vcpus={} mem_gb={:.1} savings={}% interrupts={}",
            row.instance_type, row.vcpus, row.mem_gb, row.savings, row.interrupts
        );
    }
    out
}

fn render_csv(records: &[InstanceRecord]) -> Result<String, SejtoError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RECORD_FIELDS)?;
    for record in records {
        let row = Row::from(record);
        let vcpus = row.vcpus.to_string();
        // One decimal, same as the text format; keeps whole sizes as "2.0".
        let mem_gb = format!("{:.1}", row.mem_gb);
        let savings = row.savings.to_string();
        writer.write_record([
            row.instance_type,
            vcpus.as_str(),
            mem_gb.as_str(),
            savings.as_str(),
            row.interrupts,
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| SejtoError::Render(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| SejtoError::Render(err.to_string()))
}

fn render_json(records: &[InstanceRecord]) -> Result<String, SejtoError> {
    let rows: Vec<Row<'_>> = records.iter().map(Row::from).collect();
    let mut out = serde_json::to_string_pretty(&rows)?;
    out.push('\n');
    Ok(out)
}

/// Render the region listing in the requested format.
pub fn render_regions(
    details: &[RegionDetail],
    format: OutputFormat,
) -> Result<String, SejtoError> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for detail in details {
                let _ = writeln!(
                    out,
                    "region={} operating_systems={}",
                    detail.region,
                    detail.operating_systems.join(",")
                );
            }
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(REGION_FIELDS)?;
            for detail in details {
                let operating_systems = detail.operating_systems.join(",");
                writer.write_record([detail.region.as_str(), operating_systems.as_str()])?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|err| SejtoError::Render(err.to_string()))?;
            String::from_utf8(bytes).map_err(|err| SejtoError::Render(err.to_string()))
        }
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(details)?;
            out.push('\n');
            Ok(out)
        }
    }
}
