use crate::dataset::SpotAdvisorData;
use crate::error::SejtoError;
use crate::filters::InstanceFilter;
use crate::output::{self, OutputFormat, SortOrder};

/// Run one query over an already-loaded snapshot: validate the filter,
/// join the tables for (region, OS), filter, sort, render.
///
/// Filter validation happens before any record is scanned; configuration
/// errors never produce partial output.
pub fn run(
    data: &SpotAdvisorData,
    region: &str,
    os: &str,
    filter: &InstanceFilter,
    sort_order: &SortOrder,
    format: OutputFormat,
) -> Result<String, SejtoError> {
    filter.validate()?;

    let records = data.select(region, os)?;
    let mut results = filter.apply(records);
    sort_order.sort(&mut results);

    output::render(&results, format)
}
