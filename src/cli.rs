use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};

use sejto::dataset;
use sejto::filters::InstanceFilter;
use sejto::output::{OutputFormat, DEFAULT_SORT_ORDER};

fn default_data_dir() -> PathBuf {
    std::env::temp_dir().join("aws-spot-advisor-sejto")
}

#[derive(Parser, Debug)]
#[command(
    name = "sejto",
    version,
    about = "Sejto - slightly better filtering of AWS Spot Advisor's data",
    after_help = "NOTE that AWS provides very rough estimate of interruptions."
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["list_regions", "list_instance_series", "list_instance_options", "region"])
))]
pub struct Cli {
    /// List AWS regions and available Operating Systems
    #[arg(long)]
    pub list_regions: bool,

    /// Show supported AWS EC2 instance series
    #[arg(long)]
    pub list_instance_series: bool,

    /// Show supported AWS EC2 instance options
    #[arg(long)]
    pub list_instance_options: bool,

    /// AWS Region
    #[arg(long)]
    pub region: Option<String>,

    /// Operating System
    #[arg(long, value_enum, default_value = "Linux")]
    pub os: Os,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Minimum vCPUs
    #[arg(long, help_heading = "Filters")]
    pub vcpu_min: Option<u32>,

    /// Maximum vCPUs
    #[arg(long, help_heading = "Filters")]
    pub vcpu_max: Option<u32>,

    /// Minimum memory in GB
    #[arg(long, help_heading = "Filters")]
    pub mem_min: Option<f64>,

    /// Maximum memory in GB
    #[arg(long, help_heading = "Filters")]
    pub mem_max: Option<f64>,

    /// Only instances supported by EMR
    #[arg(long, help_heading = "Filters")]
    pub emr_only: bool,

    /// Minimum interruptions in percent
    #[arg(long, help_heading = "Filters")]
    pub inters_min: Option<u8>,

    /// Maximum interruptions in percent
    #[arg(long, help_heading = "Filters")]
    pub inters_max: Option<u8>,

    /// Minimum savings in percent
    #[arg(long, help_heading = "Filters")]
    pub savings_min: Option<u8>,

    /// Maximum savings in percent
    #[arg(long, help_heading = "Filters")]
    pub savings_max: Option<u8>,

    /// Exclude bare metal instances
    #[arg(long, help_heading = "Filters")]
    pub exclude_metal: bool,

    /// Exclude Virtual Machine instances
    #[arg(long, help_heading = "Filters")]
    pub exclude_vm: bool,

    /// ONLY instances of listed series will be included
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub include_instance_series: Vec<String>,

    /// Exclude instances of listed series
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub exclude_instance_series: Vec<String>,

    /// ONLY listed instance generation(s) will be included
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub include_instance_generations: Vec<String>,

    /// Exclude listed instance generation(s)
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub exclude_instance_generations: Vec<String>,

    /// ONLY instances with listed options will be included
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub include_instance_options: Vec<String>,

    /// Exclude instances with listed options
    #[arg(long, value_delimiter = ',', num_args = 1.., help_heading = "Filters")]
    pub exclude_instance_options: Vec<String>,

    /// How to sort results, as 'columnA:sort_order,columnB:sort_order,...'.
    /// Valid columns are instance_type, vcpus, mem_gb, emr, savings,
    /// interrupts; valid sort orders are asc and desc
    #[arg(long, default_value = DEFAULT_SORT_ORDER, help_heading = "Sorting")]
    pub sort_order: String,

    /// Directory where AWS Spot Advisor's data and configuration file will
    /// be stored
    #[arg(long, default_value_os_t = default_data_dir())]
    pub data_dir: PathBuf,

    /// URL of AWS Spot dataset
    #[arg(long, default_value = dataset::DATASET_URL)]
    pub dataset_url: String,

    /// Increase log level verbosity. Can be passed multiple times
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Os {
    #[value(name = "Linux")]
    Linux,
    #[value(name = "Windows")]
    Windows,
}

impl Os {
    /// The OS key as it appears in the snapshot's `spot_advisor` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "Linux",
            Os::Windows => "Windows",
        }
    }
}

impl Cli {
    /// Assemble the filter configuration from the parsed arguments.
    pub fn instance_filter(&self) -> InstanceFilter {
        InstanceFilter {
            vcpu_min: self.vcpu_min,
            vcpu_max: self.vcpu_max,
            mem_min: self.mem_min,
            mem_max: self.mem_max,
            savings_min: self.savings_min,
            savings_max: self.savings_max,
            inters_min: self.inters_min,
            inters_max: self.inters_max,
            emr_only: self.emr_only,
            exclude_metal: self.exclude_metal,
            exclude_vm: self.exclude_vm,
            include_series: to_key_set(&self.include_instance_series),
            exclude_series: to_key_set(&self.exclude_instance_series),
            include_generations: to_key_set(&self.include_instance_generations),
            exclude_generations: to_key_set(&self.exclude_instance_generations),
            include_options: to_key_set(&self.include_instance_options),
            exclude_options: to_key_set(&self.exclude_instance_options),
        }
    }
}

fn to_key_set(values: &[String]) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().map(|value| value.to_lowercase()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_is_required() {
        let result = Cli::try_parse_from(["sejto"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_actions_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["sejto", "--list-regions", "--region", "us-east-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sejto", "--region", "us-east-1"]).unwrap();
        assert_eq!(cli.region.as_deref(), Some("us-east-1"));
        assert_eq!(cli.os, Os::Linux);
        assert_eq!(cli.output_format, OutputFormat::Text);
        assert_eq!(cli.sort_order, DEFAULT_SORT_ORDER);
        assert_eq!(cli.dataset_url, dataset::DATASET_URL);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.instance_filter(), InstanceFilter::default());
    }

    #[test]
    fn test_os_values() {
        let cli = Cli::try_parse_from(["sejto", "--region", "r", "--os", "Windows"]).unwrap();
        assert_eq!(cli.os, Os::Windows);
        assert_eq!(cli.os.as_str(), "Windows");

        // Values are case sensitive, as in the snapshot.
        let result = Cli::try_parse_from(["sejto", "--region", "r", "--os", "linux"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_assembly() {
        let cli = Cli::try_parse_from([
            "sejto",
            "--region",
            "us-east-1",
            "--vcpu-min",
            "2",
            "--mem-max",
            "64",
            "--savings-min",
            "60",
            "--inters-max",
            "15",
            "--emr-only",
            "--exclude-metal",
            "--include-instance-series",
            "C,M",
            "--exclude-instance-options",
            "flex",
        ])
        .unwrap();

        let filter = cli.instance_filter();
        assert_eq!(filter.vcpu_min, Some(2));
        assert_eq!(filter.mem_max, Some(64.0));
        assert_eq!(filter.savings_min, Some(60));
        assert_eq!(filter.inters_max, Some(15));
        assert!(filter.emr_only);
        assert!(filter.exclude_metal);
        assert!(!filter.exclude_vm);
        // Series keys are lowercased.
        let series = filter.include_series.unwrap();
        assert!(series.contains("c"));
        assert!(series.contains("m"));
        let options = filter.exclude_options.unwrap();
        assert!(options.contains("flex"));
    }

    #[test]
    fn test_exclude_metal_and_vm_both_accepted() {
        let cli = Cli::try_parse_from([
            "sejto",
            "--region",
            "us-east-1",
            "--exclude-metal",
            "--exclude-vm",
        ])
        .unwrap();

        let filter = cli.instance_filter();
        assert!(filter.exclude_metal);
        assert!(filter.exclude_vm);
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["sejto", "--list-regions", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }
}
