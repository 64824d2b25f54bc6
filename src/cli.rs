//! CLI argument parsing for the console client.
//!
//! Commands map 1:1 onto remote job types; all the connection plumbing lives
//! in a single `SharedOptions` mixin so every subcommand accepts the same
//! flags and environment variables.
use crate::api::types::ModuleGenerationType;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "aipctl",
    version,
    about = "Drive analysis jobs on an imaging console",
    after_help = "Examples:\n  aipctl analyze --app-name shop\n  aipctl deliver --app-name shop --file shop-sources.zip --auto-create\n  aipctl snapshot --app-name shop --snapshot-name release-42\n  aipctl onboard --app-name shop --file shop-sources.zip\n  aipctl import list\n  aipctl update-settings --app-name shop --new-settings \"FILTER_LOOKUP_TABLES=true\"",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Deliver(DeliverArgs),
    Snapshot(SnapshotArgs),
    Onboard(OnboardArgs),
    DeepAnalyze(DeepAnalyzeArgs),
    PublishImaging(PublishImagingArgs),
    Import(ImportArgs),
    UpdateSettings(UpdateSettingsArgs),
}

impl Command {
    /// Connection options of whichever subcommand was invoked.
    pub fn shared(&self) -> &SharedOptions {
        match self {
            Command::Analyze(args) => &args.shared,
            Command::Deliver(args) => &args.shared,
            Command::Snapshot(args) => &args.shared,
            Command::Onboard(args) => &args.shared,
            Command::DeepAnalyze(args) => &args.shared,
            Command::PublishImaging(args) => &args.shared,
            Command::Import(args) => &args.shared,
            Command::UpdateSettings(args) => &args.shared,
        }
    }
}

/// Connection and pacing flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct SharedOptions {
    /// Root URL of the console, e.g. https://console.example.com
    #[arg(long = "server-url", value_name = "URL", env = "AIPCTL_SERVER_URL")]
    pub server_url: String,

    /// API key used to authenticate against the console
    #[arg(
        long = "api-key",
        value_name = "KEY",
        env = "AIPCTL_API_KEY",
        hide_env_values = true
    )]
    pub api_key: Option<String>,

    /// Username; when set, the key is sent as the Basic-auth password
    #[arg(long, value_name = "NAME", env = "AIPCTL_USERNAME")]
    pub username: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 90)]
    pub timeout: u64,

    /// Seconds to wait between two job status polls
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    pub sleep: u64,

    /// Stream remote job logs while polling
    #[arg(long)]
    pub verbose: bool,
}

/// Run an analysis on an already delivered version.
#[derive(Args, Debug)]
#[command(about = "Analyze a delivered version of an application")]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to analyze
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// Version to analyze; defaults to the latest delivered version
    #[arg(short = 'v', long = "version-name", value_name = "NAME")]
    pub version_name: Option<String>,

    /// Also take a snapshot once the analysis completes
    #[arg(long)]
    pub with_snapshot: bool,

    /// Publish analysis results to the imaging viewer
    #[arg(long)]
    pub process_imaging: bool,

    /// Take the snapshot without publishing it to the dashboards
    #[arg(long, requires = "with_snapshot")]
    pub no_consolidation: bool,

    /// Module generation type (full-content, one-per-au, one-per-techno,
    /// preserve-configured)
    #[arg(long, value_name = "TYPE", value_parser = ModuleGenerationType::parse)]
    pub module_generation_type: Option<ModuleGenerationType>,

    /// Log generated SQL on the analysis node while this job runs
    #[arg(long)]
    pub show_sql: bool,

    /// Profile engine memory on the analysis node while this job runs
    #[arg(long)]
    pub amt_profile: bool,
}

/// Deliver a new version of an application's source code.
#[derive(Args, Debug)]
#[command(about = "Deliver a new source version (add or clone)")]
pub struct DeliverArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to deliver to
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// A local zip or tar.gz archive, or a folder already on the node
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Name of the new version; defaults to a timestamped name
    #[arg(short = 'v', long = "version-name", value_name = "NAME")]
    pub version_name: Option<String>,

    /// Create the application when it does not exist yet
    #[arg(long)]
    pub auto_create: bool,

    /// Deliver as a brand-new configuration instead of cloning the previous
    /// version
    #[arg(long)]
    pub no_clone: bool,

    /// Comma-separated glob patterns excluded from the delivery
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub exclusion_patterns: Vec<String>,

    /// Project exclusion rules forwarded to the delivery configuration
    #[arg(long, value_name = "RULES", value_delimiter = ',')]
    pub exclusion_rules: Vec<String>,

    /// Node to create the application on (with --auto-create)
    #[arg(long, value_name = "NODE")]
    pub node_name: Option<String>,

    /// Domain to attach a newly created application to
    #[arg(long, value_name = "DOMAIN")]
    pub domain_name: Option<String>,
}

/// Take a snapshot of an analyzed version.
#[derive(Args, Debug)]
#[command(about = "Create a snapshot of an analyzed version")]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to snapshot
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// Version to snapshot; defaults to the latest analyzed version
    #[arg(short = 'v', long = "version-name", value_name = "NAME")]
    pub version_name: Option<String>,

    /// Snapshot name; defaults to a UTC timestamp
    #[arg(short = 'S', long = "snapshot-name", value_name = "NAME")]
    pub snapshot_name: Option<String>,
}

/// Onboard an application through the fast-scan workflow.
#[derive(Args, Debug)]
#[command(about = "Onboard or refresh an application with a fast scan")]
pub struct OnboardArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to onboard
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// A local zip or tar.gz archive, or a folder already on the node
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Domain to attach a newly onboarded application to
    #[arg(long, value_name = "DOMAIN")]
    pub domain_name: Option<String>,

    /// Comma-separated glob patterns excluded from the delivery
    #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
    pub exclusion_patterns: Vec<String>,
}

/// Run a deep analysis after a fast scan.
#[derive(Args, Debug)]
#[command(about = "Run a deep analysis on a fast-scanned application")]
pub struct DeepAnalyzeArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to analyze
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// Snapshot name; defaulted when publishing to engineering
    #[arg(short = 'S', long = "snapshot-name", value_name = "NAME")]
    pub snapshot_name: Option<String>,

    /// Publish analysis results to the imaging viewer
    #[arg(long)]
    pub process_imaging: bool,

    /// Publish a snapshot to the engineering dashboard
    #[arg(long)]
    pub publish_to_engineering: bool,

    /// Module generation type (full-content, one-per-au, one-per-techno,
    /// preserve-configured)
    #[arg(long, value_name = "TYPE", value_parser = ModuleGenerationType::parse)]
    pub module_generation_type: Option<ModuleGenerationType>,
}

/// Publish existing analysis data to the imaging viewer.
#[derive(Args, Debug)]
#[command(about = "Publish an application's analysis data to imaging")]
pub struct PublishImagingArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application to publish
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,
}

/// Import applications managed by other nodes.
#[derive(Args, Debug)]
#[command(about = "Import applications from other nodes")]
pub struct ImportArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    #[command(subcommand)]
    pub action: ImportAction,
}

#[derive(Subcommand, Debug)]
pub enum ImportAction {
    /// List the applications available for import
    List,
    /// Trigger the import of selected applications
    Run(ImportRunArgs),
}

#[derive(Args, Debug)]
pub struct ImportRunArgs {
    /// Comma-separated names of the applications to import
    #[arg(long = "app-names", value_name = "NAMES", value_delimiter = ',')]
    pub app_names: Vec<String>,

    /// Import every application available for import
    #[arg(long, conflicts_with = "app_names")]
    pub all: bool,
}

/// Update computation settings of an analyzed application.
#[derive(Args, Debug)]
#[command(about = "Update computation settings")]
pub struct UpdateSettingsArgs {
    #[command(flatten)]
    pub shared: SharedOptions,

    /// Name of the application whose settings change
    #[arg(short = 'n', long = "app-name", value_name = "NAME")]
    pub app_name: String,

    /// Comma-separated setting=value pairs, e.g.
    /// "FILTER_LOOKUP_TABLES=true,DEFAULT_DATA_FUNCTION_TYPE=EIF"
    #[arg(long = "new-settings", value_name = "PAIRS")]
    pub new_settings: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RootArgs {
        RootArgs::try_parse_from(args).expect("parse")
    }

    #[test]
    fn analyze_accepts_shared_and_own_flags() {
        let root = parse(&[
            "aipctl",
            "analyze",
            "--server-url",
            "http://console.local",
            "--api-key",
            "secret",
            "--app-name",
            "shop",
            "--with-snapshot",
            "--sleep",
            "5",
        ]);
        let Command::Analyze(args) = root.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.shared.server_url, "http://console.local");
        assert_eq!(args.shared.sleep, 5);
        assert_eq!(args.app_name, "shop");
        assert!(args.with_snapshot);
        assert!(!args.no_consolidation);
    }

    #[test]
    fn no_consolidation_requires_with_snapshot() {
        let result = RootArgs::try_parse_from([
            "aipctl",
            "analyze",
            "--server-url",
            "http://console.local",
            "--app-name",
            "shop",
            "--no-consolidation",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn deliver_splits_exclusion_patterns() {
        let root = parse(&[
            "aipctl",
            "deliver",
            "--server-url",
            "http://console.local",
            "--app-name",
            "shop",
            "--file",
            "shop.zip",
            "--exclusion-patterns",
            "**/tmp/**,**/*.bak",
        ]);
        let Command::Deliver(args) = root.command else {
            panic!("expected deliver");
        };
        assert_eq!(args.exclusion_patterns, ["**/tmp/**", "**/*.bak"]);
    }

    #[test]
    fn import_run_refuses_names_with_all() {
        let result = RootArgs::try_parse_from([
            "aipctl",
            "import",
            "--server-url",
            "http://console.local",
            "run",
            "--app-names",
            "a,b",
            "--all",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn module_generation_type_parses_flag_form() {
        let root = parse(&[
            "aipctl",
            "deep-analyze",
            "--server-url",
            "http://console.local",
            "--app-name",
            "shop",
            "--module-generation-type",
            "one-per-au",
        ]);
        let Command::DeepAnalyze(args) = root.command else {
            panic!("expected deep-analyze");
        };
        assert_eq!(
            args.module_generation_type,
            Some(ModuleGenerationType::OnePerAu)
        );
    }
}
