use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct SourceConfigOpts {
    #[arg(
        long,
        env = "XCOLLECT_SOURCE",
        help = "Directory to collect files from (default: current dir).",
        help_heading = "Source Setup",
        value_name = "PATH"
    )]
    pub source_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xcollect/xcollect.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Source Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Source Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        long,
        help = "Select every file that is not excluded [default].",
        conflicts_with = "include_list",
        help_heading = "File Filters"
    )]
    pub all_text: bool,

    #[arg(
        long,
        help = "Select only files whose extension is in the include list.",
        conflicts_with = "all_text",
        help_heading = "File Filters"
    )]
    pub include_list: bool,

    #[arg(
        short = 'i',
        long = "include",
        value_name = "EXT",
        value_delimiter = ',',
        help = "Extensions to include, without the dot (repeatable or comma separated).",
        help_heading = "File Filters"
    )]
    pub include: Vec<String>,

    #[arg(
        long,
        help = "Start from an empty include list, dropping configured extensions and presets.",
        help_heading = "File Filters"
    )]
    pub clear_includes: bool,

    #[arg(
        long = "preset",
        value_name = "NAME",
        value_delimiter = ',',
        help = "Add a named extension preset to the include list (php, python, xml, javascript, css, yaml, vcl, rust, markdown, web).",
        help_heading = "File Filters"
    )]
    pub presets: Vec<String>,

    #[arg(
        short = 'x',
        long = "exclude",
        value_name = "EXT_OR_NAME",
        value_delimiter = ',',
        help = "Extensions or full file names that are always skipped.",
        help_heading = "File Filters"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long,
        help = "Start from an empty exclude list instead of the configured one.",
        help_heading = "File Filters"
    )]
    pub clear_excludes: bool,

    #[arg(
        long = "skip-dir",
        value_name = "DIR",
        value_delimiter = ',',
        help = "Directory names never descended into (added to the configured list).",
        help_heading = "File Filters"
    )]
    pub skip_dirs: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PromptOpts {
    #[arg(
        short = 'p',
        long,
        value_name = "TEXT",
        help = "Task prompt written at the top of the document.",
        conflicts_with = "prompt_file",
        help_heading = "Prompt"
    )]
    pub prompt: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Read the task prompt from a file.",
        conflicts_with = "prompt",
        help_heading = "Prompt"
    )]
    pub prompt_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collect a source tree's text files into a single context document.",
    long_about = "xcollect walks a directory, selects files by extension and name rules, \nand concatenates their text into one framed document headed by a task prompt.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xcollect collect -o review.txt -p \"Review the parser\"\n  xcollect collect --include-list --preset python,yaml\n  xcollect list -f json\n  xcollect config --save",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence progress output, informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "c",
        about = "Collect the selected files into the output document."
    )]
    Collect(CollectArgs),

    #[command(
        visible_alias = "l",
        about = "List the files a collection would include, without writing anything."
    )]
    List(ListArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    #[clap(flatten)]
    pub source_config: SourceConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub prompt: PromptOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output document path (default: ~/<source-name>_collected.txt).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long = "encoding",
        value_name = "ENCODING",
        value_delimiter = ',',
        help = "Ordered text encodings to try (utf-8, windows-1252, latin-1).",
        help_heading = "Output Control"
    )]
    pub encodings: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ListFormat {
    /// Table with sizes
    #[default]
    Table,
    /// One relative path per line
    Plain,
    /// JSON report for scripting
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[clap(flatten)]
    pub source_config: SourceConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output document path to guard against (default: from config).",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = ListFormat::Table, help = "Listing format.")]
    pub format: ListFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        env = "XCOLLECT_SOURCE",
        help = "Directory whose .xcollect/xcollect.toml is written (default: current dir).",
        value_name = "PATH"
    )]
    pub source_root: Option<PathBuf>,

    #[arg(
        short = 's',
        long,
        help = "Save the default configuration to .xcollect/xcollect.toml."
    )]
    pub save: bool,

    #[arg(long, requires = "save", help = "Overwrite an existing config file.")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(help = "Shell to generate completions for (bash, zsh, fish).", value_name = "SHELL")]
    pub shell: Option<String>,

    #[arg(short = 's', long, help = "Save the script to the shell's standard location.")]
    pub save: bool,
}
