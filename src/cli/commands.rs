use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(
    name = "vulnrepro",
    version,
    long_version = env!("VULNREPRO_LONG_VERSION"),
    about = "Reproduce reported web vulnerabilities in an isolated browser"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Attempt every vulnerability in a feed against the target
    Scan(ScanArgs),
    /// Show how each feed entry would be handled, without touching the target
    Classify(ClassifyArgs),
    /// Stop (and optionally remove) the browser container
    Stop(StopArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Target web application URL
    #[arg(short, long)]
    pub target: String,

    /// Vulnerability feed (YAML or JSON)
    #[arg(short, long)]
    pub feed: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory for verdicts and screenshots
    #[arg(short, long)]
    pub output: Option<String>,

    /// LLM provider: openai, anthropic, openrouter, local
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM model identifier
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API key (or use env vars)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the provider endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Attempts per vulnerability
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds before a single attempt is abandoned
    #[arg(long)]
    pub attempt_timeout: Option<u64>,

    /// Process critical findings first
    #[arg(long)]
    pub prioritize: bool,

    /// Always generate plans, even where a built-in runner exists
    #[arg(long)]
    pub no_runners: bool,

    /// Show the browser window (needs a display in the container)
    #[arg(long)]
    pub headed: bool,

    /// Custom scan identifier
    #[arg(long)]
    pub scan_id: Option<String>,
}

#[derive(Args, Clone)]
pub struct ClassifyArgs {
    /// Vulnerability feed (YAML or JSON)
    pub feed: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat every category without a runner as generated
    #[arg(long)]
    pub no_runners: bool,
}

#[derive(Args, Clone)]
pub struct StopArgs {
    /// YAML configuration file naming the container
    #[arg(short, long)]
    pub config: Option<String>,

    /// Also remove the container
    #[arg(long)]
    pub remove: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
