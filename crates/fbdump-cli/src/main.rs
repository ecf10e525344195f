//! fbdump CLI - Firebird table export and SQL dump import.

use clap::{Args, Parser, Subcommand};
use fbdump::{
    run_export, run_import, BlobFormat, Config, DumpError, ExportSummary, ImportSummary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "fbdump")]
#[command(about = "Firebird table export to SQL dumps and bulk dump import")]
#[command(version)]
struct Cli {
    /// Path to an optional YAML profile
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Firebird server host [default: localhost]
    #[arg(long, global = true)]
    host: Option<String>,

    /// Firebird server port [default: 3050]
    #[arg(long, global = true)]
    port: Option<u16>,

    /// User name [default: SYSDBA]
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password [default: masterkey]
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Output JSON result to stdout
    #[arg(long, global = true)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a table as a replayable SQL dump
    Export(ExportArgs),

    /// Replay a SQL dump into a database
    Import(ImportArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Database path or alias on the server
    #[arg(short, long)]
    database: Option<String>,

    /// Table to export
    #[arg(short, long)]
    table: Option<String>,

    /// Table name written into the INSERT statements
    #[arg(long)]
    alias: Option<String>,

    /// Output file [default: dump.sql]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// SQL filter appended to the export query as `WHERE <filter>`
    #[arg(long = "where", value_name = "FILTER")]
    where_clause: Option<String>,

    /// Binary column encoding: hex or base64 [default: hex]
    #[arg(long)]
    blob_format: Option<String>,

    /// Connection charset written to `SET NAMES` [default: NONE]
    #[arg(long)]
    charset: Option<String>,

    /// Decode all text as windows-1252 (recovers mis-encoded data)
    #[arg(long)]
    force_win1252: bool,

    /// Strip control characters and non-breaking spaces from text
    #[arg(long)]
    sanitize_text: bool,

    /// Write CR/LF inside text as \r and \n
    #[arg(long)]
    escape_newlines: bool,

    /// Write COMMIT every N rows, 0 disables [default: 50000]
    #[arg(long)]
    commit_every: Option<u64>,

    /// Log progress every N rows, 0 disables [default: 1000]
    #[arg(long)]
    progress_every: Option<u64>,

    /// Log rows whose values cannot be read and skip them
    #[arg(long)]
    continue_on_error: bool,

    /// Log of skipped rows and recovered values [default: export_errors.log]
    #[arg(long)]
    error_log: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    /// Database path or alias on the server
    #[arg(short, long)]
    database: Option<String>,

    /// SQL dump to replay
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Statements per commit and lines per progress report, 0 disables
    /// [default: 1000]
    #[arg(long)]
    batch_size: Option<u64>,

    /// Log failing statements and keep going
    #[arg(long)]
    continue_on_error: bool,

    /// Failed-statement log [default: import_errors.log]
    #[arg(long)]
    error_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DumpError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(DumpError::Config)?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    apply_connection_overrides(&cli, &mut config);

    match cli.command {
        Commands::Export(args) => {
            apply_export_args(args, &mut config)?;
            let summary = run_export(&config.connection, &config.export).await?;
            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_export_summary(&summary, &config.export.output);
            }
        }

        Commands::Import(args) => {
            apply_import_args(args, &mut config);
            let summary = run_import(&config.connection, &config.import).await?;
            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_import_summary(&summary);
            }
        }
    }

    Ok(())
}

fn apply_connection_overrides(cli: &Cli, config: &mut Config) {
    let conn = &mut config.connection;
    if let Some(host) = &cli.host {
        conn.host = host.clone();
    }
    if let Some(port) = cli.port {
        conn.port = port;
    }
    if let Some(user) = &cli.user {
        conn.user = user.clone();
    }
    if let Some(password) = &cli.password {
        conn.password = password.clone();
    }
}

fn apply_export_args(args: ExportArgs, config: &mut Config) -> Result<(), DumpError> {
    if let Some(database) = args.database {
        config.connection.database = database;
    }
    if let Some(charset) = args.charset {
        config.connection.charset = Some(charset);
    }

    let export = &mut config.export;
    if let Some(table) = args.table {
        export.table = table;
    }
    if args.alias.is_some() {
        export.alias = args.alias;
    }
    if let Some(output) = args.output {
        export.output = output;
    }
    if args.where_clause.is_some() {
        export.where_clause = args.where_clause;
    }
    if let Some(format) = args.blob_format {
        export.format.blob_format = format.parse::<BlobFormat>()?;
    }
    export.format.force_legacy_text |= args.force_win1252;
    export.format.sanitize_text |= args.sanitize_text;
    export.format.escape_newlines |= args.escape_newlines;
    if let Some(n) = args.commit_every {
        export.commit_every = n;
    }
    if let Some(n) = args.progress_every {
        export.progress_every = n;
    }
    export.continue_on_error |= args.continue_on_error;
    if let Some(path) = args.error_log {
        export.error_log = path;
    }
    Ok(())
}

fn apply_import_args(args: ImportArgs, config: &mut Config) {
    if let Some(database) = args.database {
        config.connection.database = database;
    }

    let import = &mut config.import;
    if let Some(input) = args.input {
        import.input = input;
    }
    if let Some(n) = args.batch_size {
        import.batch_size = n;
    }
    import.continue_on_error |= args.continue_on_error;
    if let Some(path) = args.error_log {
        import.error_log = path;
    }
}

fn print_export_summary(summary: &ExportSummary, output: &std::path::Path) {
    println!("\nExport completed!");
    println!("  Table: {} -> {}", summary.table, summary.target_table);
    println!("  Output: {}", output.display());
    println!("  Rows: {}", summary.rows_written);
    if summary.rows_skipped > 0 {
        println!("  Skipped: {}", summary.rows_skipped);
    }
    if summary.values_recovered > 0 {
        println!("  Recovered values: {}", summary.values_recovered);
    }
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!("  Throughput: {} rows/sec", summary.rows_per_second);
    if let Some(path) = &summary.error_log {
        println!("  Error log: {}", path.display());
    }
}

fn print_import_summary(summary: &ImportSummary) {
    println!("\nImport completed!");
    println!("  Charset: {}", summary.charset);
    println!("  Lines read: {}", summary.lines_read);
    println!("  Statements executed: {}", summary.statements_executed);
    if summary.statements_failed > 0 {
        println!("  Statements failed: {}", summary.statements_failed);
    }
    println!("  Commits: {}", summary.commits);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!("  Throughput: {} statements/sec", summary.statements_per_second);
    if let Some(path) = &summary.error_log {
        println!("  Error log: {}", path.display());
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
