//! CLI command definitions, routing, and tracing setup.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use standardsriver_core::{
    DocumentPipeline, IdInput, JsonFileSource, PipelineStats, decode_base_id, decode_value, encode,
    load_index, range_condition,
};
use standardsriver_shared::{AppConfig, ObjectId, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// standardsriver: expand standard codes and handle versioned content ids.
#[derive(Parser)]
#[command(
    name = "standardsriver",
    version,
    about = "Expand standard codes in content documents and encode/decode versioned ids.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.standardsriver/standardsriver.toml).
    #[arg(long = "config", global = true, env = "STANDARDSRIVER_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Normalize ids and expand standards in a JSON Lines document stream.
    Enrich {
        /// Standards export (JSON array or JSON Lines). Overrides `reference.path`.
        #[arg(short, long)]
        standards: Option<PathBuf>,

        /// Input documents, one JSON object per line (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave document identifiers as they are.
        #[arg(long)]
        no_normalize: bool,
    },

    /// Versioned identifier helpers.
    Id {
        #[command(subcommand)]
        action: IdAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Identifier subcommands.
#[derive(Subcommand)]
pub(crate) enum IdAction {
    /// Print `<id>:<version>`.
    Encode {
        /// 24-char hex base id.
        id: String,
        /// Non-negative version.
        version: u64,
    },
    /// Print the base id of a string (`<id>[:<version>]`) or JSON id value.
    Decode {
        input: String,
    },
    /// Print the range condition selecting ids after a cursor.
    Range {
        cursor: String,
    },
    /// Print the base id and its embedded creation time.
    Inspect {
        input: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// free for document output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "standardsriver_cli={level},standardsriver_core={level},standardsriver_shared={level}"
    );

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Enrich {
            standards,
            input,
            output,
            no_normalize,
        } => cmd_enrich(
            config_path,
            standards.as_deref(),
            input.as_deref(),
            output.as_deref(),
            no_normalize,
        ),
        Command::Id { action } => match action {
            IdAction::Encode { id, version } => cmd_id_encode(&id, version),
            IdAction::Decode { input } => cmd_id_decode(&input),
            IdAction::Range { cursor } => cmd_id_range(&cursor),
            IdAction::Inspect { input } => cmd_id_inspect(&input),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_enrich(
    config_path: Option<&Path>,
    standards: Option<&Path>,
    input: Option<&Path>,
    output: Option<&Path>,
    no_normalize: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;

    let standards_path = standards
        .map(Path::to_path_buf)
        .or_else(|| config.reference.path.clone())
        .ok_or_else(|| {
            eyre!("no standards export given: pass --standards or set reference.path in config")
        })?;

    info!(
        collection = %config.reference.collection,
        path = %standards_path.display(),
        "loading standards reference"
    );
    let index = Arc::new(load_index(&JsonFileSource::new(&standards_path))?);

    let normalize_ids = !no_normalize && config.pipeline.normalize_ids;
    let pipeline = DocumentPipeline::from_config(index, &config).with_normalize_ids(normalize_ids);

    let stats = match (input, output) {
        (Some(input), Some(output)) => {
            pipeline.process_lines(open_input(input)?, create_output(output)?)?
        }
        (Some(input), None) => pipeline.process_lines(open_input(input)?, io::stdout().lock())?,
        (None, Some(output)) => {
            pipeline.process_lines(io::stdin().lock(), create_output(output)?)?
        }
        (None, None) => pipeline.process_lines(io::stdin().lock(), io::stdout().lock())?,
    };

    print_summary(&stats);
    Ok(())
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).wrap_err_with(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn print_summary(stats: &PipelineStats) {
    eprintln!();
    eprintln!("  Documents:          {}", stats.documents);
    eprintln!("  Enriched:           {}", stats.documents_enriched);
    eprintln!("  Codes matched:      {}", stats.codes_matched);
    eprintln!("  Codes dropped:      {}", stats.codes_dropped);
    eprintln!("  Ids normalized:     {}", stats.ids_normalized);
    eprintln!("  Ids left unchanged: {}", stats.ids_unchanged);
    eprintln!();
}

fn cmd_id_encode(id: &str, version: u64) -> Result<()> {
    let id: ObjectId = id
        .parse()
        .map_err(|e| eyre!("invalid base id '{id}': {e}"))?;
    println!("{}", encode(&id, version));
    Ok(())
}

/// Decode a CLI argument: JSON objects and JSON strings go through the value
/// decoder, anything else is taken as a raw id string.
fn decode_arg(input: &str) -> Result<ObjectId> {
    let id = match serde_json::from_str::<Value>(input) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => decode_value(&value)?,
        _ => decode_base_id(&IdInput::Text(input))?,
    };
    Ok(id)
}

fn cmd_id_decode(input: &str) -> Result<()> {
    println!("{}", decode_arg(input)?);
    Ok(())
}

fn cmd_id_range(cursor: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&range_condition(cursor))?);
    Ok(())
}

fn cmd_id_inspect(input: &str) -> Result<()> {
    let id = decode_arg(input)?;
    println!("  Id:      {id}");
    println!("  Created: {}", id.timestamp().to_rfc3339());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enrich_flags() {
        let cli = Cli::try_parse_from([
            "standardsriver",
            "-vv",
            "enrich",
            "--standards",
            "ccstandards.jsonl",
            "--no-normalize",
        ])
        .expect("parse");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Enrich {
                standards,
                input,
                no_normalize,
                ..
            } => {
                assert_eq!(standards, Some(PathBuf::from("ccstandards.jsonl")));
                assert_eq!(input, None);
                assert!(no_normalize);
            }
            _ => panic!("expected enrich"),
        }
    }

    #[test]
    fn encode_rejects_negative_version() {
        let result = Cli::try_parse_from([
            "standardsriver",
            "id",
            "encode",
            "530e078118a78ca06c0c1ff7",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn decode_arg_accepts_text_and_json() {
        let expected: ObjectId = "530e078118a78ca06c0c1ff7".parse().unwrap();

        assert_eq!(decode_arg("530e078118a78ca06c0c1ff7:4").unwrap(), expected);
        assert_eq!(
            decode_arg(r#"{"$oid":"530e078118a78ca06c0c1ff7"}"#).unwrap(),
            expected
        );
        assert_eq!(
            decode_arg(r#"{"_id":{"$oid":"530e078118a78ca06c0c1ff7"},"version":1}"#).unwrap(),
            expected
        );
        assert!(decode_arg("12").is_err());
    }
}
