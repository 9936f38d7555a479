use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use mp_rester::config::{find_config_file, get_config, load_config, Config};
use mp_rester::models::{Criteria, Document, Fields, SearchRequest};
use mp_rester::resters::GrainBoundaryFilter;
use mp_rester::utils::{document_table, is_terminal, key_value_table};
use mp_rester::MpRester;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// mp-rester - Query the Materials Project REST API
#[derive(Parser, Debug)]
#[command(name = "mp-rester")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query the Materials Project REST API", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key (overrides configuration and MP_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn use_table(self) -> bool {
        match self {
            OutputFormat::Auto => is_terminal(),
            OutputFormat::Table => true,
            OutputFormat::Json => false,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search a resource
    #[command(alias = "s")]
    Search {
        /// Resource name (see `mp-rester resources`)
        resource: String,

        /// Criteria as field=value, field=a,b or field=min..max
        #[arg(long = "where", short = 'w', value_name = "CRITERION")]
        criteria: Vec<String>,

        /// Fields to return (default: all)
        #[arg(long, short, value_delimiter = ',')]
        fields: Vec<String>,

        /// Sort field, prefix with '-' for descending
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<String>,

        /// Ids per chunk (0 disables chunking)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Only fetch this many chunks
        #[arg(long)]
        num_chunks: Option<usize>,
    },

    /// Get one document by identifier
    Get {
        resource: String,
        id: String,

        /// Fields to return (default: all)
        #[arg(long, short, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Count documents matching criteria
    Count {
        resource: String,

        /// Criteria as field=value, field=a,b or field=min..max
        #[arg(long = "where", short = 'w', value_name = "CRITERION")]
        criteria: Vec<String>,
    },

    /// List the fields of a resource
    Fields { resource: String },

    /// List available resources
    Resources,

    /// Structure of a material
    Structure {
        material_id: String,

        /// Return the initial structures instead of the final one
        #[arg(long)]
        initial: bool,
    },

    /// Computed entries for a chemical system or formula
    Entries {
        /// Chemical system (Fe-O) or formula (Fe2O3)
        chemsys_formula: String,

        /// Sort by energy above hull
        #[arg(long)]
        sort_by_e_above_hull: bool,
    },

    /// Material ids for a chemical system or formula
    MaterialIds { chemsys_formula: String },

    /// Material containing a calculation
    TaskMaterial { task_id: String },

    /// Surface energies of a material
    Surface { material_id: String },

    /// Grain boundary data
    Gb {
        #[arg(long)]
        material_id: Vec<String>,

        #[arg(long)]
        formula: Option<String>,

        #[arg(long)]
        chemsys: Option<String>,

        #[arg(long)]
        sigma: Option<u32>,

        /// Boundary plane, e.g. 1,1,1
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        gb_plane: Option<Vec<i32>>,

        /// Rotation axis, e.g. 1,0,0
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        rotation_axis: Option<Vec<i32>>,
    },

    /// Substrates for a film material
    Substrates {
        material_id: String,

        /// Substrate orientation, e.g. 1,0,0
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        orient: Option<Vec<i32>>,
    },

    /// Database release of the API
    DbVersion,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("mp_rester={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "mp-rester", &mut std::io::stdout());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let rester = MpRester::new(&config).context("failed to create client")?;
    let table = cli.output.use_table();

    let result = run(&rester, cli.command, table).await;
    rester.close();
    result
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            if let Some(path) = find_config_file() {
                tracing::debug!("Using config file {}", path.display());
            }
            get_config().context("failed to load configuration")?
        }
    };

    if let Some(api_key) = &cli.api_key {
        config.api.api_key = Some(api_key.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.api.endpoint = endpoint.clone();
    }
    Ok(config)
}

async fn run(rester: &MpRester, command: Commands, table: bool) -> Result<()> {
    match command {
        Commands::Search {
            resource,
            criteria,
            fields,
            sort,
            chunk_size,
            num_chunks,
        } => {
            let mut request =
                SearchRequest::new(parse_criteria(&criteria)?).projection(projection(&fields));
            if let Some(sort) = sort {
                request = match sort.strip_prefix('-') {
                    Some(field) => request.sort_by(field, false),
                    None => request.sort_by(sort, true),
                };
            }
            request.chunk_size = chunk_size;
            request.num_chunks = num_chunks;

            let docs = rester.query(&resource, &request).await?;
            tracing::info!("Retrieved {} {} documents", docs.len(), resource);
            print_documents(&docs, &fields, table)
        }

        Commands::Get {
            resource,
            id,
            fields,
        } => {
            let doc = rester
                .rester(&resource)?
                .get_by_id(&id, &projection(&fields))
                .await?;
            if table {
                println!("{}", key_value_table(doc.as_map()));
                Ok(())
            } else {
                print_json(&doc.into_value())
            }
        }

        Commands::Count { resource, criteria } => {
            let total = rester
                .rester(&resource)?
                .count(&parse_criteria(&criteria)?)
                .await?;
            println!("{}", total);
            Ok(())
        }

        Commands::Fields { resource } => {
            let fields = rester.rester(&resource)?.available_fields();
            if table {
                fields.iter().for_each(|field| println!("{}", field));
                Ok(())
            } else {
                print_json(&fields)
            }
        }

        Commands::Resources => {
            let rows: Vec<serde_json::Value> = rester
                .registry()
                .all()
                .map(|r| {
                    serde_json::json!({
                        "name": r.name(),
                        "suffix": r.suffix(),
                        "search": r.supports_search(),
                        "get_by_id": r.supports_get_by_id(),
                    })
                })
                .collect();
            print_records("resources", &rows, table)
        }

        Commands::Structure {
            material_id,
            initial,
        } => {
            let structures = rester
                .get_structure_by_material_id(&material_id, !initial, false)
                .await?;
            print_json(&structures)
        }

        Commands::Entries {
            chemsys_formula,
            sort_by_e_above_hull,
        } => {
            let entries = rester
                .get_entries(&chemsys_formula, sort_by_e_above_hull)
                .await?;
            print_records("entries", &entries, table)
        }

        Commands::MaterialIds { chemsys_formula } => {
            let ids = rester.get_materials_ids(&chemsys_formula).await?;
            if table {
                ids.iter().for_each(|id| println!("{}", id));
                Ok(())
            } else {
                print_json(&ids)
            }
        }

        Commands::TaskMaterial { task_id } => {
            match rester.get_materials_id_from_task_id(&task_id).await? {
                Some(material_id) => println!("{}", material_id),
                None => return Err(anyhow!("no material contains task {}", task_id)),
            }
            Ok(())
        }

        Commands::Surface { material_id } => {
            let doc = rester.get_surface_data(&material_id).await?;
            if table {
                print_records("surfaces", &doc.surfaces, true)
            } else {
                print_json(&doc)
            }
        }

        Commands::Gb {
            material_id,
            formula,
            chemsys,
            sigma,
            gb_plane,
            rotation_axis,
        } => {
            let filter = GrainBoundaryFilter {
                material_ids: material_id,
                pretty_formula: formula,
                chemsys,
                sigma,
                gb_plane,
                rotation_axis,
            };
            let docs = rester.get_gb_data(&filter).await?;
            print_records("grain_boundary", &docs, table)
        }

        Commands::Substrates {
            material_id,
            orient,
        } => {
            let docs = rester
                .get_substrates(&material_id, orient.as_deref())
                .await?;
            print_records("substrates", &docs, table)
        }

        Commands::DbVersion => {
            println!("{}", rester.get_database_version().await?);
            Ok(())
        }

        Commands::Completions { .. } => Ok(()),
    }
}

fn projection(fields: &[String]) -> Fields {
    if fields.is_empty() {
        Fields::All
    } else {
        Fields::only(fields.iter().cloned())
    }
}

/// Parse `field=value`, `field=a,b` and `field=min..max` (either bound may be
/// omitted) into criteria
fn parse_criteria(raw: &[String]) -> Result<Criteria> {
    let mut criteria = Criteria::new();

    for criterion in raw {
        let (field, value) = criterion
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid criterion '{}', expected field=value", criterion))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(anyhow!("invalid criterion '{}': empty field", criterion));
        }

        criteria = if let Some((min, max)) = value.split_once("..") {
            let min = parse_bound(min).with_context(|| format!("invalid minimum in '{}'", criterion))?;
            let max = parse_bound(max).with_context(|| format!("invalid maximum in '{}'", criterion))?;
            if min.is_none() && max.is_none() {
                return Err(anyhow!("range '{}' has no bounds", criterion));
            }
            criteria.range(field, min, max)
        } else if value.contains(',') {
            criteria.one_of(field, value.split(',').map(str::trim).filter(|v| !v.is_empty()))
        } else {
            criteria.equals(field, value.trim())
        };
    }

    Ok(criteria)
}

fn parse_bound(bound: &str) -> Result<Option<f64>> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Ok(None);
    }
    Ok(Some(bound.parse::<f64>()?))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_documents(docs: &[Document], fields: &[String], table: bool) -> Result<()> {
    if table {
        let columns = (!fields.is_empty()).then_some(fields);
        println!("{}", document_table(docs, columns));
        Ok(())
    } else {
        let values: Vec<&serde_json::Map<String, serde_json::Value>> =
            docs.iter().map(Document::as_map).collect();
        print_json(&values)
    }
}

/// Print typed records, as a table by way of their JSON form
fn print_records<T: Serialize>(resource: &str, records: &[T], table: bool) -> Result<()> {
    if !table {
        return print_json(records);
    }

    let docs = records
        .iter()
        .map(|record| Ok(Document::from_value(resource, serde_json::to_value(record)?)))
        .collect::<Result<Vec<_>>>()?;
    println!("{}", document_table(&docs, None));
    Ok(())
}
