mod composition;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use hclforge_core::normalizer;
use hclforge_core::schema::{ResourceKind, SchemaDescriptor};
use hclforge_core::store::{Store, StoreConfig};
use hclforge_core::synthesizer::Synthesizer;

use composition::{CompositionFile, DirectorySource};

#[derive(Parser)]
#[command(name = "hclforge")]
#[command(about = "Generate and compose configuration from provider schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the template synthesized from a schema descriptor
    Template {
        /// Path to a JSON schema descriptor
        schema: PathBuf,

        /// Resource type the schema describes
        #[arg(long = "type")]
        resource_type: String,

        /// Generate a data source template
        #[arg(long)]
        data: bool,
    },
    /// Render a composition against a directory of schemas
    Render {
        /// Path to a JSON composition file
        composition: PathBuf,

        /// Directory of `<type>.json` and `data.<type>.json` descriptors
        #[arg(long)]
        schemas: PathBuf,

        /// Normalize the rendered output
        #[arg(long)]
        normalize: bool,
    },
    /// Compare two configuration files after normalization
    Diff {
        a: PathBuf,
        b: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Template {
            schema,
            resource_type,
            data,
        } => run_template(&schema, &resource_type, data),
        Commands::Render {
            composition,
            schemas,
            normalize,
        } => run_render(&composition, &schemas, normalize),
        Commands::Diff { a, b } => run_diff(&a, &b),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_template(schema: &Path, resource_type: &str, data: bool) -> Result<(), String> {
    let kind = if data {
        ResourceKind::DataSource
    } else {
        ResourceKind::Resource
    };
    println!("{}", synthesize_file(schema, resource_type, kind)?);
    Ok(())
}

fn synthesize_file(schema: &Path, resource_type: &str, kind: ResourceKind) -> Result<String, String> {
    let content = fs::read_to_string(schema)
        .map_err(|e| format!("Failed to read {}: {}", schema.display(), e))?;
    let descriptor = SchemaDescriptor::from_json(&content).map_err(|e| e.to_string())?;
    Synthesizer::default()
        .synthesize(descriptor.extractor(), resource_type, kind)
        .map_err(|e| format!("{}: {}", schema.display(), e))
}

fn run_render(composition: &Path, schemas: &Path, normalize: bool) -> Result<(), String> {
    println!("{}", render_file(composition, schemas, normalize)?);
    Ok(())
}

fn render_file(composition: &Path, schemas: &Path, normalize: bool) -> Result<String, String> {
    let source = DirectorySource::load(schemas)?;
    let file = CompositionFile::load(composition)?;

    let mut store =
        Store::initialize(&source, StoreConfig::default()).map_err(|e| e.to_string())?;
    file.register_templates(&mut store)?;

    let mut builder = store.builder();
    file.apply(&mut builder)?;
    let text = builder.render().map_err(|e| e.to_string())?;

    Ok(if normalize {
        normalizer::normalize(&text)
    } else {
        text
    })
}

fn run_diff(a: &Path, b: &Path) -> Result<(), String> {
    let left = read_normalized(a)?;
    let right = read_normalized(b)?;

    if left == right {
        println!("{}", "No differences.".green());
        return Ok(());
    }

    print_diff(a, b, &left, &right);
    Err("Documents differ".to_string())
}

fn read_normalized(path: &Path) -> Result<String, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    normalizer::validate(&content).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(normalizer::normalize(&content))
}

fn print_diff(a: &Path, b: &Path, left: &str, right: &str) {
    println!(
        "\n{} {} {}:",
        "Diff for".cyan().bold(),
        a.display(),
        b.display()
    );

    let diff = TextDiff::from_lines(left, right);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}
