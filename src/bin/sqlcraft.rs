//! sqlcraft: inspect dialect profiles and compile sample statements.
//!
//! # Usage
//!
//! ```bash
//! # List built-in and configured dialects
//! sqlcraft dialects
//!
//! # Print a profile as TOML
//! sqlcraft show postgresql
//!
//! # Compile the sample statements for a dialect
//! sqlcraft demo oracle
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlcraft::catalog::default_config_dir;
use sqlcraft::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlcraft")]
#[command(version)]
#[command(about = "Dialect-aware SQL statement compiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlcraft dialects
    sqlcraft types mysql
    sqlcraft check ./dialects/warehouse.toml
    sqlcraft demo postgresql")]
struct Cli {
    /// Directory of *.toml dialect profiles (default: <config dir>/sqlcraft/dialects)
    #[arg(long, env = "SQLCRAFT_DIALECTS")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in and configured dialect profiles
    Dialects,
    /// Print a dialect profile as TOML
    Show {
        dialect: String,
    },
    /// Show the DDL type name of each logical type on a dialect
    Types {
        dialect: String,
    },
    /// Validate a dialect profile file
    Check {
        file: PathBuf,
    },
    /// Compile the sample statements and print SQL and parameters
    Demo {
        dialect: String,
        /// Render bind values inline
        #[arg(long)]
        literal_binds: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SQLCRAFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // A profile file is checked on its own, without the configured directory.
    if let Commands::Check { file } = &cli.command {
        return check_profile(file);
    }
    let catalog = load_catalog(cli)?;
    match &cli.command {
        Commands::Dialects => list_dialects(&catalog),
        Commands::Show { dialect } => show_profile(&catalog, dialect),
        Commands::Types { dialect } => show_types(&catalog, dialect),
        Commands::Demo {
            dialect,
            literal_binds,
        } => run_demo(&catalog, dialect, *literal_binds),
        Commands::Check { file } => check_profile(file),
    }
}

fn load_catalog(cli: &Cli) -> Result<Catalog> {
    let mut catalog = Catalog::builtins();
    if let Some(dir) = cli.config_dir.clone().or_else(default_config_dir) {
        let loaded = catalog
            .load_profiles_dir(&dir)
            .with_context(|| format!("loading dialect profiles from {}", dir.display()))?;
        tracing::info!("loaded {} profile(s) from {}", loaded.len(), dir.display());
    }
    Ok(catalog)
}

fn list_dialects(catalog: &Catalog) -> Result<()> {
    println!("{}", "Dialects".cyan().bold());
    for profile in catalog.profiles() {
        let builtin = DialectProfile::builtin(&profile.name)
            .is_some_and(|b| &b == profile.as_ref());
        let origin = if builtin { "built-in" } else { "configured" };
        println!(
            "  {:<14} {:<9} max identifier {:<5} {}",
            profile.name.green(),
            profile.paramstyle.to_string().yellow(),
            profile.max_identifier_length(),
            origin.dimmed()
        );
    }
    Ok(())
}

fn show_profile(catalog: &Catalog, name: &str) -> Result<()> {
    let profile = catalog.profile(name)?;
    print!("{}", profile.to_toml()?);
    Ok(())
}

fn show_types(catalog: &Catalog, name: &str) -> Result<()> {
    let profile = catalog.profile(name)?;
    let samples = [
        LogicalType::Integer,
        LogicalType::BigInteger,
        LogicalType::SmallInteger,
        LogicalType::numeric(10, 2),
        LogicalType::Float { as_decimal: false },
        LogicalType::string(255),
        LogicalType::String { length: None },
        LogicalType::Text,
        LogicalType::Boolean,
        LogicalType::DateTime { timezone: false },
        LogicalType::DateTime { timezone: true },
        LogicalType::Date,
        LogicalType::Time,
        LogicalType::Binary { length: None },
        LogicalType::Json,
        LogicalType::Uuid,
        LogicalType::enumeration(Some("mood"), &["happy", "sad"]),
        LogicalType::enumeration(None, &["happy", "sad"]),
    ];

    println!("{} {}", "Types for".cyan().bold(), profile.name.green());
    for ty in &samples {
        let rendered = catalog
            .registry()
            .resolve(ty, &profile)
            .and_then(|h| h.sql_name(&profile));
        match rendered {
            Ok(sql) => println!("  {:<28} {}", ty.to_string(), sql.white()),
            Err(e) => println!("  {:<28} {}", ty.to_string(), e.to_string().red()),
        }
    }
    Ok(())
}

fn check_profile(file: &Path) -> Result<()> {
    let profile = DialectProfile::load(file)?;
    println!(
        "{} {} ({}, {} quoting, max identifier {})",
        "✓".green().bold(),
        profile.name.green(),
        profile.paramstyle,
        format!(
            "{}{}",
            profile.preparer.initial_quote, profile.preparer.final_quote
        ),
        profile.max_identifier_length()
    );
    Ok(())
}

fn run_demo(catalog: &Catalog, name: &str, literal_binds: bool) -> Result<()> {
    let profile = catalog.profile(name)?;
    let compiler = catalog.compiler();
    let options = CompileOptions { literal_binds };

    for (title, stmt) in demo_statements()? {
        println!("{} {}", "--".dimmed(), title.cyan().bold());
        match compiler.compile_with(&stmt, &profile, options) {
            Ok(compiled) => print_compiled(&compiled),
            Err(e) => println!("{} {}", "unsupported:".yellow(), e),
        }
        println!();
    }
    Ok(())
}

fn print_compiled(compiled: &CompiledStatement) {
    println!("{}", compiled.sql().white());
    if !compiled.parameters().is_empty() {
        println!("{}", "Parameters:".cyan());
        for (i, p) in compiled.parameters().iter().enumerate() {
            println!(
                "  {:>2}. {:<24} {}",
                i + 1,
                p.name.yellow(),
                p.handler.name().dimmed()
            );
        }
    }
    if !compiled.result_columns().is_empty() {
        let names: Vec<&str> = compiled
            .result_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        println!("{} {}", "Columns:".cyan(), names.join(", "));
    }
}

fn demo_statements() -> CompileResult<Vec<(&'static str, Statement)>> {
    let md = MetaData::builder()
        .table(
            TableDef::new("users")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("email", LogicalType::string(120)).not_null()),
        )
        .table(
            TableDef::new("orders")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("user_id", LogicalType::Integer).references("users.id"))
                .column(ColumnDef::new("total", LogicalType::numeric(10, 2))),
        )
        .table(
            TableDef::new("parts")
                .column(ColumnDef::new("part", LogicalType::string(30)))
                .column(ColumnDef::new("sub_part", LogicalType::string(30)))
                .column(ColumnDef::new("quantity", LogicalType::Integer)),
        )
        .table(
            TableDef::new("some_large_named_table")
                .column(
                    ColumnDef::new("this_is_the_primarykey_column", LogicalType::Integer)
                        .primary_key(),
                )
                .column(ColumnDef::new("this_is_the_data_column", LogicalType::string(30))),
        )
        .build()?;
    let users = md.table("users")?;
    let orders = md.table("orders")?;
    let parts = md.table("parts")?;
    let large = md.table("some_large_named_table")?;

    let joined = select([users.c("email")?, orders.c("total")?])
        .join(&orders)?
        .filter(users.c("id")?.eq(bindparam("user_id").value(7)))
        .order_by(orders.c("total")?.desc())
        .limit(10);

    let seed = select([parts.c("sub_part")?, parts.c("part")?])
        .filter(parts.c("part")?.eq("our part"))
        .cte_recursive("included_parts");
    let pr = seed.alias("pr");
    let p = parts.alias("p");
    let included = seed.union_all(
        select([p.c("sub_part")?, p.c("part")?]).filter(p.c("part")?.eq(pr.c("sub_part")?)),
    )?;
    let recursive = select([included.c("sub_part")?, included.c("part")?]);

    let labelled = select([
        large.c("this_is_the_primarykey_column")?,
        large.c("this_is_the_data_column")?,
    ])
    .label_style(LabelStyle::TablenamePlusCol);

    let in_list = select([users.c("email")?]).filter(users.c("id")?.is_in([1, 2, 3]));

    let locked = select([orders.c("total")?])
        .filter(orders.c("id")?.eq(bindparam("order_id").value(1)))
        .with_for_update(ForUpdate::default().skip_locked());

    let raw = text("SELECT count(*) AS n FROM orders WHERE user_id = :uid")
        .bind("uid", 7)?
        .columns([("n", LogicalType::Integer)]);

    let insert = Insert::new(&orders)
        .value("user_id", 7)?
        .value("total", 19.5)?
        .returning([orders.c("id")?]);

    Ok(vec![
        ("join inferred from foreign key", joined.into()),
        ("recursive common table expression", recursive.into()),
        ("labels truncated to the identifier limit", labelled.into()),
        ("expanding IN", in_list.into()),
        ("row locking", locked.into()),
        ("textual statement", raw.into()),
        ("insert with RETURNING", insert.into()),
        (
            "index on a foreign key",
            CreateIndex::new("ix_orders_user_id", &orders, &["user_id"]).into(),
        ),
    ])
}
