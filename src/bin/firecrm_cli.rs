use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use firecrm_api::{
    config,
    db::{self, DbPool},
    entities::stock_movement,
    services::{
        codes::{CodeGenerator, CodeScheme, SchemeName},
        inventory_ledger::InventoryLedger,
    },
};
use serde::Serialize;
use strum::VariantNames;

#[derive(Parser)]
#[command(name = "firecrm-cli", about = "Administrative tasks for the FireCRM database")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Show the code the next document of a scheme would receive, without consuming it
    NextCode {
        /// One of: site, quotation (qtn), purchase-order (po), delivery-challan (dc), call
        scheme: String,
    },
    /// Print a product's on-hand quantity and its latest stock movements
    Stock {
        /// Product code
        product_code: String,
        /// Number of movements to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct StockReport {
    code: String,
    name: String,
    on_hand: i32,
    movements: Vec<stock_movement::Model>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load application config")?;
    config::init_tracing(cfg.log_level(), cfg.log_json, cfg.otel_enabled);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&pool)
                .await
                .context("failed to apply migrations")?;
            println!("Migrations applied");
        }
        Commands::NextCode { scheme } => next_code(&pool, &scheme, cli.json).await?,
        Commands::Stock {
            product_code,
            limit,
        } => stock(&pool, &product_code, limit, cli.json).await?,
    }

    db::close_pool(pool).await?;
    Ok(())
}

async fn next_code(pool: &DbPool, name: &str, json: bool) -> Result<()> {
    let scheme = CodeScheme::from_name(name, Utc::now().date_naive()).ok_or_else(|| {
        anyhow!(
            "unknown code scheme '{}', expected one of: {}",
            name,
            SchemeName::VARIANTS.join(", ")
        )
    })?;
    let code = CodeGenerator::peek(pool, scheme)
        .await
        .context("failed to read sequence")?;

    if json {
        print_json(&serde_json::json!({ "scheme": scheme.name().to_string(), "key": scheme.to_string(), "next": code }))?;
    } else {
        println!("{} -> {}", scheme, code);
    }
    Ok(())
}

async fn stock(pool: &DbPool, product_code: &str, limit: usize, json: bool) -> Result<()> {
    use firecrm_api::entities::product::{self, Entity as Product};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    let product = Product::find()
        .filter(product::Column::Code.eq(product_code))
        .one(pool)
        .await
        .context("failed to query products")?
        .ok_or_else(|| anyhow!("product '{}' not found", product_code))?;

    let on_hand = InventoryLedger::on_hand(pool, product.id).await?;
    let mut movements = InventoryLedger::movements(pool, product.id).await?;
    movements.truncate(limit);

    let report = StockReport {
        code: product.code,
        name: product.name,
        on_hand,
        movements,
    };

    if json {
        return print_json(&report);
    }

    println!("{} ({}) on hand: {}", report.code, report.name, report.on_hand);
    for movement in &report.movements {
        println!(
            "- {} {:+} ({} -> {}) {:?} {}",
            movement.created_at.format("%Y-%m-%d %H:%M"),
            movement.quantity_delta,
            movement.previous_quantity,
            movement.new_quantity,
            movement.reference_type,
            movement.reason
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
