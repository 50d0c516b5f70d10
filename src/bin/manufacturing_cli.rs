use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use manufacturing_hub::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db::{self, DbPool},
    forms::{
        BatchIngredientForm, BillOfMaterialsForm, BomLineForm, InputPolicy, ProductionBatchForm,
        ProductionOrderForm,
    },
    handlers::AppServices,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    match cli.command {
        Commands::Migrate => {
            let pool = connect(&cfg).await?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::IssueSession(args) => issue_session(&cfg, args, cli.json)?,
        Commands::Seed(args) => seed(&cfg, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "manufacturing-cli",
    about = "Administrative tasks for the manufacturing hub",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Mint a signed session token bound to a hub
    IssueSession(IssueSessionArgs),
    /// Create demo records for a hub
    Seed(SeedArgs),
}

#[derive(Args)]
struct IssueSessionArgs {
    #[arg(long, value_parser = clap::value_parser!(Uuid), help = "Hub (tenant) identifier")]
    hub: Uuid,
    #[arg(long, help = "User the session belongs to")]
    user: String,
    #[arg(long, help = "Optional role within the hub")]
    role: Option<String>,
}

#[derive(Args)]
struct SeedArgs {
    #[arg(long, value_parser = clap::value_parser!(Uuid), help = "Hub (tenant) identifier")]
    hub: Uuid,
}

async fn connect(cfg: &AppConfig) -> Result<DbPool> {
    db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to the database")
}

fn issue_session(cfg: &AppConfig, args: IssueSessionArgs, json: bool) -> Result<()> {
    let auth = AuthService::new(AuthConfig::from(cfg));
    let token = auth
        .issue_session(args.hub, &args.user, args.role.as_deref())
        .context("failed to issue session token")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "hub_id": args.hub,
                "user": args.user,
                "cookie_name": auth.config().cookie_name,
                "token": token,
            }))?
        );
    } else {
        println!("{}", token);
    }
    Ok(())
}

async fn seed(cfg: &AppConfig, args: SeedArgs, json: bool) -> Result<()> {
    let pool = connect(cfg).await?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    let services = AppServices::new(Arc::new(pool), InputPolicy::strict());
    let hub = args.hub;

    let bom = services
        .bill_of_materials
        .create(
            hub,
            &BillOfMaterialsForm {
                name: "Tomato Sauce".into(),
                code: "BOM-SAUCE".into(),
                output_quantity: "100".into(),
                notes: "Demo recipe".into(),
                is_active: Some("on".into()),
            },
        )
        .await?;
    debug!(bom_id = %bom.id, "seeded bill of materials");

    for (description, quantity, unit) in [
        ("Tomatoes", "80", "kg"),
        ("Olive oil", "5", "l"),
        ("Salt", "1.5", "kg"),
    ] {
        services
            .bom_lines
            .create(
                hub,
                &BomLineForm {
                    bom: bom.id.to_string(),
                    description: description.into(),
                    quantity: quantity.into(),
                    unit: unit.into(),
                },
            )
            .await?;
    }

    let order = services
        .production_orders
        .create(
            hub,
            &ProductionOrderForm {
                order_number: "PO-0001".into(),
                bom: bom.id.to_string(),
                quantity: "100".into(),
                status: "confirmed".into(),
                batch_number: "LOT-0001".into(),
                ..Default::default()
            },
        )
        .await?;

    let batch = services
        .production_batches
        .create_for_order(
            hub,
            order.id,
            &ProductionBatchForm {
                batch_number: "LOT-0001".into(),
                quantity_produced: "100".into(),
                production_date: chrono::Utc::now().date_naive().to_string(),
                ..Default::default()
            },
        )
        .await?;

    services
        .production_batches
        .add_ingredient(
            hub,
            order.id,
            batch.id,
            &BatchIngredientForm {
                description: "Tomatoes".into(),
                supplier_lot: "SUP-TOM-42".into(),
                quantity_used: "80".into(),
                unit: "kg".into(),
            },
        )
        .await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "hub_id": hub,
                "bom_id": bom.id,
                "production_order_id": order.id,
                "batch_id": batch.id,
            }))?
        );
    } else {
        println!(
            "Seeded hub {}: BOM {}, order {}, batch {}",
            hub, bom.id, order.id, batch.id
        );
    }
    Ok(())
}
