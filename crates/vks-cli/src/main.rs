use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, to_string_pretty};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vks_core::app::{ORDER_PROPERTIES, TrackerBuilder, TrackerConfig};
use vks_core::domain::{
    Order, OrderProperties, OrderStepType, OrderType, StatePayload, StateRecord, TrackedKind,
};
use vks_core::graph::RelationshipTable;

#[derive(Parser, Debug)]
#[command(author, version, about = "vks - order/production tracking persistence core", long_about = None)]
struct Args {
    /// TOML config file (defaults apply when omitted).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered type families and their variant names.
    Families,
    /// Resolve a stored name within a family.
    Lookup { family: String, name: String },
    /// Print the relationship policy table.
    Relationships,
    /// Seed an order in memory and walk it through a few transitions.
    Demo,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .with_context(|| format!("invalid log filter '{}'", config.logging.level))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let tracker = TrackerBuilder::new()
        .config(config)
        .expect_families(&["OrderType", "OrderStepType", "StockItemStepType"])
        .build()
        .context("failed to build tracker")?;

    match args.command {
        Command::Families => {
            let registry = tracker.registry();
            let mut families = serde_json::Map::new();
            for family in registry.families() {
                families.insert(family.to_string(), json!(registry.names(family)?));
            }
            println!("{}", to_string_pretty(&families)?);
        }
        Command::Lookup { family, name } => {
            let resolved = tracker
                .registry()
                .lookup(&family, &name)
                .with_context(|| format!("lookup of '{name}' in '{family}' failed"))?;
            println!("{}", json!({ "family": family, "name": resolved }));
        }
        Command::Relationships => {
            println!("{}", to_string_pretty(&relationships(tracker.relationships()))?);
        }
        Command::Demo => demo(&tracker).await?,
    }
    Ok(())
}

fn relationships(table: &RelationshipTable) -> serde_json::Value {
    let mut rows: Vec<_> = table
        .iter()
        .map(|rel| {
            json!({
                "relationship": rel.name,
                "dependent": rel.dependent.to_string(),
                "referenced": rel.referenced.to_string(),
                "kind": format!("{:?}", rel.kind),
                "policy": format!("{:?}", rel.policy),
            })
        })
        .collect();
    rows.sort_by(|a, b| a["relationship"].as_str().cmp(&b["relationship"].as_str()));
    json!(rows)
}

fn record_json(record: &StateRecord<Order>) -> serde_json::Value {
    json!({
        "id": record.id().to_string(),
        "sequence": record.sequence(),
        "timestamp": record.timestamp().to_rfc3339(),
        "step": record.step().to_string(),
        "note": record.payload().note,
        "actor": record.payload().actor,
    })
}

async fn demo(tracker: &vks_core::Tracker) -> Result<()> {
    let order = tracker.create_order().await?;
    let row = Order::row(order);
    let item = tracker.create_order_item(order).await?;
    info!(%order, %item, "seeded order");

    tracker
        .write_type_column(row, "type", OrderType::Express)
        .await?;
    let props = OrderProperties {
        customer_reference: Some("PO-1042".to_string()),
        priority: 1,
        ..Default::default()
    };
    tracker.write_properties(row, ORDER_PROPERTIES, &props).await?;

    for (step, note) in [
        (OrderStepType::Created, None),
        (OrderStepType::Confirmed, Some("payment received")),
        (OrderStepType::InProduction, None),
    ] {
        let mut payload = StatePayload::new(step).with_actor("demo");
        if let Some(note) = note {
            payload = payload.with_note(note);
        }
        tracker.record(order, payload).await?;
    }

    let current = tracker.current_state(order).await?;
    let history = tracker.history(order).await?;
    let blocked = match tracker.delete_entity(order).await {
        Ok(()) => None,
        Err(e) => Some(json!({ "kind": format!("{:?}", e.kind()), "error": e.to_string() })),
    };
    let stored_type = tracker.read_type_column::<OrderType>(row, "type").await?;
    let read_props: OrderProperties = tracker.read_properties(row, ORDER_PROPERTIES).await?;

    let report = json!({
        "order": order.to_string(),
        "type": stored_type.map(|t| t.to_string()),
        "properties": read_props,
        "current_state": current.as_ref().map(record_json),
        "history": history.iter().map(record_json).collect::<Vec<_>>(),
        "delete_order": blocked,
        "counts": tracker.counts().await?,
    });
    println!("{}", to_string_pretty(&report)?);
    Ok(())
}
