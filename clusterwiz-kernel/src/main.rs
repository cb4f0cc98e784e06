/**
 * CLUSTERWIZ KERNEL - Point d'entrée du calcul hors navigateur
 *
 * RÔLE : Charge la config (kernel.yaml), lit la local DB du wizard, calcule les
 * defaults YARN/Tez/Hive et le plan de rolling restart, puis imprime un rapport JSON.
 *
 * ARCHITECTURE : config -> lecture fichiers (tokio) -> clusterwiz-core (pur) -> stdout.
 * UTILITÉ : Rejouer les recommandations du wizard sur une topologie enregistrée.
 */

mod config;
mod report;

use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config().await;
    info!("local DB: {}, variants: {:?}", cfg.local_db.display(), cfg.variants);

    let report = report::build_report(&cfg).await
        .context("Failed to build report")?;

    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize report")?;
    println!("{json}");
    Ok(())
}
