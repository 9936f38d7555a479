//! Basic usage example for the mp-rester library.
//!
//! Reads the API key from `MP_API_KEY`, then looks up a few things about
//! silicon and the iron oxides.
//!
//! ```sh
//! MP_API_KEY=... cargo run --example basic_usage
//! ```

use mp_rester::config::Config;
use mp_rester::models::{Criteria, SearchRequest};
use mp_rester::MpRester;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    if config.api.api_key.is_none() {
        eprintln!("Set MP_API_KEY to run this example");
        return Ok(());
    }

    let rester = MpRester::new(&config)?;

    println!("Database version: {}", rester.get_database_version().await?);
    println!(
        "Available resources: {}\n",
        rester.registry().names().collect::<Vec<_>>().join(", ")
    );

    // Every material in the Fe-O system, sorted by id
    let ids = rester.get_materials_ids("Fe-O").await?;
    println!("Found {} Fe-O materials", ids.len());
    for id in ids.iter().take(5) {
        println!("  {}", id);
    }

    // A generic search with a projection and a range filter
    let request = SearchRequest::new(
        Criteria::new()
            .equals("chemsys", "Fe-O")
            .range("nsites", None, Some(10.0)),
    )
    .fields(["material_id", "formula_pretty", "nsites"])
    .sort_by("nsites", true);

    let docs = rester.query("materials", &request).await?;
    println!("\n{} small Fe-O cells:", docs.len());
    for doc in docs.iter().take(5) {
        println!(
            "  {} {} ({} sites)",
            doc.get_str("material_id").unwrap_or("?"),
            doc.get_str("formula_pretty").unwrap_or("?"),
            doc.get("nsites").map(|v| v.to_string()).unwrap_or_default()
        );
    }

    // Typed records
    let structure = rester
        .get_structure_by_material_id("mp-149", true, false)
        .await?;
    if let Some(structure) = structure.first() {
        println!(
            "\nmp-149: {} sites, volume {:.2} Å³",
            structure.num_sites(),
            structure.lattice.volume()
        );
    }

    let entries = rester.get_entries("Si", true).await?;
    if let Some(entry) = entries.first() {
        println!("Lowest Si entry: {:.4} eV/atom", entry.energy_per_atom());
    }

    rester.close();
    Ok(())
}
