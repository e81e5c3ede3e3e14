//! Import command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_import(config: Config, url: &str, datatype: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    if state.registry.get_service(datatype).is_none() {
        println!("Unknown service type: {datatype}");
        println!("Supported: {}", state.registry.service_codes().join(", "));
        return Ok(());
    }

    println!("Reading capabilities of {url} ...");
    let lookup = match state.geodata_service.import(url, datatype).await {
        Ok(lookup) => lookup,
        Err(e) => {
            println!("Import failed: {e}");
            return Ok(());
        }
    };

    let geodata = &lookup.geodata;
    if lookup.is_new {
        println!("✓ Imported \"{}\" (ID {})", geodata.title, geodata.id);
    } else {
        println!("Already stored as \"{}\" (ID {})", geodata.title, geodata.id);
    }
    println!("  URL:    {}", geodata.url);
    if let Some(bbox) = &geodata.bbox {
        println!("  BBox:   {bbox}");
    }
    println!("  Layers: {}", lookup.layers.len());
    for layer in &lookup.layers {
        println!(
            "    - {} {}",
            layer.name,
            layer.title.as_deref().unwrap_or_default()
        );
    }

    Ok(())
}
