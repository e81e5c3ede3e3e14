//! List geodata command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_geodata(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let geodata = store.list_geodata().await?;

    if geodata.is_empty() {
        println!("No geodata stored yet.");
        println!();
        println!("Import a service with: metamaps import <url> --datatype wms");
        return Ok(());
    }

    println!("Stored Geodata ({} total)", geodata.len());
    println!("{:-<70}", "");

    for entry in geodata {
        let comments = store.get_comments(entry.id).await.map_or(0, |c| c.len());
        println!("[{}] {} ({})", entry.id, entry.title, entry.datatype);
        println!("  {} | {} comments", entry.url, comments);
    }

    Ok(())
}
