//! Supported service types

use crate::config::Config;
use crate::metadata::MetadataRegistry;

pub fn cmd_services(config: &Config) -> anyhow::Result<()> {
    let registry = MetadataRegistry::with_ogc_services(&config.metadata)?;

    println!("Supported service types:");
    for service in registry.services() {
        println!("  {:<6} {}", service.code, service.name);
    }

    Ok(())
}
