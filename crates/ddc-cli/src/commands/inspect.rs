//! Read-only commands: `ddc config-hash` and `ddc strategies`.

use anyhow::Result;
use ddc_strategy::StrategyRegistry;

pub fn config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = ddc_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

pub fn list_strategies() -> Result<()> {
    let registry = StrategyRegistry::catalog();
    for entry in registry.entries() {
        println!(
            "{}\tgrid={}\t{}",
            entry.meta.name,
            (entry.grid)().len(),
            entry.meta.description
        );
    }
    Ok(())
}
