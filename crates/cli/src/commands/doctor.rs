//! `resgenie doctor`: Diagnose configuration and data health.

use resgenie_config::AppConfig;
use resgenie_core::{DocumentStore, EmployeeFilter};

use super::ask::{lookup_failure, open_store};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ResGenie Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `resgenie onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured ({})", config.default_provider);
    } else if config.default_provider == "ollama" {
        println!("  ✅ Local provider, no API key needed");
    } else {
        println!("  ⚠️  No API key — questions will be read with keyword rules only");
        issues += 1;
    }

    let data_path = config.data_path();
    match open_store(&config) {
        Ok(store) => match store.query_employees(&EmployeeFilter::all()).await {
            Ok(employees) if employees.is_empty() => {
                println!("  ⚠️  Directory is empty: {}", data_path.display());
                issues += 1;
            }
            Ok(employees) => {
                println!(
                    "  ✅ Directory loaded: {} employees ({})",
                    employees.len(),
                    store.name()
                );
            }
            Err(e) => {
                println!("  ❌ {}", lookup_failure(&e));
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {}", lookup_failure(&e));
            println!("     Expected data file: {}", data_path.display());
            issues += 1;
        }
    }

    if config.cache.enabled {
        println!(
            "  ✅ Response cache: {} entries, {}s TTL",
            config.cache.capacity, config.cache.ttl_secs
        );
    } else {
        println!("  ℹ️  Response cache disabled");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
