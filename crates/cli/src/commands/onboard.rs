//! `resgenie onboard`: First-time setup.

use resgenie_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🧞 ResGenie — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());

    let data_path = AppConfig::default().data_path();
    println!("\n📝 Next steps:");
    println!("   1. Set RESGENIE_API_KEY or add api_key to {}", config_path.display());
    println!("   2. Put your employee directory at {}", data_path.display());
    println!("      (or point store.path / RESGENIE_DATA at it)");
    println!("   3. Run: resgenie doctor, then resgenie ask\n");

    Ok(())
}
