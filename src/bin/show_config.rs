use anyhow::Result;
use carbon_calc::config::API_KEY_ENV;
use carbon_calc::Config;

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let data_dir = std::env::args_os().nth(1).map(Into::into);
    let config = Config::new(data_dir)?;

    println!("Config file: {}", config.config_file().display());
    println!("Default region: {}", config.default_region);
    println!("Default provider: {}", config.default_provider);
    println!("Available providers:");
    for (name, provider) in &config.providers {
        let key = if provider.api_key.as_deref().map_or(false, |k| !k.is_empty()) {
            "set"
        } else {
            "missing"
        };
        println!(
            "  - {}: model={}, host={:?}, timeout={}s, api_key={}",
            name, provider.default_model, provider.host, provider.timeout_secs, key
        );
    }

    match config.get_ai_config(None, None) {
        Ok(ai) => println!("\nAssistant mode: language model ({}:{})", ai.provider, ai.model),
        Err(e) => println!("\nAssistant mode: keyword replies ({}; {} not set?)", e, API_KEY_ENV),
    }

    match &config.factors_file {
        Some(path) => println!("Factor table: {}", path.display()),
        None => println!("Factor table: built-in"),
    }
    let table = config.factor_table()?;
    println!("Regions: {}", table.regions().map(|(r, _)| r.to_string()).collect::<Vec<_>>().join(", "));

    Ok(())
}
