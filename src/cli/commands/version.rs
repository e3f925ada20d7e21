use serde_json::json;

use crate::cli::OutputFormat;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let description = env!("CARGO_PKG_DESCRIPTION");
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };

    match output_format {
        OutputFormat::Json => {
            let info = json!({
                "name": name,
                "version": version,
                "description": description,
                "profile": profile,
                "target_os": std::env::consts::OS,
                "target_arch": std::env::consts::ARCH,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        OutputFormat::Text => {
            println!("{} {}", name, version);
            if !description.is_empty() {
                println!("{}", description);
            }
            println!(
                "build: {} ({}/{})",
                profile,
                std::env::consts::OS,
                std::env::consts::ARCH
            );
        }
    }
    Ok(())
}
