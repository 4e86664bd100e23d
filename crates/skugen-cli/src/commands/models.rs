use skugen::{ModelEndpoint, Settings};

use crate::cli::ModelsArgs;
use crate::error::CliError;

pub fn run(args: &ModelsArgs) -> Result<(), CliError> {
    let registry = Settings::from_env().registry()?;
    let default = registry.default_endpoint();

    if args.json {
        println!("{}", serde_json::to_string_pretty(registry.list())?);
    } else {
        print!("{}", render(registry.list(), &default));
    }
    Ok(())
}

fn render(endpoints: &[ModelEndpoint], default: &ModelEndpoint) -> String {
    let name_width = endpoints
        .iter()
        .map(|e| e.display_name.len())
        .max()
        .unwrap_or(0);
    let id_width = endpoints
        .iter()
        .map(|e| e.model_identifier.len())
        .max()
        .unwrap_or(0);

    endpoints
        .iter()
        .map(|e| {
            let marker = if e.display_name == default.display_name { '*' } else { ' ' };
            let line = format!(
                "{marker} {:name_width$}  {:id_width$}  {}",
                e.display_name, e.model_identifier, e.description
            );
            format!("{}\n", line.trim_end())
        })
        .collect()
}
