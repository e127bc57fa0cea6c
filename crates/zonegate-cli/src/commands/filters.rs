use serde_json::json;
use zonegate_filters::{standard_cell_registry, standard_host_registry};

pub fn list(format: &str) -> anyhow::Result<()> {
    let cells = standard_cell_registry();
    let hosts = standard_host_registry();

    match format {
        "json" => {
            let listing = json!({
                "cell": { "filters": cells.standard_filters(), "groups": cells.groups() },
                "host": { "filters": hosts.standard_filters(), "groups": hosts.groups() },
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        _ => {
            println!("cell filters: {}", cells.standard_filters().join(", "));
            println!("cell groups:  {}", cells.groups().join(", "));
            println!("host filters: {}", hosts.standard_filters().join(", "));
            println!("host groups:  {}", hosts.groups().join(", "));
        }
    }
    Ok(())
}
