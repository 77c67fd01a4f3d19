use crate::error::Result;
use qcjson::core::document::OUTPUT_KEYS;
use qcjson::core::models::job::Driver;
use qcjson::core::schema::registry::SchemaRegistry;

pub async fn run() -> Result<()> {
    println!("{}", describe(&SchemaRegistry::default()));
    Ok(())
}

fn describe(registry: &SchemaRegistry) -> String {
    let versions: Vec<String> = registry
        .supported_versions()
        .iter()
        .map(u32::to_string)
        .collect();
    let drivers: Vec<&str> = Driver::ALL.iter().map(Driver::as_str).collect();

    format!(
        "Protocol:         {}\n\
         Schema versions:  {}\n\
         Drivers:          {}\n\
         Required fields:  schema_name, schema_version, molecule, driver, model\n\
         Output keys:      {}",
        registry.protocol_name(),
        versions.join(", "),
        drivers.join(", "),
        OUTPUT_KEYS.join(", ")
    )
}
