use std::fs;

const CONFIG_PATH: &str = "src/default_config.toml";
const SECTIONS: [&str; 4] = ["store", "html", "markdown", "typst"];

fn main() {
    println!("cargo:rerun-if-changed={CONFIG_PATH}");

    let content = fs::read_to_string(CONFIG_PATH)
        .unwrap_or_else(|e| panic!("Cannot read {CONFIG_PATH}: {e}"));
    let table = content
        .parse::<toml::Table>()
        .unwrap_or_else(|e| panic!("Invalid {CONFIG_PATH}: {e}"));

    // Every section the runtime config reads must ship with defaults
    for section in SECTIONS {
        if !table.get(section).is_some_and(toml::Value::is_table) {
            panic!("{CONFIG_PATH} is missing the [{section}] table");
        }
    }
}
