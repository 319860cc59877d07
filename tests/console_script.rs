use padkeys::config::AppConfig;
use padkeys::console::Console;
use padkeys::session::DeviceRegistry;
use std::fs;
use tempfile::tempdir;

fn run_script(console: &mut Console, script: &str) -> Vec<String> {
    script
        .lines()
        .flat_map(|line| console.execute(line).unwrap())
        .collect()
}

#[test]
fn configured_bindings_drive_the_console() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
bindings = ["map-dpad up char U", "map-stick-press left name space"]

[registry]
name_prefix = "pad"
capacity = 2
"#,
    )
    .unwrap();

    let config = AppConfig::load_or_default(&path).unwrap();
    let tables = config.mapping_tables().unwrap();
    let registry = DeviceRegistry::new(config.registry_settings(), tables);
    let mut console = Console::new(registry);

    let output = run_script(
        &mut console,
        "# one pad, dpad up and a left stick click
attach 046d:c216 7
poll 0
report 0 7f7f7f7f00400000
report 0 7f7f7f7f00400000
poll 0 3
list
",
    );
    assert_eq!(
        output,
        vec![
            "attached dev#7 as pad0 (slot 0)",
            "pending",
            "key 0x55 'U'",
            "key 0x20 ' '",
            "pending",
            "slot 0 pad0 dev#7 queued=0",
        ]
    );

    console.shutdown();
    assert!(console.registry().is_empty());
    assert_eq!(console.transport().in_flight(), 0);
}

#[test]
fn capacity_limit_applies_to_console_attaches() {
    let mut config = AppConfig::default();
    config.registry.capacity = 1;
    let tables = config.mapping_tables().unwrap();
    let registry = DeviceRegistry::new(config.registry_settings(), tables);
    let mut console = Console::new(registry);

    console.execute("attach 046d:c216").unwrap();
    assert!(console.execute("attach 046d:c218").is_err());
    assert_eq!(console.registry().len(), 1);
}
