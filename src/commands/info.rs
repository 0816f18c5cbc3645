//! Info command implementation

use lps25hb_core::{DriverConfig, LPS25HB_OF_MATCH, MODULE_INFO};

/// Print module metadata, configuration and match table
pub fn run(config: &DriverConfig) {
    println!("Description: {}", MODULE_INFO.description);
    println!("Author:      {}", MODULE_INFO.author);
    println!("License:     {}", MODULE_INFO.license);
    println!();
    println!("Driver:      {}", config.driver_name);
    println!("Class:       {}", config.class_name);
    println!(
        "Region:      {} (minors {}..{})",
        config.region_name,
        config.first_minor,
        config.first_minor + config.max_devices
    );
    println!("Nodes:       /dev/{}N", config.node_prefix);
    println!(
        "Capacity:    {} devices{}",
        config.max_devices,
        if config.enforce_capacity {
            ""
        } else {
            " (not enforced)"
        }
    );
    println!();
    println!("Match table:");
    for id in LPS25HB_OF_MATCH {
        println!("  {}", id.compatible);
    }
}
