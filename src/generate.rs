use std::fs::{self, File};
use std::io::Write;

use joyweave::config::Profile;
use schemars::schema_for;

const SCHEMA_DIR: &str = "./rootfs/usr/share/joyweave/schema";

fn main() {
    fs::create_dir_all(SCHEMA_DIR).expect("Failed to create schema directory");

    let schema = schema_for!(Profile);
    let mut file = File::create(format!("{SCHEMA_DIR}/profile_v1.json"))
        .expect("Failed to create profile schema file");
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&schema).expect("Failed to serialize profile schema")
    )
    .expect("Failed to write profile schema");
}
