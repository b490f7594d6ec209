//! Dump summary information about a DMF file.
//!
//! Usage: `cargo run --example dmf_info -- path/to/map.dmf`

use anyhow::{bail, Context};
use dmfrust::DmfReader;

fn main() -> anyhow::Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: dmf_info <map.dmf>");
    };

    let map = DmfReader::read_from_file(&path)
        .with_context(|| format!("failed to decode {path}"))?;

    println!("map:    {}", map.name);
    println!("scale:  1:{}", map.scale);
    println!("layers: {}", map.layers.len());
    for layer in &map.layers {
        println!(
            "  [{:>3}] {:<24} {:?} features={} attributes={}",
            layer.index,
            layer.name,
            layer.objects_type,
            layer.features.len(),
            layer.attributes.len(),
        );
    }

    Ok(())
}
