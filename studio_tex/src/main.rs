use std::{io::BufWriter, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use studio_lib::vtf::Vtf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// The input .vtf texture.
    input: String,

    /// The output file. Defaults to the input path with the .dds extension.
    /// Other extensions save the first mipmap and layer as an image.
    output: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let input = PathBuf::from(&cli.input);

    // Default to DDS since it supports more formats.
    let output = cli
        .output
        .map(PathBuf::from)
        .unwrap_or(input.with_extension("dds"));

    let start = std::time::Instant::now();

    let vtf = Vtf::from_file(&input)?;
    info!(
        "{:?} {}x{} with {} mipmaps",
        vtf.header.high_res_format,
        vtf.header.width,
        vtf.header.height,
        vtf.mipmaps.len()
    );

    // Handle all conversions by using DDS as an intermediate format.
    let dds = vtf
        .to_dds()
        .with_context(|| format!("failed to convert {input:?} to DDS"))?;

    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("output {output:?} has no file extension"))?;
    match extension {
        "dds" => {
            let mut writer = BufWriter::new(std::fs::File::create(&output)?);
            dds.write(&mut writer)?;
        }
        _ => {
            // Assume other formats are image formats.
            let image = image_dds::image_from_dds(&dds, 0)?;
            image.save(&output)?;
        }
    }

    info!("Converted {input:?} to {output:?} in {:?}", start.elapsed());
    Ok(())
}
