use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::Parser;
use log::{debug, error};
use rayon::prelude::*;
use studio_lib::{mdl::Mdl, vtf::Vtf, vtx::Vtx, vvd::Vvd};

/// Decode every file in a game folder and check references between files.
#[derive(Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// The game folder like "hl2" containing the "models" and "materials" folders.
    root_folder: String,

    /// Check .mdl files and their .vvd and .dx90.vtx files.
    #[arg(long)]
    mdl: bool,

    /// Check .vvd files.
    #[arg(long)]
    vvd: bool,

    /// Check .vtx files.
    #[arg(long)]
    vtx: bool,

    /// Check .vtf files.
    #[arg(long)]
    vtf: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ignore most logs to avoid flooding the console.
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init()?;

    let root = Path::new(&cli.root_folder);

    // Check everything if no file types are specified.
    let check_all = !(cli.mdl || cli.vvd || cli.vtx || cli.vtf);

    let start = std::time::Instant::now();

    if cli.mdl || check_all {
        println!("Checking MDL files ...");
        check_all_files(root, "*.mdl", check_mdl)?;
    }

    if cli.vvd || check_all {
        println!("Checking VVD files ...");
        check_all_files(root, "*.vvd", |path| {
            if let Err(e) = Vvd::from_file(path) {
                error!("{:?}", anyhow::Error::new(e));
            }
        })?;
    }

    if cli.vtx || check_all {
        println!("Checking VTX files ...");
        check_all_files(root, "*.vtx", check_vtx)?;
    }

    if cli.vtf || check_all {
        println!("Checking VTF files ...");
        check_all_files(root, "*.vtf", check_vtf)?;
    }

    println!("Finished in {:?}", start.elapsed());
    Ok(())
}

fn check_all_files<F>(root: &Path, pattern: &str, check_file: F) -> Result<()>
where
    F: Fn(&Path) + Send + Sync,
{
    globwalk::GlobWalkerBuilder::from_patterns(root, &[pattern])
        .build()?
        .par_bridge()
        .for_each(|entry| match entry {
            Ok(entry) => check_file(entry.path()),
            Err(e) => error!("{e}"),
        });
    Ok(())
}

fn check_mdl(path: &Path) {
    let mdl = match Mdl::from_file(path) {
        Ok(mdl) => mdl,
        Err(e) => {
            error!("{:?}", anyhow::Error::new(e));
            return;
        }
    };

    check_material_indices(&mdl, path);

    let vvd_path = path.with_extension("vvd");
    if vvd_path.exists() {
        match Vvd::from_file(&vvd_path) {
            Ok(vvd) => {
                if vvd.checksum != mdl.checksum {
                    error!(
                        "Checksum {} for {vvd_path:?} does not match {} for {path:?}",
                        vvd.checksum, mdl.checksum
                    );
                }
            }
            Err(e) => error!("{:?}", anyhow::Error::new(e)),
        }
    }

    let vtx_path = path.with_extension("dx90.vtx");
    if vtx_path.exists() {
        match read_vtx(&vtx_path, Some(mdl.version)) {
            Ok(vtx) => {
                if vtx.checksum != mdl.checksum {
                    error!(
                        "Checksum {} for {vtx_path:?} does not match {} for {path:?}",
                        vtx.checksum, mdl.checksum
                    );
                }
                check_vertex_indices(&mdl, &vtx, &vtx_path);
            }
            Err(e) => error!("Error reading {vtx_path:?}: {e:?}"),
        }
    }
}

fn check_material_indices(mdl: &Mdl, path: &Path) {
    for body_part in &mdl.body_parts {
        for model in &body_part.models {
            for (i, mesh) in model.meshes.iter().enumerate() {
                if usize::try_from(mesh.material_index)
                    .map(|m| m >= mdl.textures.len())
                    .unwrap_or(true)
                {
                    error!(
                        "Material index {} for mesh {i} of {:?} is out of range for {} textures in {path:?}",
                        mesh.material_index,
                        model.name,
                        mdl.textures.len()
                    );
                }
            }
        }
    }
}

fn check_vertex_indices(mdl: &Mdl, vtx: &Vtx, path: &Path) {
    // The VTX hierarchy has the same body parts, models, and meshes as the MDL.
    for (body_part, mdl_body_part) in vtx.body_parts.iter().zip(&mdl.body_parts) {
        for (model, mdl_model) in body_part.models.iter().zip(&mdl_body_part.models) {
            for lod in &model.lods {
                for (mesh, mdl_mesh) in lod.meshes.iter().zip(&mdl_model.meshes) {
                    let max_index = mesh
                        .strip_groups
                        .iter()
                        .flat_map(|g| g.vertices.iter())
                        .map(|v| v.original_mesh_vertex_index as i32)
                        .max();
                    if let Some(max_index) = max_index {
                        if max_index >= mdl_mesh.vertex_count {
                            error!(
                                "Vertex index {max_index} is out of range for {} vertices in {:?} for {path:?}",
                                mdl_mesh.vertex_count, mdl_model.name
                            );
                        }
                    }
                }
            }
        }
    }
}

fn check_vtx(path: &Path) {
    let mdl_version = mdl_path(path)
        .and_then(|mdl_path| Mdl::from_file(mdl_path).ok())
        .map(|mdl| mdl.version);

    if let Err(e) = read_vtx(path, mdl_version) {
        error!("Error reading {path:?}: {e:?}");
    }
}

fn read_vtx(path: &Path, mdl_version: Option<i32>) -> Result<Vtx> {
    let mut reader = Cursor::new(std::fs::read(path)?);
    let vtx = match mdl_version {
        Some(version) => Vtx::read_for_mdl_version(&mut reader, version)?,
        None => Vtx::read(&mut reader)?,
    };
    Ok(vtx)
}

/// The model for a strip file like "barrel.dx90.vtx" is "barrel.mdl".
fn mdl_path(vtx_path: &Path) -> Option<PathBuf> {
    let file_name = vtx_path.file_name()?.to_str()?;
    let (name, _) = file_name.split_once('.')?;
    Some(vtx_path.with_file_name(format!("{name}.mdl")))
}

fn check_vtf(path: &Path) {
    match Vtf::from_file(path) {
        Ok(vtf) => {
            if let Err(e) = vtf.to_surface() {
                debug!("Skipping DDS conversion for {path:?}: {e}");
            }
        }
        Err(e) => error!("{:?}", anyhow::Error::new(e)),
    }
}
