use crate::args::InspectArgs;
use anyhow::{Context, Result};
use dossier_archive::bundle::read_container;
use dossier_archive::EncryptionProvider;
use std::fs;
use std::path::Path;

pub fn execute(args: InspectArgs) -> Result<i32> {
    let cipher = super::cipher_from_env(&args.key_env)
        .with_context(|| format!("loading bundle key from ${}", args.key_env))?;
    let sealed = fs::read(&args.bundle)
        .with_context(|| format!("reading bundle {}", args.bundle.display()))?;
    let plaintext = cipher
        .decrypt(&sealed)
        .with_context(|| format!("decrypting {}", args.bundle.display()))?;
    let entries = read_container(&plaintext)
        .with_context(|| format!("unpacking {}", args.bundle.display()))?;

    match &args.extract_to {
        Some(dir) => extract(&entries, dir)?,
        None => {
            for (name, data) in &entries {
                println!("{:>10}  {name}", data.len());
            }
        }
    }
    Ok(0)
}

fn extract(entries: &[(String, Vec<u8>)], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (name, data) in entries {
        // Bundles only ever carry flat base names; a hand-made container with
        // separators or `..` must not escape the target directory.
        let mut components = Path::new(name).components();
        let flat = matches!(components.next(), Some(std::path::Component::Normal(_)))
            && components.next().is_none();
        if !flat {
            anyhow::bail!("refusing entry '{name}': not a plain file name");
        }
        let target = dir.join(name);
        fs::write(&target, data).with_context(|| format!("writing {}", target.display()))?;
        println!("extracted {}", target.display());
    }
    Ok(())
}
