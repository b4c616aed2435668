//! `greenwave check`

use anyhow::{bail, Result};

use crate::server::{job_descriptors, load_config};

pub fn run() -> Result<()> {
    let config = load_config()?;
    let descriptors = job_descriptors(&config)?;

    let mut failures = 0;
    for descriptor in descriptors {
        match descriptor.validate() {
            Ok(definition) => println!("ok      {}", definition.identity),
            Err(e) => {
                failures += 1;
                println!("invalid {}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{} job definition(s) invalid", failures);
    }
    println!("configuration ok ({} jobs)", config.jobs.len());
    Ok(())
}
