use crate::output::{print_json, print_status, progress_line};
use anyhow::Context;
use covergen_core::{Controller, CoverError};
use std::path::Path;

/// Recover an interrupted step, then run the rest of the pipeline (or only
/// the next step with `once`).
pub fn resume(root: &Path, slug: &str, once: bool, json: bool) -> anyhow::Result<()> {
    let (_, controller) = super::open(root)?;
    recover(&controller, slug)?;

    let result = if once {
        controller.run_step(slug, None)
    } else {
        controller.run_all(slug)
    };
    match result {
        // Resuming a finished project is not an error.
        Ok(_) | Err(CoverError::AllStepsComplete(_)) => report(&controller, slug, json),
        Err(e) => {
            report(&controller, slug, json)?;
            Err(e).with_context(|| format!("resume stopped for '{slug}'"))
        }
    }
}

/// Run one step: the named one, or the next pending one. With `rerun`, the
/// step and everything after it are invalidated first.
pub fn step(
    root: &Path,
    slug: &str,
    step: Option<&str>,
    rerun: bool,
    json: bool,
) -> anyhow::Result<()> {
    if rerun && step.is_none() {
        anyhow::bail!("--rerun needs a step name");
    }
    let (_, controller) = super::open(root)?;
    recover(&controller, slug)?;
    let result = match step {
        Some(step) if rerun => controller.rerun(slug, step),
        step => controller.run_step(slug, step),
    };
    match result {
        Ok(_) => report(&controller, slug, json),
        Err(e @ CoverError::Collaborator { .. }) => {
            report(&controller, slug, json)?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Mark a step whose owning process has died as failed so it can run again.
fn recover(controller: &Controller, slug: &str) -> anyhow::Result<()> {
    if let Some(step) = controller
        .reconcile(slug)
        .with_context(|| format!("failed to load '{slug}'"))?
    {
        eprintln!("note: '{step}' was interrupted and will run again");
    }
    Ok(())
}

fn report(controller: &Controller, slug: &str, json: bool) -> anyhow::Result<()> {
    let status = controller.get_status(slug)?;
    if json {
        print_json(&status)
    } else if status.is_failed {
        print_status(&status);
        Ok(())
    } else {
        println!("{}  {}", status.slug, progress_line(&status));
        Ok(())
    }
}
