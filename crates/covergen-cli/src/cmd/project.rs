use crate::output::{print_json, print_status, print_table, progress_line};
use anyhow::Context;
use covergen_core::project::BookInfo;
use std::path::Path;

pub fn new(root: &Path, book: BookInfo, json: bool) -> anyhow::Result<()> {
    let (_, controller) = super::open(root)?;
    let slug = controller
        .create_project(&book)
        .context("failed to create project")?;
    let status = controller.get_status(&slug)?;

    if json {
        print_json(&serde_json::json!({ "slug": slug, "status": status }))?;
    } else {
        println!("Created project: {slug}");
        println!("Run `covergen resume {slug}` to generate covers.");
    }
    Ok(())
}

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, controller) = super::open(root)?;
    let projects = controller
        .list_projects()
        .context("failed to list projects")?;

    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }

    let rows = projects
        .iter()
        .map(|p| {
            let progress = match (&p.status, &p.corrupt) {
                (Some(status), _) => progress_line(status),
                (None, Some(reason)) => format!("corrupt: {reason}"),
                (None, None) => "-".to_string(),
            };
            vec![
                p.slug.clone(),
                p.title.clone().unwrap_or_default(),
                p.author.clone().unwrap_or_default(),
                p.genre.clone().unwrap_or_default(),
                progress,
            ]
        })
        .collect();
    print_table(&["SLUG", "TITLE", "AUTHOR", "GENRE", "PROGRESS"], rows);
    Ok(())
}

pub fn status(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let (_, controller) = super::open(root)?;
    let status = controller
        .get_status(slug)
        .with_context(|| format!("failed to load status for '{slug}'"))?;

    if json {
        print_json(&status)
    } else {
        print_status(&status);
        Ok(())
    }
}

pub fn steps(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, controller) = super::open(root)?;
    let steps = controller.pipeline().steps();

    if json {
        let list: Vec<serde_json::Value> = steps
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "alias": s.alias,
                    "artifact": s.artifact,
                })
            })
            .collect();
        return print_json(&list);
    }

    let rows = steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            vec![
                (i + 1).to_string(),
                s.name.clone(),
                s.alias.clone(),
                s.artifact.clone(),
            ]
        })
        .collect();
    print_table(&["#", "STEP", "ALIAS", "ARTIFACT"], rows);
    Ok(())
}
