// Copyright 2026 Oxide Computer Company

use crate::{Command, GitHubArgs, IdentifierArgs, SingleOutputArgs};
use anyhow::{Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use fs_err as fs;
use git_file_id::{
    BatchInput, BatchResult, ChangeReport, Identifier, NormalizedMetadata,
    build_manifest, deserialize_manifest, diff, generate_identifier, normalize,
    parse_batch_inputs, serialize_manifest,
};
use git_file_id_backend::{
    BatchOptions, BatchProcessor, DefaultBackend, GitHubClient, GitHubConfig,
    LocalGit,
};
use serde_json::{Value, json};
use std::{io::Write, sync::Arc};
use tracing::info;

pub(crate) async fn run(command: Command) -> Result<()> {
    match command {
        Command::Local { file, repo, identifier, output } => {
            let raw = LocalGit::from_env()?.fetch(&repo, &file).await?;
            let meta = normalize(&raw)?;
            let id = generate_identifier(&meta, &identifier.to_options());
            print_single(&id, &meta, &output)
        }
        Command::Github { owner, repo, file, branch, github, identifier, output } => {
            let raw = github_client(&github)?
                .fetch(&owner, &repo, &file, &branch)
                .await?;
            let meta = normalize(&raw)?;
            let id = generate_identifier(&meta, &identifier.to_options());
            print_single(&id, &meta, &output)
        }
        Command::Batch {
            input,
            output,
            write_manifest,
            progress,
            fail_fast,
            batch,
            github,
            identifier,
        } => {
            let options = BatchOptions {
                concurrency: batch.concurrency,
                continue_on_error: !fail_fast,
                identifier: identifier.to_options(),
            };
            let mut processor = BatchProcessor::new(options);
            if progress {
                processor = processor
                    .on_progress(|done, total| eprintln!("Progress: {done}/{total}"));
            }
            let results = run_inputs(&processor, &input, &github).await?;

            let json = serde_json::to_string_pretty(&results)?;
            write_output(output.as_deref(), &json)?;
            if let Some(path) = write_manifest {
                let manifest = build_manifest(&results);
                write_file(&path, &serialize_manifest(&manifest, true))?;
                info!(path = %path, entries = manifest.len(), "wrote manifest");
            }
            Ok(())
        }
        Command::Diff { input, manifest, output, batch, github, identifier } => {
            let previous = deserialize_manifest(&fs::read_to_string(&manifest)?)
                .with_context(|| format!("failed to read manifest {manifest}"))?;
            let options = BatchOptions {
                concurrency: batch.concurrency,
                identifier: identifier.to_options(),
                ..Default::default()
            };
            let results =
                run_inputs(&BatchProcessor::new(options), &input, &github).await?;

            let report = diff(&results, &previous);
            write_output(output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
            print_summary(&report);
            Ok(())
        }
        Command::Info { file, repo, identifier } => {
            let raw = LocalGit::from_env()?.fetch(&repo, &file).await?;
            let meta = normalize(&raw)?;
            let id = generate_identifier(&meta, &identifier.to_options());

            let mut value = identified_json(&id, &meta);
            value["repository"] = json!({
                "root": meta.repo_path(),
                "owner": meta.owner(),
                "repo": meta.repo(),
                "branch": meta.branch(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

fn github_client(args: &GitHubArgs) -> Result<GitHubClient> {
    let config = GitHubConfig::from_env()?.with_token(args.token.clone());
    Ok(GitHubClient::new(config)?)
}

async fn run_inputs(
    processor: &BatchProcessor,
    input: &Utf8Path,
    github: &GitHubArgs,
) -> Result<Vec<BatchResult>> {
    let inputs: Vec<BatchInput> = parse_batch_inputs(&fs::read_to_string(input)?)
        .with_context(|| format!("failed to read batch inputs from {input}"))?;
    let backend = DefaultBackend::new(LocalGit::from_env()?, github_client(github)?);
    Ok(processor.process(Arc::new(backend), inputs).await?)
}

fn identified_json(id: &Identifier, meta: &NormalizedMetadata) -> Value {
    json!({
        "identifier": id.full(),
        "short": id.short(),
        "algorithm": id.algorithm(),
        "metadata": meta.to_value(),
    })
}

fn print_single(
    id: &Identifier,
    meta: &NormalizedMetadata,
    output: &SingleOutputArgs,
) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&identified_json(id, meta))?);
    } else if output.short {
        println!("{}", id.short());
    } else {
        println!("{id}");
    }
    Ok(())
}

fn print_summary(report: &ChangeReport) {
    eprintln!();
    eprintln!("Summary:");
    eprintln!("  Added: {}", report.added.len());
    eprintln!("  Modified: {}", report.modified.len());
    eprintln!("  Unchanged: {}", report.unchanged.len());
    eprintln!("  Removed: {}", report.removed.len());
    eprintln!("  Errors: {}", report.errors.len());
}

/// Writes `contents` to `path`, or to standard output if there is no path.
fn write_output(path: Option<&Utf8Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => write_file(path, contents),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

/// Replaces `path` atomically, so readers never see a partial file.
fn write_file(path: &Utf8Path, contents: &str) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| {
            f.write_all(contents.as_bytes())?;
            f.write_all(b"\n")
        })
        .with_context(|| format!("failed to write {path}"))
}
