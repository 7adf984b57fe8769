use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use page_mirror::cli::{Command, MirrorCommand};
use page_mirror::{ChannelProgressSink, MirrorStep, PageMirror, Project, ProjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = MirrorCommand::parse();
    let store = ProjectStore::new(&args.root);

    match &args.command {
        Command::List => {
            list_projects(&store);
            Ok(())
        }
        Command::New {
            name,
            urls,
            replace_links,
            replace_forms,
            run,
        } => {
            let mut project = store
                .create(name)
                .with_context(|| format!("Failed to create project '{}'", name))?;
            project.set_urls(urls.clone());
            project.set_replace_links(*replace_links);
            project.set_replace_forms(*replace_forms);
            store.save(&mut project).context("Failed to save project")?;
            project.save_links().context("Failed to save links file")?;
            println!("💾 Saved project {} ({} URLs)", name.blue(), urls.len());

            if *run {
                run_project(&args, project).await?;
            }
            Ok(())
        }
        Command::Run { name } => {
            let project = store
                .load(name)?
                .with_context(|| format!("Project '{}' not found", name))?;
            run_project(&args, project).await
        }
    }
}

fn list_projects(store: &ProjectStore) {
    let registry = store.list();
    if registry.is_empty() {
        println!("No existing projects found.");
        return;
    }

    println!("Existing projects:");
    for (i, (name, record)) in registry.iter().enumerate() {
        println!(
            "{}. {} ({} URLs, saved {})",
            i + 1,
            name.blue(),
            record.urls.len(),
            record.timestamp
        );
    }
}

async fn run_project(args: &MirrorCommand, project: Project) -> Result<()> {
    let mirror = PageMirror::new(&args.fetch_settings())?;
    let cancel = CancellationToken::new();
    let (sink, mut rx) = ChannelProgressSink::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!("🚀 Mirroring project: {}", project.name().blue());
    println!("📁 Output directory: {:?}", project.base_dir());
    println!("🔗 Pages: {}", project.urls().len());

    let job_cancel = cancel.clone();
    let job = tokio::spawn(async move {
        mirror.mirror_project(&project, &sink, &job_cancel).await
    });

    let bars = MultiProgress::new();
    let total_bar = bars.add(ProgressBar::new(0));
    total_bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:40} [{bar:40.green/red}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let file_bar = bars.add(ProgressBar::new(0));
    file_bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:40} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("=> "),
    );

    loop {
        tokio::select! {
            Some(progress) = rx.assets.recv() => {
                total_bar.set_length(progress.total as u64);
                total_bar.set_position(progress.completed as u64);
            }
            Some(progress) = rx.files.recv() => {
                file_bar.set_length(progress.total_bytes.max(progress.downloaded_bytes));
                file_bar.set_position(progress.downloaded_bytes);
                file_bar.set_message(progress.name);
            }
            Some((url, step)) = rx.steps.recv() => match step {
                MirrorStep::Init => {
                    total_bar.reset();
                    total_bar.set_message(url.clone());
                    bars.println(format!("📥 Processing {}", url))?;
                }
                MirrorStep::Done => bars.println(format!("✅ Finished {}", url))?,
                MirrorStep::Aborted => bars.println(format!("{} {}", "⏹  Aborted".yellow(), url))?,
                _ => total_bar.set_message(format!("{} ({})", url, step)),
            },
            else => break,
        }
    }

    total_bar.finish_and_clear();
    file_bar.finish_and_clear();

    let report = job.await.context("Mirror task failed")??;
    for page in &report.pages {
        println!(
            "📊 {}: {}/{} assets -> {:?}",
            page.url,
            page.completed,
            page.total,
            page.output.as_deref().unwrap_or(std::path::Path::new("-"))
        );
        for failed in &page.failed {
            println!("   {} {}", "⚠️  left remote:".yellow(), failed);
        }
    }
    for (url, reason) in &report.failed_pages {
        eprintln!("❌ Error processing {}: {}", url.red(), reason);
    }

    if report.aborted {
        println!("{}", "⏹  Mirroring cancelled".yellow());
    } else {
        println!("✅ Website mirroring completed successfully!");
    }
    Ok(())
}
