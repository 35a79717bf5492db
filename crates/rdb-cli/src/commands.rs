use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use colored::Colorize;
use rdb_sdk::{
    AssetId, ChangeKind, CommitInfo, CommitRequest, FileStatus, Head, Layout, LogQuery, ObjectId,
    Rdb, StageOverrides,
};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Ctx {
        repo: cli.repo,
        format: cli.format,
    };
    match cli.command {
        Command::Init(args) => cmd_init(&ctx, args),
        Command::Add(args) => cmd_add(&ctx, args),
        Command::Commit(args) => cmd_commit(&ctx, args),
        Command::Status(_) => cmd_status(&ctx),
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Diff(args) => cmd_diff(&ctx, args),
        Command::Manifest(args) => cmd_manifest(&ctx, args),
        Command::List(args) => cmd_list(&ctx, args),
    }
}

struct Ctx {
    repo: PathBuf,
    format: OutputFormat,
}

impl Ctx {
    fn open(&self) -> anyhow::Result<Rdb> {
        Ok(Rdb::discover(&self.repo)?)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(ctx: &Ctx, args: InitArgs) -> anyhow::Result<()> {
    let path = args.path.unwrap_or_else(|| ctx.repo.clone());
    let layout: Layout = args.layout.parse()?;
    std::fs::create_dir_all(&path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    let rdb = Rdb::init(&path, layout, args.types)?;
    println!(
        "{} Initialized empty RDB repository in {}",
        "✓".green().bold(),
        rdb.workdir().display().to_string().bold()
    );
    println!("  Layout: {}", layout.to_string().cyan());
    if !rdb.config().types.is_empty() {
        println!("  Types: {}", rdb.config().types.join(", "));
    }
    println!("  Branch: {}", rdb.current_branch()?.yellow());
    Ok(())
}

fn cmd_add(ctx: &Ctx, args: AddArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let overrides = StageOverrides {
        asset_type: args.asset_type,
        asset_id: args.id.map(AssetId),
        name: args.name,
    };
    let base = ctx.repo.canonicalize()?;
    for path in &args.paths {
        let report = rdb.stage(&absolute(&base, path), &overrides)?;
        if ctx.json() {
            print_json(&report)?;
            continue;
        }
        for staged in &report.staged {
            println!("  {} {}", "staged:".green(), staged);
        }
        for id in &report.meta_written {
            println!("  {} {}", "meta:".cyan(), id);
        }
        for skipped in &report.skipped {
            println!(
                "  {} {} ({})",
                "skipped:".yellow(),
                skipped.path,
                skipped.reason
            );
        }
    }
    Ok(())
}

/// Resolves a command-line path against the directory the command runs in.
fn absolute(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

fn cmd_commit(ctx: &Ctx, args: CommitArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let mut request = CommitRequest::new(args.message);
    request.author = args.author;
    request.amend = args.amend;
    let info = match rdb.commit(request) {
        Ok(info) => info,
        Err(e) if e.is_no_op() => {
            println!("nothing to commit, working tree clean");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    if ctx.json() {
        return print_json(&info);
    }
    println!(
        "[{} {}] {}",
        info.commit.branch.yellow(),
        info.id.short_hex().dimmed(),
        info.summary()
    );
    Ok(())
}

fn cmd_status(ctx: &Ctx) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let status = rdb.status()?;
    if ctx.json() {
        return print_json(&status);
    }
    match rdb.head()? {
        Head::Symbolic(branch) => println!("On branch {}", branch.yellow().bold()),
        Head::Detached(id) => println!("HEAD detached at {}", id.short_hex().yellow()),
    }
    if rdb.head_commit()?.is_none() {
        println!("\nNo commits yet");
    }
    if status.is_clean() {
        println!("\nnothing to commit, working tree clean");
    } else {
        println!("\nChanges:");
        for entry in &status.changes {
            let line = format!("  {} {}", entry.status.code(), entry.path);
            let line = match entry.status {
                FileStatus::Added => line.green(),
                FileStatus::Modified => line.yellow(),
                FileStatus::Deleted => line.red(),
                FileStatus::Unchanged => line.normal(),
            };
            if entry.staged {
                println!("{} {}", line, "(staged)".dimmed());
            } else {
                println!("{line}");
            }
        }
    }
    if !status.skipped.is_empty() {
        println!("\nSkipped:");
        for skipped in &status.skipped {
            println!("  {} ({})", skipped.path.dimmed(), skipped.reason);
        }
    }
    Ok(())
}

fn cmd_log(ctx: &Ctx, args: LogArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let query = LogQuery {
        start: args.rev.as_deref().map(|r| rdb.resolve(r)).transpose()?,
        max_count: args.max_count,
        since: args.since.as_deref().map(|s| parse_date(s, false)).transpose()?,
        until: args.until.as_deref().map(|s| parse_date(s, true)).transpose()?,
    };
    let commits = rdb.log(&query)?;
    if ctx.json() {
        return print_json(&commits);
    }
    for info in &commits {
        if args.oneline {
            println!("{}", oneline(info));
        } else {
            print_commit(info);
        }
    }
    Ok(())
}

fn oneline(info: &CommitInfo) -> String {
    format!("{} {}", info.id.short_hex().yellow(), info.summary())
}

fn print_commit(info: &CommitInfo) {
    println!(
        "{} {} ({})",
        "commit".yellow(),
        info.id.to_hex().yellow(),
        info.commit.branch.green()
    );
    println!("Author: {}", info.commit.author);
    println!("Date:   {}", info.commit.timestamp.to_rfc2822());
    println!();
    for line in info.commit.message.lines() {
        println!("    {line}");
    }
    println!();
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`. A bare date covers the whole
/// day: its start for a lower bound, its last nanosecond for an upper bound.
fn parse_date(s: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date: {s}"))?;
    let time = if end_of_day {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .with_context(|| format!("invalid date: {s}"))?;
    Ok(Utc.from_utc_datetime(&time))
}

fn cmd_diff(ctx: &Ctx, args: DiffArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let to = match args.to.as_deref() {
        Some(rev) => Some(rdb.resolve(rev)?),
        None => rdb.head_commit()?,
    };
    let from: Option<ObjectId> = match args.from.as_deref() {
        Some(rev) => Some(rdb.resolve(rev)?),
        None => match &to {
            Some(id) => rdb.read_commit(id)?.commit.parent,
            None => None,
        },
    };
    let diff = rdb.diff(from.as_ref(), to.as_ref())?;
    if ctx.json() {
        return print_json(&diff);
    }
    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for change in &diff.changes {
        let line = format!("{} {}", change.kind.code(), change.path);
        let line = match change.kind {
            ChangeKind::Added => line.green(),
            ChangeKind::Removed => line.red(),
            ChangeKind::Modified => line.yellow(),
            ChangeKind::TypeChanged => line.magenta(),
        };
        println!("{line}");
    }
    Ok(())
}

fn cmd_manifest(ctx: &Ctx, args: ManifestArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let commit = args.rev.as_deref().map(|r| rdb.resolve(r)).transpose()?;
    if args.objects {
        let objects = rdb.reachable_objects(commit.as_ref())?;
        if ctx.json() {
            return print_json(&objects);
        }
        for id in &objects {
            println!("{id}");
        }
        return Ok(());
    }
    // The manifest is a machine-readable document in either format.
    print_json(&rdb.manifest(commit.as_ref())?)
}

fn cmd_list(ctx: &Ctx, args: ListArgs) -> anyhow::Result<()> {
    let rdb = ctx.open()?;
    let folders: Vec<_> = rdb
        .list_types()
        .into_iter()
        .filter(|f| !args.missing || !f.exists)
        .collect();
    if ctx.json() {
        return print_json(&folders);
    }
    println!("{}", "Asset types and folders:".bold());
    for folder in &folders {
        let mark = if folder.exists {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{mark} {:>7} {:<20} {}",
            folder.id,
            folder.asset_type,
            folder.path.dimmed()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let since = parse_date("2024-03-01", false).unwrap();
        let until = parse_date("2024-03-01", true).unwrap();
        assert_eq!((since.day(), since.hour()), (1, 0));
        assert_eq!((until.hour(), until.minute(), until.second()), (23, 59, 59));
        assert_eq!(until.nanosecond(), 999_999_999);
    }

    #[test]
    fn until_includes_subsecond_commits_late_in_the_day() {
        let until = parse_date("2024-03-01", true).unwrap();
        let late = parse_date("2024-03-01T23:59:59.5Z", false).unwrap();
        let next = parse_date("2024-03-02", false).unwrap();
        assert!(late <= until);
        assert!(next > until);
    }

    #[test]
    fn rfc3339_dates_are_normalized_to_utc() {
        let t = parse_date("2024-03-01T10:00:00+02:00", false).unwrap();
        assert_eq!(t.hour(), 8);
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(parse_date("yesterday", false).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let dir = std::env::temp_dir();
        let base = dir.canonicalize().unwrap();
        let p = absolute(&base, Path::new("does-not-exist-rdb"));
        assert_eq!(p, base.join("does-not-exist-rdb"));
        assert_eq!(absolute(&base, &base), base);
    }
}
