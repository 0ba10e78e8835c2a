//! OpenFunscripter core CLI entrypoint: exercises the project, scripting,
//! heatmap and backup crates end to end without any UI layer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ofs_backup::{backup_filename, run_backup, AutoBackup};
use ofs_events::{Event, EVENT_CHANNEL_CAP};
use ofs_project::Project;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "ofs", version, about = "OpenFunscripter core CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Optional configuration file path (overrides discovery of `ofsc.toml`).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Imports a `.funscript` (plus any sibling axis funscripts) and
    /// writes out a binary project container.
    Import {
        funscript: PathBuf,
        #[arg(long = "out")]
        project: PathBuf,
    },
    /// Exports every script of a project back to `.funscript` files.
    Export {
        project: PathBuf,
        #[arg(long = "out")]
        dir: PathBuf,
    },
    /// Prints a project's script count, bookmark count and tempo.
    Info { project: PathBuf },
    /// Prints the heatmap gradient marks for one script of a project.
    Heatmap {
        project: PathBuf,
        #[arg(long = "script", default_value_t = 0)]
        script: usize,
        #[arg(long = "duration")]
        duration_seconds: f32,
    },
    /// Writes one rotating backup snapshot of a project to `dir`.
    Backup { project: PathBuf, dir: PathBuf },
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("ofs.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "ofs.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_err) => {
                // Global subscriber already installed (e.g. under a test harness).
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();

    let args = Args::parse();
    info!(target: "runtime", command = ?args.command, "startup");

    let config = ofs_config::load_from(args.config.clone())?;
    info!(
        target: "runtime.startup",
        autosave_interval_seconds = config.file.autosave.interval_seconds,
        "bootstrap_complete"
    );

    match args.command {
        Command::Import { funscript, project } => run_import(&funscript, &project),
        Command::Export { project, dir } => run_export(&project, &dir),
        Command::Info { project } => run_info(&project),
        Command::Heatmap {
            project,
            script,
            duration_seconds,
        } => run_heatmap(&project, script, duration_seconds),
        Command::Backup { project, dir } => run_backup_command(&project, &dir).await,
    }
}

fn run_import(funscript: &Path, project_out: &Path) -> Result<()> {
    let mut project = Project::import_funscript(funscript)
        .with_context(|| format!("importing {}", funscript.display()))?;
    project
        .save(project_out, true)
        .with_context(|| format!("saving {}", project_out.display()))?;
    info!(
        target: "project.import",
        scripts = project.scripts().len(),
        out = %project_out.display(),
        "import_complete"
    );
    println!(
        "imported {} script(s) into {}",
        project.scripts().len(),
        project_out.display()
    );
    Ok(())
}

fn run_export(project_path: &Path, dir: &Path) -> Result<()> {
    let project =
        Project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    std::fs::create_dir_all(dir)?;
    project
        .export_funscripts(dir)
        .with_context(|| format!("exporting scripts to {}", dir.display()))?;
    println!(
        "exported {} script(s) to {}",
        project.scripts().len(),
        dir.display()
    );
    Ok(())
}

fn run_info(project_path: &Path) -> Result<()> {
    let project =
        Project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    println!("media: {}", project.media_path.display());
    println!("scripts: {}", project.scripts().len());
    for (i, s) in project.scripts().iter().enumerate() {
        println!(
            "  [{i}] {} ({} actions, title={})",
            s.script.path.display(),
            s.script.actions().len(),
            s.script.title
        );
    }
    println!("bookmarks: {}", project.bookmarks.len());
    println!(
        "tempo: {} bpm, offset {}s, measure {}",
        project.tempo.bpm, project.tempo.beat_offset_seconds, project.tempo.measure_index
    );
    Ok(())
}

fn run_heatmap(project_path: &Path, script_idx: usize, duration_seconds: f32) -> Result<()> {
    let project =
        Project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    let script = project
        .script(script_idx)
        .with_context(|| format!("no script at index {script_idx}"))?;
    let marks = ofs_heatmap::marks(duration_seconds, script.actions().as_slice());
    for mark in &marks {
        println!(
            "{:.4} #{:02x}{:02x}{:02x}",
            mark.pos, mark.color[0], mark.color[1], mark.color[2]
        );
    }
    println!("{} marks", marks.len());
    Ok(())
}

async fn run_backup_command(project_path: &Path, dir: &Path) -> Result<()> {
    let project =
        Project::load(project_path).with_context(|| format!("loading {}", project_path.display()))?;
    let bytes = project.save_to_bytes();

    let mut scheduler = AutoBackup::default();
    if !scheduler.due(std::time::Instant::now()) {
        println!("backup not due");
        return Ok(());
    }

    let app_start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let filename = backup_filename(app_start, app_start);

    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    run_backup(dir.to_path_buf(), filename.clone(), bytes, tx).await;
    scheduler.mark_attempted(std::time::Instant::now());

    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(Event::BackupCompleted { path })) => {
            println!("backup written to {path}");
            Ok(())
        }
        Ok(Some(Event::BackupFailed { message })) => {
            error!(target: "backup", %message, "backup_failed");
            anyhow::bail!("backup failed: {message}")
        }
        Ok(Some(_)) | Ok(None) => anyhow::bail!("backup worker closed without reporting a result"),
        Err(_) => anyhow::bail!("timed out waiting for backup completion"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heatmap_of_empty_actions_has_no_marks() {
        let marks = ofs_heatmap::marks(0.0, &[]);
        assert!(marks.is_empty());
    }

    #[tokio::test]
    async fn import_then_export_round_trips_via_cli_functions() {
        let dir = tempfile::tempdir().unwrap();
        let funscript = dir.path().join("in.funscript");
        std::fs::write(
            &funscript,
            br#"{"version":"1.0","inverted":false,"range":100,"actions":[{"at":0,"pos":0},{"at":1000,"pos":50}]}"#,
        )
        .unwrap();
        let project_path = dir.path().join("proj.ofsproj");
        run_import(&funscript, &project_path).unwrap();

        let out_dir = dir.path().join("out");
        run_export(&project_path, &out_dir).unwrap();
        assert!(out_dir.join("in.funscript").exists());
    }
}
