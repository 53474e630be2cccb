use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

const BACKUP_FILES: &[&str] = &["news.csv", "instructions.csv", "config.yaml"];
const BACKUP_DIRS: &[&str] = &["uploads"];

/// Write target for backup: either a file path or stdout (when piped).
enum BackupTarget {
    File(PathBuf),
    Stdout,
}

/// Bundle both collection databases, the config and the uploaded screenshots
/// into a tar.gz archive.
pub fn create_backup(output_path: Option<PathBuf>, base_path: &Path) -> Result<()> {
    let target = match output_path {
        Some(p) => BackupTarget::File(p),
        None if !io::stdout().is_terminal() => BackupTarget::Stdout,
        None => {
            let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
            BackupTarget::File(PathBuf::from(format!("dovidka-backup-{timestamp}.tar.gz")))
        }
    };

    // Use stderr for progress when writing to stdout
    let piped = matches!(target, BackupTarget::Stdout);

    let writer: Box<dyn Write> = match &target {
        BackupTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create archive at {}", path.display()))?;
            Box::new(file)
        }
        BackupTarget::Stdout => Box::new(io::stdout().lock()),
    };

    let encoder = GzEncoder::new(writer, Compression::default());
    let mut archive = Builder::new(encoder);

    let mut included_count = 0;

    for filename in BACKUP_FILES {
        let file_path = base_path.join(filename);
        if file_path.exists() {
            archive
                .append_path_with_name(&file_path, filename)
                .with_context(|| format!("Failed to add {filename} to archive"))?;
            log_progress(piped, &format!("  + {filename}"));
            included_count += 1;
        }
    }

    for dirname in BACKUP_DIRS {
        let dir_path = base_path.join(dirname);
        if dir_path.exists() && dir_path.is_dir() {
            archive
                .append_dir_all(dirname, &dir_path)
                .with_context(|| format!("Failed to add {dirname}/ to archive"))?;
            log_progress(piped, &format!("  + {dirname}/"));
            included_count += 1;
        }
    }

    if included_count == 0 {
        anyhow::bail!("No files found to backup in {}", base_path.display());
    }

    let encoder = archive
        .into_inner()
        .context("Failed to finalize tar archive")?;
    encoder.finish().context("Failed to finalize gzip stream")?;

    if let BackupTarget::File(path) = &target {
        let metadata = std::fs::metadata(path)?;
        let size_kb = metadata.len() / 1024;
        log_progress(
            piped,
            &format!("\nBackup created: {} ({} KB)", path.display(), size_kb),
        );
    }

    Ok(())
}

fn log_progress(piped: bool, message: &str) {
    if piped {
        eprintln!("{message}");
    } else {
        println!("{message}");
    }
}
