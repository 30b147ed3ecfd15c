//! Scan command implementation.

use crate::core::detector::Detector;
use crate::core::scanner::scan_directory;
use crate::models::config::Config;
use crate::models::media::{Confidence, SubtitleLanguage};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Print the media items found in a folder.
pub fn scan(path: &Path, config: &Config) -> Result<()> {
    println!("{}", "[SCAN] Scanning library...".bold().cyan());
    println!();

    let scan = scan_directory(path, config)?;
    let detection = Detector::new(config, path).detect(&scan);

    println!("  {} {}", "Videos:".bold(), scan.videos.len());
    println!("  {} {}", "Subtitles:".bold(), scan.subtitles.len());
    println!("  {} {}", "Other files:".bold(), scan.others.len());
    println!();

    for item in &detection.items {
        let label = match item.confidence {
            Confidence::High => item.identity.to_string().green(),
            Confidence::Low => item.identity.to_string().yellow(),
        };
        println!("  {} {}", label, item.video.filename.dimmed());
        for sub in &item.subtitles {
            let language = match &sub.language {
                SubtitleLanguage::Code(code) if sub.inferred => format!("{} (inferred)", code),
                SubtitleLanguage::Code(code) => code.clone(),
                SubtitleLanguage::Unknown => "unknown".to_string(),
            };
            println!("      {} [{}]", sub.file.filename, language);
        }
    }

    if !detection.orphans.is_empty() {
        println!();
        println!("{}", "Subtitles without a video:".bold().yellow());
        for orphan in &detection.orphans {
            println!("  {}", orphan.file.path.display());
        }
    }

    Ok(())
}
