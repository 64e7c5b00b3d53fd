use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::food::analyzer::{AnalyzerError, FoodAnalyzer, SubmitOutcome};
use crate::food::prompt::split_sections;

/// `command` is the lowercased command word and `args` the rest of the line.
pub async fn handle_command(command: &str, args: &str, analyzer: &FoodAnalyzer) -> Result<(), String> {
    match command {
        "analyze" => {
            let path = args.trim();
            if path.is_empty() {
                println!("Please specify an image file to analyze.");
                return Ok(());
            }
            analyze(path, analyzer).await
        }
        "result" => {
            match analyzer.current_result().borrow().clone() {
                Some(text) => print_report(&text),
                None => println!("No analysis yet. Try: analyze <image_path>"),
            }
            Ok(())
        }
        "clear" => {
            analyzer.clear_current_result();
            println!("🧹 Cleared. Ready to analyze another image.");
            Ok(())
        }
        _ => {
            println!("Available commands:\n- analyze <image_path> (Assess food quality)\n- result (Show the last analysis)\n- clear (Analyze another image)");
            Ok(())
        }
    }
}

async fn analyze(path: &str, analyzer: &FoodAnalyzer) -> Result<(), String> {
    println!("📷 Uploading image: {}", path.bright_yellow());
    let image_ref = analyzer
        .import_image(Path::new(path))
        .await
        .map_err(|e| format!("Failed to upload image: {}", e))?;

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Analyzing food quality...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut workflow = analyzer.spawn_submit(image_ref);
    let finished = tokio::select! {
        result = workflow.wait() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    pb.finish_and_clear();

    let Some(outcome) = finished else {
        workflow.cancel();
        let _ = workflow.wait().await;
        println!("{}", "Analysis cancelled.".yellow());
        return Ok(());
    };

    match outcome {
        Ok(SubmitOutcome::Saved { record }) => {
            print_report(&record.result_text);
            println!("{} {}", "💾 Saved as".green(), record.id.bright_black());
            Ok(())
        }
        Ok(SubmitOutcome::NotSaved { result_text, error }) => {
            print_report(&result_text);
            println!("{} {}", "⚠️  The analysis could not be saved:".yellow(), error);
            Ok(())
        }
        Ok(outcome @ SubmitOutcome::InferenceFailed { .. }) => {
            Err(outcome.display_text().to_string())
        }
        Err(AnalyzerError::Busy) => Err("An analysis is already running. Please wait.".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn print_report(text: &str) {
    println!();
    for section in split_sections(text) {
        if !section.title.is_empty() {
            println!("{}", section.title.bright_cyan().bold());
        }
        println!("{}\n", section.body);
    }
}
