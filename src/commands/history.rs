use colored::Colorize;

use crate::food::analyzer::{AnalyzerError, FoodAnalyzer};
use crate::database::DatabaseError;
use crate::food::record::AnalysisRecord;

use super::food_cmd::print_report;

pub async fn handle_command(command: &str, args: &str, analyzer: &FoodAnalyzer) -> Result<(), String> {
    let id = args.split_whitespace().next();

    match (command, id) {
        ("history", _) => {
            let records = analyzer
                .load_history()
                .await
                .map_err(|e| format!("Failed to load history: {}", e))?;
            print_history(&records);
            Ok(())
        }
        ("show", Some(id)) => {
            let record = find_record(analyzer, id)
                .await?
                .ok_or_else(|| format!("No analysis with id {}", id))?;
            print_record(&record);
            Ok(())
        }
        ("show", None) => {
            println!("Please specify the id of the analysis to show (see: history).");
            Ok(())
        }
        ("delete", Some(id)) => match analyzer.delete_record(id).await {
            Ok(()) => {
                println!("🗑️  Deleted {}", id.bright_black());
                Ok(())
            }
            Err(AnalyzerError::Persistence(DatabaseError::NotFound(_))) => {
                Err(format!("No analysis with id {}", id))
            }
            Err(e) => Err(format!("Failed to delete analysis: {}", e)),
        },
        ("delete", None) => {
            println!("Please specify the id of the analysis to delete (see: history).");
            Ok(())
        }
        _ => {
            println!("Available commands:\n- history (Show recent analyses)\n- show <id> (Show a full analysis)\n- delete <id> (Remove an analysis)");
            Ok(())
        }
    }
}

/// Looks in the published history first and reloads it once on a miss.
async fn find_record(analyzer: &FoodAnalyzer, id: &str) -> Result<Option<AnalysisRecord>, String> {
    let cached = analyzer.history().borrow().iter().find(|r| r.id == id).cloned();
    if cached.is_some() {
        return Ok(cached);
    }

    let records = analyzer
        .load_history()
        .await
        .map_err(|e| format!("Failed to load history: {}", e))?;
    Ok(records.into_iter().find(|r| r.id == id))
}

fn print_record(record: &AnalysisRecord) {
    let when = record
        .created_at_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    println!("\n{} {}", "🍽️  Analysis".bright_cyan().bold(), record.id.bright_black());
    println!("{} {}", "Date:".bright_yellow(), when);
    println!("{} {}", "Image:".bright_yellow(), record.image_ref);
    print_report(&record.result_text);
}

fn print_history(records: &[AnalysisRecord]) {
    if records.is_empty() {
        println!("No analyses saved yet.");
        return;
    }

    println!("\n📜 Recent analyses:");
    for record in records {
        let when = record
            .created_at_utc()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| record.created_at.to_string());
        println!(
            "  {}  {}  {}",
            record.id.bright_black(),
            when.bright_yellow(),
            record.preview(60)
        );
    }
    println!();
}
