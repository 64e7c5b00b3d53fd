pub fn handle_command(input: &str) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n🍎 Food Quality Commands:");
            println!("  analyze <image>  - Upload a food photo and assess its quality");
            println!("  result           - Show the last analysis");
            println!("  clear            - Clear the result and analyze another image");
            println!("  Example: analyze photos/strawberries.jpg");
            println!();

            println!("📜 History Commands:");
            println!("  history          - Show the 10 most recent analyses");
            println!("  show <id>        - Show the full text of a saved analysis");
            println!("  delete <id>      - Delete a saved analysis");
            println!();

            println!("⚙️ System Commands:");
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program");
            println!();
            println!("Press Ctrl-C while an analysis is running to cancel it.");
            Ok(())
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
