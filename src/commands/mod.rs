use crate::food::analyzer::FoodAnalyzer;

mod history;
mod system;

pub mod food_cmd;

/// What the input loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

pub struct CommandHandler {
    analyzer: FoodAnalyzer,
}

impl CommandHandler {
    pub fn new(analyzer: FoodAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &FoodAnalyzer {
        &self.analyzer
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<CommandFlow, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(CommandFlow::Continue);
        }

        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((command, args)) => (command.to_lowercase(), args.trim()),
            None => (input.to_lowercase(), ""),
        };

        match command.as_str() {
            "exit" | "quit" => {
                println!("👋 Goodbye!");
                self.analyzer.shutdown();
                return Ok(CommandFlow::Exit);
            }
            "help" => system::handle_command(&command)?,
            "analyze" | "result" | "clear" => food_cmd::handle_command(&command, args, &self.analyzer).await?,
            "history" | "show" | "delete" => history::handle_command(&command, args, &self.analyzer).await?,
            _ => return Err(format!("Unknown command '{}'. Type 'help' for available commands.", command)),
        }

        Ok(CommandFlow::Continue)
    }
}
