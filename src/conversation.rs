use anyhow::Result;
use colored::*;
use std::io::{self, Write};

use carbon_calc::core::{compare, format_amount, highest_category, ConversationState, Role};
use carbon_calc::report::all_tips_text;
use carbon_calc::Assistant;

pub async fn handle_conversation(assistant: &Assistant, state: &mut ConversationState) -> Result<()> {
    println!("{}", "Starting conversation mode...".cyan());
    println!("{}", "Ask about your footprint or how to reduce it.".yellow());
    println!("{}", "Commands: /footprint, /tips, /history, /help".yellow());
    println!("{}", "Type 'exit', 'quit', or 'bye' to end conversation.".yellow());
    println!("{}", "---".dimmed());

    for message in state.messages() {
        print_message(message.role, &message.content);
    }
    println!();

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            println!("{}", "Goodbye! 👋".green());
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            handle_command(command, assistant, state);
            continue;
        }

        let reply = assistant.reply(input, state).await;
        print_message(reply.role, &reply.content);
        println!();
    }

    Ok(())
}

fn print_message(role: Role, content: &str) {
    match role {
        Role::User => println!("{} {}", "You:".cyan().bold(), content),
        Role::Assistant => println!("{} {}", "Assistant:".green().bold(), content),
    }
}

fn handle_command(command: &str, assistant: &Assistant, state: &ConversationState) {
    match command.split_whitespace().next().unwrap_or_default() {
        "footprint" => match state.footprint() {
            Some(footprint) => {
                println!("{}", "Your footprint:".cyan().bold());
                for (category, value) in footprint.by_category() {
                    println!("  {:<15} {} tonnes CO2/year", format!("{}:", category), format_amount(value));
                }
                println!("  {:<15} {} tonnes CO2/year", "Total:", format_amount(footprint.total));
                println!("  Highest category: {}", highest_category(footprint));
                if let Ok(verdict) = compare(assistant.table(), footprint.total, state.region()) {
                    println!("  {}", verdict.describe());
                }
            }
            None => println!(
                "{}",
                "No footprint yet. Restart with --calculate and your lifestyle flags.".yellow()
            ),
        },
        "tips" => println!("{}", all_tips_text()),
        "history" => {
            for message in state.messages() {
                println!(
                    "{} {}",
                    format!("[{}]", message.timestamp.with_timezone(&chrono::Local).format("%H:%M")).dimmed(),
                    message.content
                );
            }
        }
        "help" | "h" => {
            println!("{}", "Available commands:".cyan().bold());
            println!("  {:<12} - Show your calculated footprint", "/footprint".yellow());
            println!("  {:<12} - List every reduction tip", "/tips".yellow());
            println!("  {:<12} - Show the conversation so far", "/history".yellow());
            println!("  {:<12} - Show this help message", "/help".yellow());
        }
        other => println!(
            "{}",
            format!("Unknown command: /{}. Type '/help' for available commands.", other).red()
        ),
    }
    println!();
}
