//! Interactive terminal menus for the zero-argument flow.

use std::io::{self, BufRead, Write};

use tokengauge_bench::Selection;
use tokengauge_core::PromptSet;

use crate::discovery::DetectedService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Local,
    Remote,
}

fn rule(width: usize) -> String {
    "=".repeat(width)
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None, // EOF
        Ok(_) => Some(line.trim().to_string()),
        Err(_) => None,
    }
}

pub fn connection_type_menu() -> Option<ConnectionType> {
    println!("\n{}", rule(60));
    println!("tokengauge - Connection Type");
    println!("{}", rule(60));
    println!("1. Local - Probe services running on this machine");
    println!("2. Remote - Connect to a remote server");
    println!("q. Quit");

    loop {
        let choice = read_line("\nEnter your choice (1-2) or 'q' to quit: ")?;
        match choice.to_lowercase().as_str() {
            "q" => return None,
            "1" => return Some(ConnectionType::Local),
            "2" => return Some(ConnectionType::Remote),
            _ => println!("Please enter 1, 2, or 'q'"),
        }
    }
}

pub fn service_menu(services: &[DetectedService]) -> Option<&DetectedService> {
    println!("\n{}", rule(60));
    println!("Available Services");
    println!("{}", rule(60));

    if services.is_empty() {
        println!("No services detected!");
        println!("\nPlease ensure one of the following is running:");
        println!("  - Ollama (default: http://localhost:11434)");
        println!("  - vLLM (default: http://localhost:8000)");
        println!("  - Llama.cpp server (default: http://localhost:8080)");
        return None;
    }

    for (i, service) in services.iter().enumerate() {
        println!("{}. {}", i + 1, service.kind.display_name());
        println!("   Host: {}", service.base_url);
        println!("   Status: {}", service.status());
    }

    loop {
        let choice = read_line(&format!(
            "\nEnter your choice (1-{}) or 'q' to quit: ",
            services.len()
        ))?;
        if choice.eq_ignore_ascii_case("q") {
            return None;
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=services.len()).contains(&n) => return Some(&services[n - 1]),
            _ => println!("Please enter a number between 1 and {}", services.len()),
        }
    }
}

pub fn model_menu(models: &[String]) -> Option<String> {
    if models.is_empty() {
        println!("No models found. Using default model.");
        return Some("default".to_string());
    }

    println!("\n{}", rule(60));
    println!("SELECT MODEL");
    println!("{}", rule(60));
    for (i, model) in models.iter().enumerate() {
        println!("{}. {}", i + 1, model);
    }
    println!("0. Cancel");

    loop {
        let choice = read_line(&format!("\nEnter your choice (1-{}) or 0 to cancel: ", models.len()))?;
        if choice == "0" {
            return None;
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=models.len()).contains(&n) => return Some(models[n - 1].clone()),
            _ => println!("Please enter a number between 0 and {}", models.len()),
        }
    }
}

pub fn prompt_menu(prompts: &PromptSet) -> Option<Selection> {
    println!("\n{}", rule(60));
    println!("SELECT PROMPTS TO BENCHMARK");
    println!("{}", rule(60));

    let names = prompts.names();
    for (i, name) in names.iter().enumerate() {
        let text = &prompts.get(name).expect("listed prompt exists").text;
        let preview: String = text.chars().take(50).collect();
        let ellipsis = if text.chars().count() > 50 { "..." } else { "" };
        println!("{}. {}", i + 1, name);
        println!("   \"{}{}\"", preview, ellipsis);
    }
    println!("{}. Run ALL prompts", names.len() + 1);
    println!("0. Quit");

    loop {
        let choice = read_line(&format!("\nEnter your choice (0-{}): ", names.len() + 1))?;
        match choice.parse::<usize>() {
            Ok(0) => return None,
            Ok(n) if n == names.len() + 1 => return Some(Selection::All),
            Ok(n) if (1..=names.len()).contains(&n) => {
                return Some(Selection::Named(vec![names[n - 1].clone()]))
            }
            _ => println!("Please enter a number between 0 and {}", names.len() + 1),
        }
    }
}

pub fn remote_server_menu(stored: &[String]) -> Option<String> {
    println!("\n{}", rule(60));
    println!("SELECT REMOTE SERVER");
    println!("{}", rule(60));

    if !stored.is_empty() {
        println!("Previously used servers:");
        for (i, server) in stored.iter().enumerate() {
            println!("{}. {}", i + 1, server);
        }
        println!();
    }
    println!("0. Enter new server IP/URL");
    println!("q. Quit");

    loop {
        let choice = read_line("\nEnter your choice: ")?;
        if choice.eq_ignore_ascii_case("q") {
            return None;
        }
        if choice == "0" {
            println!("\nExamples:");
            println!("  192.168.1.100");
            println!("  192.168.10.101:11434");
            println!("  https://api.example.com");
            return read_line("\nServer IP/URL: ").filter(|s| !s.is_empty());
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=stored.len()).contains(&n) => return Some(stored[n - 1].clone()),
            _ => println!("Please enter 0, a server number, or 'q'"),
        }
    }
}

/// API key prompt. The key is kept in memory for this session only.
pub fn api_key_prompt() -> Option<String> {
    println!("\nEnter API key for authentication (optional):");
    println!("- Leave blank if no API key is needed");
    println!("- The key will NOT be saved between runs");
    let key = read_line("\nAPI Key (optional): ")?;
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
