//! Colored status lines for the person running the command.
//!
//! Diagnostics go through `tracing`; these helpers only print what a user
//! watching the build needs to see.

use colored::Colorize;

pub fn heading(message: &str) {
    println!("{}", format!("\n{}", message).cyan());
}

pub fn target(label: &str, value: &str) {
    println!("{} {}", label, value.yellow());
}

pub fn step(message: &str) {
    println!("{}", message);
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn finished(message: &str) {
    println!("{}", message.yellow());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "WARN:".yellow().bold(), message);
}

pub fn failure(message: &str) {
    eprintln!("{}", message.red());
}

pub fn fatal(message: &str) {
    eprintln!("{}", message.bright_red());
}
